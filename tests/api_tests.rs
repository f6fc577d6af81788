// tests/api_tests.rs

use std::net::SocketAddr;

use hayeren_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

const CMS_TOKEN: &str = "test_cms_token";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    // Note: For Postgres, you must have a running database.
    // We'll read from DATABASE_URL environment variable.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let media_dir = std::env::temp_dir().join("hayeren-test-media");
    tokio::fs::create_dir_all(&media_dir)
        .await
        .expect("Failed to create media dir");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        admin_username: None,
        admin_password: None,
        allowed_origins: vec![],
        cms_tokens: vec![CMS_TOKEN.to_string()],
        tts_api_url: "http://127.0.0.1:9/synthesize".to_string(),
        tts_api_key: None,
        media_dir,
    };

    let state = AppState {
        pool,
        config,
        http: reqwest::Client::new(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    address
}

/// Registers a fresh user and returns (username, bearer token).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, String) {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    let token = login["token"].as_str().expect("Token not found").to_string();
    (username, token)
}

/// Imports a 5-exercise lesson through the CMS surface and returns its slug.
async fn import_lesson(client: &reqwest::Client, address: &str) -> String {
    let slug = format!("lesson-{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let body = serde_json::json!({
        "lesson": {
            "slug": slug,
            "title": "Greetings",
            "description": "First words",
            "level": 1,
            "xp_reward": 50
        },
        "exercises": [
            {
                "kind": "type-answer",
                "position": 1,
                "prompt": "Type 'hello' in Armenian",
                "expected_answer": "Բարև",
                "case_sensitive": false
            },
            {
                "kind": "fill-blank",
                "position": 2,
                "prompt": "Fill the blank",
                "expected_answer": "ես",
                "sentence_prefix": "___",
                "sentence_suffix": "գնում եմ"
            },
            {
                "kind": "multi-select",
                "position": 3,
                "prompt": "Select the vowels",
                "options": [
                    { "text": "Ա", "is_correct": true, "position": 1 },
                    { "text": "Բ", "is_correct": false, "position": 2 },
                    { "text": "Ե", "is_correct": true, "position": 3 }
                ]
            },
            {
                "kind": "matching",
                "position": 4,
                "prompt": "Match the words",
                "options": [
                    { "text": "շուն", "side": "left", "match_key": "dog", "position": 1 },
                    { "text": "dog", "side": "right", "match_key": "dog", "position": 2 },
                    { "text": "կատու", "side": "left", "match_key": "cat", "position": 3 },
                    { "text": "cat", "side": "right", "match_key": "cat", "position": 4 }
                ]
            },
            {
                "kind": "char_intro",
                "position": 5,
                "prompt": "Meet the letter Ա",
                "config": {
                    "kind": "char_intro",
                    "letter": "Ա",
                    "translit": "a",
                    "example_words": [
                        { "word": "արև", "translit": "arev", "meaning": "sun" }
                    ]
                }
            }
        ]
    });

    let resp = client
        .post(format!("{}/api/cms/lessons/import", address))
        .header("X-CMS-Token", CMS_TOKEN)
        .json(&body)
        .send()
        .await
        .expect("Import failed");
    assert_eq!(resp.status().as_u16(), 201);

    let imported: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(imported["exercises"], 5);

    slug
}

/// Finds an option id by its display text within a public exercise.
fn option_id(exercise: &serde_json::Value, text: &str) -> i64 {
    exercise["options"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["text"] == text)
        .unwrap_or_else(|| panic!("option '{text}' not found"))["id"]
        .as_i64()
        .unwrap()
}

/// Builds a fully correct answer batch from the public lesson payload.
fn correct_answers(lesson: &serde_json::Value) -> Vec<serde_json::Value> {
    let exercises = lesson["exercises"].as_array().unwrap();
    let multi = &exercises[2];
    let matching = &exercises[3];

    vec![
        serde_json::json!({
            "exercise_id": exercises[0]["id"], "text": "  ԲԱՐև  "
        }),
        serde_json::json!({
            "exercise_id": exercises[1]["id"], "text": "ես"
        }),
        serde_json::json!({
            "exercise_id": multi["id"],
            "option_ids": [option_id(multi, "Ա"), option_id(multi, "Ե")]
        }),
        serde_json::json!({
            "exercise_id": matching["id"],
            "pairs": [
                { "left_id": option_id(matching, "շուն"), "right_id": option_id(matching, "dog") },
                { "left_id": option_id(matching, "կատու"), "right_id": option_id(matching, "cat") }
            ]
        }),
    ]
}

#[tokio::test]
async fn health_check_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let unique_name = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": unique_name,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Username too short.
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn cms_import_requires_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/cms/lessons/import", address))
        .json(&serde_json::json!({ "lesson": {}, "exercises": [] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn lesson_payload_hides_answer_keys() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let slug = import_lesson(&client, &address).await;

    let lesson: serde_json::Value = client
        .get(format!("{}/api/lessons/{}", address, slug))
        .send()
        .await
        .expect("Fetch failed")
        .json()
        .await
        .unwrap();

    let exercises = lesson["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 5);

    for exercise in exercises {
        assert!(exercise.get("expected_answer").is_none());
        for option in exercise["options"].as_array().unwrap() {
            assert!(option.get("is_correct").is_none());
            assert!(option.get("match_key").is_none());
        }
    }

    // Positions arrive in presentation order.
    let positions: Vec<i64> = exercises
        .iter()
        .map(|e| e["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn anonymous_submission_grades_but_does_not_record() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let slug = import_lesson(&client, &address).await;

    let lesson: serde_json::Value = client
        .get(format!("{}/api/lessons/{}", address, slug))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let result: serde_json::Value = client
        .post(format!("{}/api/lessons/{}/submit", address, slug))
        .json(&serde_json::json!({ "answers": correct_answers(&lesson) }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    // 4 scored exercises correct; the char_intro still counts in the total.
    assert_eq!(result["correct"], 4);
    assert_eq!(result["total"], 5);
    assert_eq!(result["stars"], 2);
    assert_eq!(result["recorded"], false);
}

#[tokio::test]
async fn mismatched_lesson_id_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let slug = import_lesson(&client, &address).await;

    let response = client
        .post(format!("{}/api/lessons/{}/submit", address, slug))
        .json(&serde_json::json!({ "lesson_id": 999999, "answers": [] }))
        .send()
        .await
        .expect("Submit failed");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_exercise_ids_are_tolerated() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let slug = import_lesson(&client, &address).await;

    let result: serde_json::Value = client
        .post(format!("{}/api/lessons/{}/submit", address, slug))
        .json(&serde_json::json!({
            "answers": [ { "exercise_id": 987654321, "text": "whatever" } ]
        }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["correct"], 0);
    assert_eq!(result["total"], 5);
}

#[tokio::test]
async fn authenticated_submission_records_and_updates_progress() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let slug = import_lesson(&client, &address).await;
    let (_username, token) = register_and_login(&client, &address).await;

    let lesson: serde_json::Value = client
        .get(format!("{}/api/lessons/{}", address, slug))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let result: serde_json::Value = client
        .post(format!("{}/api/lessons/{}/submit", address, slug))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "answers": correct_answers(&lesson) }))
        .send()
        .await
        .expect("Submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["recorded"], true);
    assert_eq!(result["correct"], 4);

    // 4 of 5 exercises completed -> ratio 0.8 -> completed, 1 star.
    let analytics: serde_json::Value = client
        .get(format!("{}/api/lessons/{}/progress", address, slug))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Progress failed")
        .json()
        .await
        .unwrap();

    assert_eq!(analytics["completed_exercises"], 4);
    assert_eq!(analytics["total_exercises"], 5);
    assert_eq!(analytics["completed"], true);
    assert_eq!(analytics["stars"], 1);
    assert_eq!(analytics["xp_earned"], 40);

    // Anonymous callers get zero-valued analytics, not a 401.
    let anonymous: serde_json::Value = client
        .get(format!("{}/api/lessons/{}/progress", address, slug))
        .send()
        .await
        .expect("Progress failed")
        .json()
        .await
        .unwrap();

    assert_eq!(anonymous["completed_exercises"], 0);
    assert_eq!(anonymous["stars"], 0);

    // Resubmission appends to the result history instead of overwriting.
    let results: serde_json::Value = client
        .get(format!("{}/api/lessons/{}/results", address, slug))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Results failed")
        .json()
        .await
        .unwrap();

    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["correct"], 4);
    assert_eq!(results[0]["stars"], 2);

    // The overview includes the lesson completion bonus (40 + 50).
    let overview: serde_json::Value = client
        .get(format!("{}/api/progress", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Overview failed")
        .json()
        .await
        .unwrap();

    assert_eq!(overview["total_xp"], 90);
    assert_eq!(overview["lessons_completed"], 1);
}

// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handlers::{admin, auth, cms, lessons, progress, submit, tts},
    models,
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, cms_token_middleware, optional_auth_middleware},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hayeren-backend",
        description = "Language-learning backend: lessons, grading, progress, TTS"
    ),
    components(schemas(
        models::lesson::LessonSummary,
        models::lesson::PublicLesson,
        models::exercise::PublicExercise,
        models::exercise::PublicOption,
        models::exercise::ExerciseKind,
        models::submission::GradeResult,
        models::submission::GradeResponse,
        models::progress::ExerciseStats,
        models::progress::LessonAnalytics,
        models::progress::LessonProgressSummary,
        models::progress::ProgressOverview,
        models::progress::LeaderboardEntry,
    ))
)]
struct ApiDoc;

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, lessons, progress, tts, admin, cms).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, HTTP client).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-cms-token"),
        ]);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(5)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(GovernorLayer::new(governor_conf));

    let lesson_routes = Router::new()
        .route("/", get(lessons::list_lessons))
        .route("/{ident}", get(lessons::get_lesson))
        // Grading and stats degrade gracefully without a token.
        .merge(
            Router::new()
                .route("/{ident}/submit", post(submit::submit_lesson))
                .route("/{ident}/progress", get(progress::lesson_progress))
                .route("/{ident}/results", get(progress::lesson_results))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                )),
        );

    let exercise_routes = Router::new()
        .route("/{id}", get(lessons::get_exercise))
        .merge(
            Router::new()
                .route("/{id}/attempts", post(progress::record_attempt))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let progress_routes = Router::new()
        .route("/leaderboard", get(progress::get_leaderboard))
        .merge(
            Router::new()
                .route("/", get(progress::overview))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    optional_auth_middleware,
                )),
        );

    let tts_routes = Router::new().route("/", get(tts::synthesize));

    let admin_routes = Router::new()
        .route("/lessons", post(admin::create_lesson))
        .route(
            "/lessons/{id}",
            put(admin::update_lesson).delete(admin::delete_lesson),
        )
        .route("/lessons/{id}/exercises", post(admin::create_exercise))
        .route(
            "/exercises/{id}",
            put(admin::update_exercise).delete(admin::delete_exercise),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let cms_routes = Router::new()
        .route("/lessons/import", post(cms::import_lesson))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            cms_token_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/lessons", lesson_routes)
        .nest("/api/exercises", exercise_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/tts", tts_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/cms", cms_routes)
        // Cached audio is also served directly as static files.
        .nest_service("/media", ServeDir::new(&state.config.media_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

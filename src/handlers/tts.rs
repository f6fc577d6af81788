// src/handlers/tts.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{config::Config, error::AppError};

const DEFAULT_VOICE: &str = "default";

/// Query parameters for the TTS proxy.
#[derive(Debug, Deserialize, Validate)]
pub struct TtsParams {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[validate(length(min = 1, max = 50))]
    pub voice: Option<String>,
}

/// Helper struct for the audio cache row.
#[derive(sqlx::FromRow)]
struct CachedAudio {
    file_name: String,
}

/// Proxies text-to-speech synthesis.
///
/// Synthesized audio is cached on disk keyed by (text, voice); repeated
/// requests for the same phrase never hit the provider again. A vanished
/// cache file is re-synthesized, not an error.
pub async fn synthesize(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(http): State<reqwest::Client>,
    Query(params): Query<TtsParams>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = params.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let voice = params.voice.as_deref().unwrap_or(DEFAULT_VOICE);

    let cached = sqlx::query_as::<_, CachedAudio>(
        "SELECT file_name FROM tts_audio WHERE text = $1 AND voice = $2",
    )
    .bind(&params.text)
    .bind(voice)
    .fetch_optional(&pool)
    .await?;

    if let Some(row) = &cached {
        match tokio::fs::read(config.media_dir.join(&row.file_name)).await {
            Ok(bytes) => {
                return Ok(([(header::CONTENT_TYPE, "audio/mpeg")], bytes));
            }
            Err(e) => {
                tracing::warn!(
                    "Cached audio file {} missing ({}); re-synthesizing",
                    row.file_name,
                    e
                );
            }
        }
    }

    let bytes = fetch_from_provider(&http, &config, &params.text, voice).await?;

    let file_name = format!("{}.mp3", Uuid::new_v4());
    tokio::fs::write(config.media_dir.join(&file_name), &bytes)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO tts_audio (text, voice, file_name)
        VALUES ($1, $2, $3)
        ON CONFLICT (text, voice) DO UPDATE SET file_name = EXCLUDED.file_name
        "#,
    )
    .bind(&params.text)
    .bind(voice)
    .bind(&file_name)
    .execute(&pool)
    .await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], bytes.to_vec()))
}

/// Calls the configured synthesis provider and returns the raw audio bytes.
async fn fetch_from_provider(
    http: &reqwest::Client,
    config: &Config,
    text: &str,
    voice: &str,
) -> Result<axum::body::Bytes, AppError> {
    let mut request = http
        .post(&config.tts_api_url)
        .json(&json!({ "text": text, "voice": voice }));

    if let Some(key) = &config.tts_api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!(
            "TTS provider returned {}",
            response.status()
        )));
    }

    Ok(response.bytes().await?)
}

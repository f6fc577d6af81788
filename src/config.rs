// src/config.rs

use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;
use url::Url;

/// Runtime configuration, loaded once at startup and carried in `AppState`.
///
/// Token sets and origin lists that would otherwise live in process-wide
/// constants (CMS tokens, CORS origins) are explicit fields here so request
/// handlers receive them through state injection.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,

    /// Optional bootstrap admin credentials, seeded at startup.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,

    /// Accepted tokens for the CMS import surface (X-CMS-Token header).
    /// Empty list disables the surface entirely.
    pub cms_tokens: Vec<String>,

    /// Text-to-speech provider endpoint and credentials.
    pub tts_api_url: String,
    pub tts_api_key: Option<String>,

    /// Directory for cached synthesized audio files.
    pub media_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let allowed_origins = split_list(
            &env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string()),
        );

        let cms_tokens = split_list(&env::var("CMS_TOKENS").unwrap_or_default());

        let tts_api_url = env::var("TTS_API_URL")
            .unwrap_or_else(|_| "http://localhost:8020/synthesize".to_string());
        Url::parse(&tts_api_url).expect("TTS_API_URL must be a valid URL");

        let tts_api_key = env::var("TTS_API_KEY").ok();

        let media_dir = env::var("MEDIA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            admin_username,
            admin_password,
            allowed_origins,
            cms_tokens,
            tts_api_url,
            tts_api_key,
            media_dir,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list(" a , b ,,c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}

use std::{env, path::PathBuf};

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Mount point of the JSON API, always `/segment[/segment...]`.
    pub api_prefix: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub upload_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("SECRET_KEY").context("SECRET_KEY is not set")?;
        let api_prefix = normalize_prefix(
            &env::var("API_URL").unwrap_or_else(|_| "/api/v1".to_string()),
        )?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public/uploads"));
        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(24);
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|b| b.parse::<usize>().ok())
            .unwrap_or(20 * 1024 * 1024);

        Ok(Self {
            database_url,
            host,
            port,
            api_prefix,
            jwt_secret,
            token_ttl_hours,
            upload_dir,
            max_body_bytes,
        })
    }
}

/// `api/v1/` and `/api/v1` both become `/api/v1`.
pub fn normalize_prefix(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        bail!("API_URL must name a non-root path such as /api/v1");
    }
    Ok(format!("/{trimmed}"))
}

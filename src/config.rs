use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub tmdb_access_token: String,
    pub tmdb_base_url: String,
    pub tmdb_image_url: String,
    pub tmdb_rps: u32,
    pub database_url: String,
    pub secret_key: Option<String>,
    pub session_ttl_days: i64,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let tmdb_access_token = std::env::var("TMDB_ACCESS_TOKEN")
            .or_else(|_| std::env::var("API_TOKEN"))
            .unwrap_or_default();
        let tmdb_base_url = std::env::var("TMDB_BASE_URL")
            .unwrap_or_else(|_| "https://api.themoviedb.org/3".to_string());
        let tmdb_image_url = std::env::var("TMDB_IMAGE_URL")
            .unwrap_or_else(|_| "https://image.tmdb.org/t/p/w500".to_string());

        let tmdb_rps: u32 =
            std::env::var("TMDB_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("DB_URI"))
            .unwrap_or_else(|_| "sqlite://movie-database.db?mode=rwc".to_string());

        let secret_key = checked_secret(std::env::var("SECRET_KEY").ok())?;

        let session_ttl_days: i64 =
            std::env::var("SESSION_TTL_DAYS").ok().and_then(|s| s.parse().ok()).unwrap_or(31);

        let static_dir =
            std::env::var("STATIC_DIR").map(PathBuf::from).unwrap_or_else(|_| "static".into());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            tmdb_access_token,
            tmdb_base_url,
            tmdb_image_url,
            tmdb_rps,
            database_url,
            secret_key,
            session_ttl_days,
            static_dir,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            addr: "127.0.0.1:0".parse().unwrap(),
            tmdb_access_token: String::new(),
            tmdb_base_url: "http://127.0.0.1:9".to_string(),
            tmdb_image_url: "https://image.tmdb.org/t/p/w500".to_string(),
            tmdb_rps: 1000,
            database_url: "sqlite::memory:".to_string(),
            secret_key: Some("test-secret-key-that-is-long-enough-for-hkdf".to_string()),
            session_ttl_days: 1,
            static_dir: "static".into(),
        }
    }
}

const MIN_SECRET_LEN: usize = 32;

/// Empty counts as unset; anything shorter than the HKDF minimum is refused.
fn checked_secret(raw: Option<String>) -> anyhow::Result<Option<String>> {
    let Some(secret) = raw.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    anyhow::ensure!(
        secret.len() >= MIN_SECRET_LEN,
        "SECRET_KEY must be at least {MIN_SECRET_LEN} bytes long"
    );
    Ok(Some(secret))
}

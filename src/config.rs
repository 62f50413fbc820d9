use std::{net::SocketAddr, time::Duration};

use anyhow::Context;

use crate::retry::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_minutes: i64,
    pub movies_api_url: String,
    pub movies_username: String,
    pub movies_password: String,
    pub movies_rps: u32,
    pub movies_retry: RetryPolicy,
    pub public_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelshelf.db?mode=rwc".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let jwt_ttl_minutes: i64 =
            std::env::var("JWT_TTL_MINUTES").ok().and_then(|s| s.parse().ok()).unwrap_or(60);

        let movies_api_url = std::env::var("MOVIES_API_URL")
            .unwrap_or_else(|_| "https://demo.credy.in/api/v1/maya/movies/".to_string());

        // Upstream catalogue credentials keep the names the deployment already uses.
        let movies_username = std::env::var("USER_NAME").unwrap_or_default();
        let movies_password = std::env::var("PASS_WORD").unwrap_or_default();

        let movies_rps: u32 =
            std::env::var("MOVIES_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let defaults = RetryPolicy::default();
        let max_retries: u32 = std::env::var("MOVIES_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_retries);
        let backoff_factor: f64 = std::env::var("MOVIES_BACKOFF_FACTOR")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|f: &f64| f.is_finite() && *f >= 0.0)
            .unwrap_or(defaults.backoff_factor);
        let retry_statuses = match std::env::var("MOVIES_RETRY_STATUSES") {
            Ok(raw) => parse_statuses(&raw).context("MOVIES_RETRY_STATUSES")?,
            Err(_) => defaults.retry_statuses,
        };
        let attempt_timeout = std::env::var("MOVIES_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.attempt_timeout);

        let public_url = std::env::var("PUBLIC_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            jwt_secret,
            jwt_ttl_minutes,
            movies_api_url,
            movies_username,
            movies_password,
            movies_rps,
            movies_retry: RetryPolicy { max_retries, backoff_factor, retry_statuses, attempt_timeout },
            public_url,
        })
    }
}

fn parse_statuses(raw: &str) -> anyhow::Result<Vec<u16>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().with_context(|| format!("invalid status code {s:?}")))
        .collect()
}

use std::time::Duration;

use anyhow::{Context, bail};

const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub remote_api_url: Option<String>,
    pub remote_timeout: Duration,
    pub face_min_confidence: f64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = get("FLOCK_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("FLOCK_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("FLOCK_PORT must be a port number")?;
        let db_path = get("FLOCK_DB_PATH").unwrap_or_else(|| "flock.db".into());

        let jwt_secret = get("FLOCK_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FLOCK_JWT_SECRET must be set to a random secret");
        }

        let remote_api_url = get("FLOCK_REMOTE_API_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let timeout_secs: u64 = get("FLOCK_REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|| "10".into())
            .parse()
            .context("FLOCK_REMOTE_TIMEOUT_SECS must be a whole number of seconds")?;
        let face_min_confidence: f64 = get("FLOCK_FACE_MIN_CONFIDENCE")
            .unwrap_or_else(|| "0.80".into())
            .parse()
            .context("FLOCK_FACE_MIN_CONFIDENCE must be a number")?;
        if !(0.0..=1.0).contains(&face_min_confidence) {
            bail!("FLOCK_FACE_MIN_CONFIDENCE must be between 0 and 1");
        }

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            remote_api_url,
            remote_timeout: Duration::from_secs(timeout_secs),
            face_min_confidence,
        })
    }
}

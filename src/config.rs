use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let secret = std::env::var("JWT_SECRET")
            .or_else(|_| std::env::var("SECRET_KEY"))
            .context("JWT_SECRET is not set")?;
        let algorithm = std::env::var("JWT_ALGORITHM")
            .or_else(|_| std::env::var("ALGORITHM"))
            .unwrap_or_else(|_| "HS256".into());
        let jwt = JwtConfig {
            secret,
            algorithm: parse_algorithm(&algorithm)?,
            ttl_minutes: setting("JWT_TTL_MINUTES", std::env::var("JWT_TTL_MINUTES").ok(), 60 * 24)?,
        };

        let storage = StorageConfig {
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "static".into())
                .into(),
            max_upload_bytes: setting(
                "MAX_UPLOAD_BYTES",
                std::env::var("MAX_UPLOAD_BYTES").ok(),
                20 * 1024 * 1024,
            )?,
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
        })
    }
}

/// Positive number from `raw`, or `default` when the variable is unset.
fn setting<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<T>()
        .with_context(|| format!("{key} is not a valid number: {raw:?}"))?;
    if value <= T::default() {
        anyhow::bail!("{key} must be positive, got {raw:?}");
    }
    Ok(value)
}

/// Only HMAC algorithms make sense with a shared secret.
pub fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    let alg = Algorithm::from_str(raw.trim())
        .with_context(|| format!("unknown JWT algorithm {raw:?}"))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => anyhow::bail!("unsupported JWT algorithm {other:?}, expected HS256/HS384/HS512"),
    }
}

use crate::application_impl::{DEFAULT_OP_TIMEOUT, HmacAlgorithm};
use crate::domain_model::DEFAULT_KEY_NAMESPACE;
use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub http: Http,
    pub jwt: Jwt,
    pub log: Log,
    pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Jwt {
    #[serde(default)]
    pub algorithm: HmacAlgorithm,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "memory" or "redis"
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_key_namespace")]
    pub key_namespace: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Session {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

fn default_key_namespace() -> String {
    DEFAULT_KEY_NAMESPACE.to_string()
}

fn default_access_ttl_secs() -> u64 {
    15 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_op_timeout_ms() -> u64 {
    DEFAULT_OP_TIMEOUT.as_millis() as u64
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    if settings.session.access_ttl_secs == 0 || settings.session.refresh_ttl_secs == 0 {
        return Err(anyhow!("session TTLs must be positive"));
    }
    Ok(settings)
}

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
const MIN_SECRET_LEN: usize = 32;
#[cfg(debug_assertions)]
const DEV_SECRET: &str = "sessionward-dev-secret-do-not-deploy";

/// Reads the signing secret from `JWT_SECRET`. Debug builds fall back to a
/// fixed development key.
pub fn jwt_secret() -> Result<Vec<u8>> {
    match std::env::var(JWT_SECRET_ENV) {
        Ok(secret) => check_secret(secret.into_bytes()),
        #[cfg(debug_assertions)]
        Err(_) => {
            tracing::warn!("{} not set, using the development signing key", JWT_SECRET_ENV);
            Ok(DEV_SECRET.as_bytes().to_vec())
        }
        #[cfg(not(debug_assertions))]
        Err(e) => Err(anyhow!("{}: {}", JWT_SECRET_ENV, e)),
    }
}

fn check_secret(secret: Vec<u8>) -> Result<Vec<u8>> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(anyhow!(
            "{} must be at least {} bytes",
            JWT_SECRET_ENV,
            MIN_SECRET_LEN
        ));
    }
    Ok(secret)
}

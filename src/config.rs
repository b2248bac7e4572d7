use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PortalError, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://api.chama365guinchos.com.br";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub reconcile: ReconcileConfig,
    pub session_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

/// Cadence and deadline of the payment confirmation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("CHAMA_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        Ok(Config {
            api: ApiConfig::new(&base_url, env_u64("CHAMA_HTTP_TIMEOUT_SECS", 20))?,
            reconcile: ReconcileConfig {
                poll_interval_secs: env_u64("CHAMA_POLL_INTERVAL_SECS", 30),
                timeout_secs: env_u64("CHAMA_POLL_TIMEOUT_SECS", 600),
            },
            session_file: env::var("CHAMA_SESSION_FILE")
                .unwrap_or_else(|_| "chama365-session.json".to_string())
                .into(),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

impl ApiConfig {
    pub fn new(base_url: &str, request_timeout_secs: u64) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PortalError::Config(format!(
                "API base URL must be http(s), got {:?}",
                base_url
            )));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            request_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ReconcileConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            timeout_secs: 600,
        }
    }
}

use rocket::figment::Figment;
use serde::Deserialize;

use std::time::Duration;

use crate::internal_error::{InternalError, InternalResult};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Local,
}

/// Application settings, read from the same Figment Rocket uses (`Rocket.toml`, `ROCKET_*`).
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub storage: StorageBackend,
    pub local_store_path: String,
    pub session_ttl_days: i64,
    pub completion_delay_ms: u64,
    pub log_filter: String,
    pub static_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: "revise.db".to_string(),
            storage: StorageBackend::Sqlite,
            local_store_path: "revise_local.json".to_string(),
            session_ttl_days: 7,
            completion_delay_ms: 3000,
            log_filter: "revise=info".to_string(),
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> InternalResult<AppConfig> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| InternalError::Internal(format!("Invalid configuration: {}", e)))?;

        if config.session_ttl_days <= 0 {
            return Err(InternalError::validation("session_ttl_days must be positive"));
        }

        Ok(config)
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days)
    }
}

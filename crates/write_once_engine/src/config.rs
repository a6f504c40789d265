#![forbid(unsafe_code)]

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::EnforcementMode;

pub const WRITE_ONCE_ENFORCE_ERRORS_ENV: &str = "WRITE_ONCE_ENFORCE_ERRORS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid write-once config json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteOnceConfig {
    /// `true` rejects violations; `false` applies them and warns.
    pub enforce_errors: bool,
}

impl WriteOnceConfig {
    pub fn mvp_v1() -> Self {
        Self {
            enforce_errors: true,
        }
    }

    pub fn from_env() -> Self {
        Self::from_env_value(env::var(WRITE_ONCE_ENFORCE_ERRORS_ENV).ok())
    }

    pub fn from_env_value(value: Option<String>) -> Self {
        let normalized = value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_ascii_lowercase);
        let enforce_errors = match normalized.as_deref() {
            None => true,
            Some("true" | "1" | "on" | "strict") => true,
            Some("false" | "0" | "off" | "permissive" | "warn") => false,
            Some(other) => {
                tracing::warn!(
                    value = other,
                    env = WRITE_ONCE_ENFORCE_ERRORS_ENV,
                    "unrecognized enforcement value, keeping strict"
                );
                true
            }
        };
        Self { enforce_errors }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn mode(&self) -> EnforcementMode {
        if self.enforce_errors {
            EnforcementMode::Strict
        } else {
            EnforcementMode::Permissive
        }
    }
}

impl Default for WriteOnceConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

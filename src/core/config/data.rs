use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::exchange::ExchangeConfig;
use crate::core::liveness::DEFAULT_HEARTBEAT_INTERVAL;
use crate::core::session::DEFAULT_SESSION_NAME_LIMIT;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const BASE_URL_ENV: &str = "CHATSTREAM_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root URL of the chat backend (e.g., "http://localhost:3000")
    pub base_url: Option<String>,
    /// Seconds between stream liveness checks
    pub heartbeat_interval_secs: Option<u64>,
    /// Characters of the first message kept when naming a session
    pub session_name_limit: Option<usize>,
    /// Transcript log written after each confirmed exchange
    pub log_file: Option<String>,
}

impl Config {
    /// Base URL in priority order: explicit override, environment, config file, default.
    pub fn resolve_base_url(&self, override_url: Option<&str>) -> String {
        override_url
            .map(str::to_string)
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .or_else(|| self.base_url.clone())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL)
    }

    pub fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            heartbeat_interval: self.heartbeat_interval(),
            session_name_limit: self
                .session_name_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_SESSION_NAME_LIMIT),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            "base-url" => {
                if value.is_empty() {
                    return Err("base-url cannot be empty".to_string());
                }
                self.base_url = Some(value.to_string());
            }
            "heartbeat-interval" => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| format!("Invalid heartbeat-interval: {value}"))?;
                self.heartbeat_interval_secs = Some(secs);
            }
            "session-name-limit" => {
                let limit = value
                    .parse::<usize>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(|| format!("Invalid session-name-limit: {value}"))?;
                self.session_name_limit = Some(limit);
            }
            "log-file" => self.log_file = Some(value.to_string()).filter(|v| !v.is_empty()),
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = None,
            "heartbeat-interval" => self.heartbeat_interval_secs = None,
            "session-name-limit" => self.session_name_limit = None,
            "log-file" => self.log_file = None,
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

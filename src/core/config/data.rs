use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::constants::{BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::utils::url::trim_base_url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend root, e.g. `https://kb.example.com`
    pub base_url: Option<String>,
    /// Whole-request timeout, streaming included
    pub timeout_secs: Option<u64>,
    /// Free-form description sent with login requests
    pub device_info: Option<String>,
}

/// Keys accepted by `kbchat set` and `kbchat unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BaseUrl,
    Timeout,
    DeviceInfo,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [ConfigKey::BaseUrl, ConfigKey::Timeout, ConfigKey::DeviceInfo];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::Timeout => "timeout",
            ConfigKey::DeviceInfo => "device-info",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s.trim())
            .ok_or_else(|| {
                let known: Vec<_> = ConfigKey::ALL.iter().map(|key| key.as_str()).collect();
                format!("Unknown config key: {s} (expected one of: {})", known.join(", "))
            })
    }
}

impl Config {
    /// Base URL with the environment override applied.
    pub fn base_url(&self) -> String {
        self.resolve_base_url(std::env::var(BASE_URL_ENV).ok())
    }

    pub fn resolve_base_url(&self, env_override: Option<String>) -> String {
        let chosen = env_override
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        trim_base_url(chosen.trim()).to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {key}"));
        }
        match key {
            ConfigKey::BaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(format!("base-url must start with http:// or https://: {value}"));
                }
                self.base_url = Some(trim_base_url(value).to_string());
            }
            ConfigKey::Timeout => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| format!("timeout must be a whole number of seconds: {value}"))?;
                if secs == 0 {
                    return Err("timeout must be at least 1 second".to_string());
                }
                self.timeout_secs = Some(secs);
            }
            ConfigKey::DeviceInfo => self.device_info = Some(value.to_string()),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::Timeout => self.timeout_secs = None,
            ConfigKey::DeviceInfo => self.device_info = None,
        }
    }
}

/// Render a path for messages, abbreviating the home directory on Unix.
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

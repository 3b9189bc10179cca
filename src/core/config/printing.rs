use crate::core::config::data::{Config, ConfigKey};
use crate::core::constants::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

impl Config {
    pub fn describe(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::BaseUrl => match &self.base_url {
                Some(url) => url.clone(),
                None => format!("(unset, default {DEFAULT_BASE_URL})"),
            },
            ConfigKey::Timeout => match self.timeout_secs {
                Some(secs) => format!("{secs}s"),
                None => format!("(unset, default {DEFAULT_TIMEOUT_SECS}s)"),
            },
            ConfigKey::DeviceInfo => self
                .device_info
                .clone()
                .unwrap_or_else(|| "(unset)".to_string()),
        }
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        for key in ConfigKey::ALL {
            println!("  {key}: {}", self.describe(key));
        }
    }
}

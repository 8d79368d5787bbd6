use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::PanelError;

// Firmware builds differ in whether status is served from one combined
// endpoint or split up.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EndpointLayout {
    #[default]
    Combined,
    Split,
}

impl FromStr for EndpointLayout {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combined" => Ok(EndpointLayout::Combined),
            "split" => Ok(EndpointLayout::Split),
            other => Err(PanelError::Config(format!(
                "unknown endpoint layout '{}', expected 'combined' or 'split'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub device_url: String,
    #[serde(default)]
    pub endpoint_layout: EndpointLayout,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub releases_api_url: String,
    pub releases_repo: String,
    pub include_prereleases: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_url: "http://192.168.4.1".to_string(),
            endpoint_layout: EndpointLayout::Combined,
            poll_interval_ms: 1000,
            request_timeout_ms: 1000,
            releases_api_url: "https://api.github.com".to_string(),
            releases_repo: "tpanajott/ESP32_IR_AC_Controller".to_string(),
            include_prereleases: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let device_url = env::var("DEVICE_URL").unwrap_or(defaults.device_url);
        let endpoint_layout = match env::var("ENDPOINT_LAYOUT") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.endpoint_layout,
        };

        let poll_interval_ms = get_env_var_u64("POLL_INTERVAL_MS", defaults.poll_interval_ms);
        let request_timeout_ms = get_env_var_u64("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms);

        let releases_api_url = env::var("RELEASES_API_URL").unwrap_or(defaults.releases_api_url);
        let releases_repo = env::var("RELEASES_REPO").unwrap_or(defaults.releases_repo);
        let include_prereleases = get_env_var_bool("INCLUDE_PRERELEASES", defaults.include_prereleases);

        let config = Config {
            device_url,
            endpoint_layout,
            poll_interval_ms,
            request_timeout_ms,
            releases_api_url,
            releases_repo,
            include_prereleases,
        };
        config.validate()?;
        Ok(config)
    }

    fn get_config_file_path() -> PathBuf {
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(config_dir).join("panel_config.json")
    }

    pub fn load_from_file() -> Result<Option<Self>> {
        let config_file_path = Self::get_config_file_path();
        if !config_file_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&config_file_path)?;
        let config = Self::from_json(&contents)?;
        Ok(Some(config))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if !(self.device_url.starts_with("http://") || self.device_url.starts_with("https://")) {
            return Err(PanelError::Config(format!(
                "device_url '{}' must start with http:// or https://",
                self.device_url
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(PanelError::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(PanelError::Config("request_timeout_ms must be positive".to_string()));
        }
        if self.releases_repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(PanelError::Config(format!(
                "releases_repo '{}' must look like owner/repo",
                self.releases_repo
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn get_env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

fn get_env_var_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

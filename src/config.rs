use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::notifications::{NotifierConfig, DEFAULT_PACING};
use crate::playstore::client::DEFAULT_API_BASE_URL;

pub const DEFAULT_CONFIG_PATH: &str = "review-notifier.yml";

/// Runtime configuration, built once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub package_name: String,
    pub webhook_url: String,
    pub key_path: PathBuf,
    pub reviews_csv: PathBuf,
    pub log_dir: PathBuf,
    /// Log notifications instead of sending them
    pub test_mode: bool,
    pub pacing_delay_ms: u64,
    /// Page size for the reviews listing; the API picks one when unset
    pub max_results: Option<u32>,
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_name: "com.example.app".to_string(),
            webhook_url: "https://chat.googleapis.com/v1/spaces/XXXXX/messages?key=YOUR_KEY&token=YOUR_TOKEN"
                .to_string(),
            key_path: PathBuf::from("./service-account.json"),
            reviews_csv: PathBuf::from("reviews.csv"),
            log_dir: PathBuf::from("./logs"),
            test_mode: true,
            pacing_delay_ms: DEFAULT_PACING.as_millis() as u64,
            max_results: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// Values supplied through the environment or command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub package_name: Option<String>,
    pub webhook_url: Option<String>,
    pub key_path: Option<PathBuf>,
    pub reviews_csv: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub test_mode: Option<String>,
    pub pacing_delay_ms: Option<u64>,
    pub max_results: Option<u32>,
    pub api_base_url: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Defaults plus overrides, for logging a config file that failed to load
    pub fn fallback(overrides: Overrides) -> Self {
        Self::default().apply(overrides)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(v) = overrides.package_name {
            self.package_name = v;
        }
        if let Some(v) = overrides.webhook_url {
            self.webhook_url = v;
        }
        if let Some(v) = overrides.key_path {
            self.key_path = v;
        }
        if let Some(v) = overrides.reviews_csv {
            self.reviews_csv = v;
        }
        if let Some(v) = overrides.log_dir {
            self.log_dir = v;
        }
        // An unparseable flag keeps the lower layer's value
        if let Some(v) = overrides.test_mode.as_deref().and_then(parse_bool) {
            self.test_mode = v;
        }
        if let Some(v) = overrides.pacing_delay_ms {
            self.pacing_delay_ms = v;
        }
        if overrides.max_results.is_some() {
            self.max_results = overrides.max_results;
        }
        if let Some(v) = overrides.api_base_url {
            self.api_base_url = v;
        }
        self
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    pub fn notifier_config(&self) -> NotifierConfig {
        NotifierConfig {
            webhook_url: self.webhook_url.clone(),
            dry_run: self.test_mode,
            pacing: self.pacing(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

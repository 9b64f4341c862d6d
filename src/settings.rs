//! User settings stored as settings.json in the app data directory

use crate::constants::*;
use crate::pipeline::{Endpoints, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Remote source
    pub listing_url: String,
    pub raw_base_url: String,

    // Paths
    pub asset_path: Option<String>,
    pub snapshot_path: Option<String>,

    // Retry
    pub max_attempts: u32,
    pub network_retry_secs: u64,
    pub unsupported_retry_secs: u64,
    pub decode_retry_secs: u64,
    pub cycle_interval_secs: u64,

    // Transport
    pub read_timeout_secs: u64,
    pub accept_invalid_certs: bool,

    // Panel
    pub display_width: u32,
    pub display_height: u32,

    // Fixed RNG seed, for reproducible selection
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            raw_base_url: RAW_BASE_URL.to_string(),
            asset_path: None,
            snapshot_path: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            network_retry_secs: DEFAULT_NETWORK_RETRY_SECS,
            unsupported_retry_secs: DEFAULT_UNSUPPORTED_RETRY_SECS,
            decode_retry_secs: DEFAULT_DECODE_RETRY_SECS,
            cycle_interval_secs: DEFAULT_CYCLE_INTERVAL_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            accept_invalid_certs: false,
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            seed: None,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    pub fn asset_path_or_default(&self, data_dir: &Path) -> PathBuf {
        self.asset_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(ASSET_FILE_NAME))
    }

    pub fn snapshot_path_or_default(&self, data_dir: &Path) -> PathBuf {
        self.snapshot_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(SNAPSHOT_FILE_NAME))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            network_backoff: Duration::from_secs(self.network_retry_secs),
            unsupported_backoff: Duration::from_secs(self.unsupported_retry_secs),
            decode_backoff: Duration::from_secs(self.decode_retry_secs),
            cycle_interval: Duration::from_secs(self.cycle_interval_secs),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            listing_url: self.listing_url.clone(),
            raw_base_url: self.raw_base_url.clone(),
        }
    }
}

//! `plansync.toml` settings.
//!
//! ```toml
//! store_dir = "/var/lib/plansync"
//! error_sample_size = 10
//! max_batch_size = 50000
//! default_log_limit = 20
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use plansync_core::{DEFAULT_ERROR_SAMPLE_SIZE, EngineOptions};

/// Default settings file name, resolved against the working directory.
pub const SETTINGS_FILENAME: &str = "plansync.toml";

const DEFAULT_STORE_DIR: &str = "plansync-data";
const DEFAULT_LOG_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the JSON repository.
    pub store_dir: PathBuf,
    pub error_sample_size: usize,
    pub max_batch_size: Option<usize>,
    /// Entries shown by `plansync logs` without `--limit`.
    pub default_log_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            error_sample_size: DEFAULT_ERROR_SAMPLE_SIZE,
            max_batch_size: None,
            default_log_limit: DEFAULT_LOG_LIMIT,
        }
    }
}

impl Settings {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            error_sample_size: self.error_sample_size,
            max_batch_size: self.max_batch_size,
        }
    }
}

/// Load settings, falling back to defaults when the file is missing or
/// cannot be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to parse settings file, using defaults");
                Settings::default()
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no settings file found, using defaults");
            Settings::default()
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to read settings file, using defaults");
            Settings::default()
        }
    }
}

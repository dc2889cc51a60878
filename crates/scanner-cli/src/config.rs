//! Host configuration
//!
//! Layered: built-in defaults, then `scanner.toml` (or an explicit file),
//! then `SCANNER_*` environment variables.

use ::config::{Config, ConfigError, Environment, File};
use capture_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use upload_client::{SubmissionMetadata, UploadConfig};

/// Prefix for environment overrides, e.g. `SCANNER_BASE_URL`
pub const ENV_PREFIX: &str = "SCANNER";

/// Config file looked up in the working directory (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "scanner";

/// Effective host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Processing service base URL
    pub base_url: String,
    pub timeout_secs: u32,
    pub log_level: String,

    // Submitter identity sent with every upload
    pub user_id: String,
    pub user_name: String,
    pub pick_up_location: String,

    /// Still size when the camera does not report one
    pub default_width: u32,
    pub default_height: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
            log_level: "info".to_string(),
            user_id: "1".to_string(),
            user_name: "Aayush".to_string(),
            pick_up_location: "A7".to_string(),
            default_width: 1280,
            default_height: 720,
        }
    }
}

impl ScannerConfig {
    /// Load defaults, the config file and environment overrides.
    ///
    /// An explicit `path` must exist; the default `scanner.*` file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::layered(path, Some(Self::environment()))
    }

    /// `SCANNER_*` variables are taken as text; numeric fields parse from it,
    /// identity fields keep leading zeros and exponents verbatim.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
    }

    fn layered(path: Option<&Path>, env: Option<Environment>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("timeout_secs", i64::from(defaults.timeout_secs))?
            .set_default("log_level", defaults.log_level)?
            .set_default("user_id", defaults.user_id)?
            .set_default("user_name", defaults.user_name)?
            .set_default("pick_up_location", defaults.pick_up_location)?
            .set_default("default_width", i64::from(defaults.default_width))?
            .set_default("default_height", i64::from(defaults.default_height))?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Message("base_url must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Message("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Upload client settings
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            timeout: Duration::from_secs(u64::from(self.timeout_secs)),
            ..UploadConfig::new(self.base_url.clone())
        }
    }

    /// Identity sent with every upload, exactly as configured
    pub fn metadata(&self) -> SubmissionMetadata {
        SubmissionMetadata::new(&self.user_id, &self.user_name, &self.pick_up_location)
    }

    /// Capture session settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::with_default_resolution(self.default_width, self.default_height)
    }
}

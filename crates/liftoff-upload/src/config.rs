//! Uploader configuration
//!
//! Configuration lives in `liftoff.toml` (or `liftoff.yaml`) and is found by
//! walking up from the working directory:
//!
//! ```toml
//! max_in_flight = 8
//! requests_per_second = 4
//! burst = 10
//! request_timeout_secs = 120
//! upload_timeout_secs = 900
//! ```
//!
//! Every key is optional. Unset throttling keys mean "no limit".

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default burst for the request rate limiter
pub const DEFAULT_BURST: u32 = 10;

/// Environment variable overriding `max_in_flight`
pub const ENV_MAX_IN_FLIGHT: &str = "LIFTOFF_MAX_IN_FLIGHT";

/// Environment variable overriding `requests_per_second`
pub const ENV_REQUESTS_PER_SECOND: &str = "LIFTOFF_REQUESTS_PER_SECOND";

/// Configuration file names, in priority order
pub fn config_file_names() -> &'static [&'static str] {
    &["liftoff.toml", ".liftoff.toml", "liftoff.yaml", "liftoff.yml"]
}

/// Settings for the upload coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum number of part requests in flight at once
    pub max_in_flight: Option<usize>,

    /// Maximum number of part requests started per second
    pub requests_per_second: Option<u32>,

    /// Requests allowed back to back before rate limiting applies
    pub burst: u32,

    /// Timeout for a single part request
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection
    pub connect_timeout_secs: u64,

    /// Deadline for the whole asset upload
    pub upload_timeout_secs: Option<u64>,

    /// User agent sent with part requests
    pub user_agent: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            requests_per_second: None,
            burst: DEFAULT_BURST,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            upload_timeout_secs: None,
            user_agent: format!("liftoff/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl UploadConfig {
    /// Timeout for a single part request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for establishing a connection
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Deadline for the whole asset upload
    pub fn upload_timeout(&self) -> Option<Duration> {
        self.upload_timeout_secs.map(Duration::from_secs)
    }

    /// Check values for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == Some(0) {
            return Err(invalid("max_in_flight", "must be greater than zero"));
        }
        if self.requests_per_second == Some(0) {
            return Err(invalid("requests_per_second", "must be greater than zero"));
        }
        if self.burst == 0 {
            return Err(invalid("burst", "must be greater than zero"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be greater than zero"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(invalid("connect_timeout_secs", "must be greater than zero"));
        }
        if self.upload_timeout_secs == Some(0) {
            return Err(invalid("upload_timeout_secs", "must be greater than zero"));
        }
        Ok(())
    }

    /// Apply `LIFTOFF_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_IN_FLIGHT) {
            let parsed = value
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_MAX_IN_FLIGHT, &format!("not a number: {}", value)))?;
            debug!(max_in_flight = parsed, "max_in_flight overridden from environment");
            self.max_in_flight = Some(parsed);
        }

        if let Some(value) = lookup(ENV_REQUESTS_PER_SECOND) {
            let parsed = value.trim().parse().map_err(|_| {
                invalid(ENV_REQUESTS_PER_SECOND, &format!("not a number: {}", value))
            })?;
            debug!(
                requests_per_second = parsed,
                "requests_per_second overridden from environment"
            );
            self.requests_per_second = Some(parsed);
        }

        self.validate()
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<UploadConfig, ConfigError> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path)?;

    let config: UploadConfig = if format == "TOML" {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    config.validate()?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// Each level checks `<dir>/<name>` and then `<dir>/.github/<name>`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.exists() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(UploadConfig, PathBuf), ConfigError> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults when no file is found.
///
/// A config file that exists but cannot be read or fails validation is an
/// error; it never silently falls back to defaults.
pub fn load_config_or_default(
    dir: &Path,
) -> Result<(UploadConfig, Option<PathBuf>), ConfigError> {
    match load_config_from_dir(dir) {
        Ok((config, path)) => Ok((config, Some(path))),
        Err(ConfigError::NotFound(_)) => {
            debug!(dir = %dir.display(), "no config found, using defaults");
            Ok((UploadConfig::default(), None))
        }
        Err(e) => Err(e),
    }
}

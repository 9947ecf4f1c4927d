//! Configuration management for iris
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `IRIS_` prefix, `__` for nesting)
//! 2. `<dir>/iris.toml` in the working directory
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # iris.toml
//! [service]
//! rate_limit = 14
//! retries = 2
//!
//! [service.smtp]
//! host = "smtp.example.com"
//! port = 587
//! username = "mailer"
//! password = "secret"
//! encryption = "starttls"
//!
//! [message]
//! sender = "Newsletter <news@example.com>"
//! reply_to = ["support@example.com"]
//! recipient_column = "email"
//! default_data_file = "default.csv"
//! recipient_data_file = "recipients.csv"
//! minify_html = true
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use iris::config::IrisConfig;
//!
//! # fn example() -> Result<(), iris::config::ConfigError> {
//! let config = IrisConfig::load_from_dir(".")?;
//! let rate = config.service.rate_limit;
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "iris.toml";

/// Errors raised while loading or writing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration sources could not be merged or extracted
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// Defaults could not be serialized to TOML
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Configuration file could not be written
    #[error("failed to write configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Neither a network transport nor dry-run was selected
    #[error("cannot select a suitable emailing service based on the provided configuration")]
    MissingTransport,

    /// A configuration value is out of range or malformed
    #[error("configuration error: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Delivery service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Maximum sends per second (0 disables rate limiting)
    pub rate_limit: u32,

    /// Extra attempts after a failed send
    pub retries: u32,

    /// AWS SES transport settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_ses: Option<AwsSesSettings>,

    /// SMTP transport settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpSettings>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            rate_limit: 14, // default SES sending rate
            retries: 2,
            aws_ses: None,
            smtp: None,
        }
    }
}

/// AWS SES transport settings
///
/// Empty values fall back to the AWS SDK default provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsSesSettings {
    /// AWS region, e.g. `us-east-1`
    pub region: String,

    /// Named profile from the shared AWS config files
    pub profile: String,
}

/// SMTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// SMTP server hostname
    pub host: String,

    /// SMTP server port
    pub port: u16,

    /// SMTP username (empty disables authentication)
    pub username: String,

    /// SMTP password
    pub password: String,

    /// One of `none`, `ssl`, `tls`, `ssl/tls`, `starttls`
    pub encryption: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            encryption: "ssl/tls".to_string(),
        }
    }
}

/// Message composition settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSettings {
    /// `From` address for every message
    pub sender: String,

    /// `Reply-To` addresses for every message
    pub reply_to: Vec<String>,

    /// Column of the recipient table holding the recipient address
    pub recipient_column: String,

    /// Default table file name (empty for none)
    pub default_data_file: String,

    /// Recipient table file name
    pub recipient_data_file: String,

    /// Minify the rendered HTML body
    pub minify_html: bool,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            sender: "Iris CLI <iris@example.test>".to_string(),
            reply_to: Vec::new(),
            recipient_column: "Recipient".to_string(),
            default_data_file: "default.csv".to_string(),
            recipient_data_file: "recipients.csv".to_string(),
            minify_html: false,
        }
    }
}

impl MessageSettings {
    /// Path of the default table inside `dir`, if one is configured
    #[must_use]
    pub fn default_data_path(&self, dir: &Path) -> Option<PathBuf> {
        if self.default_data_file.is_empty() {
            None
        } else {
            Some(dir.join(&self.default_data_file))
        }
    }

    /// Path of the recipient table inside `dir`
    #[must_use]
    pub fn recipient_data_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.recipient_data_file)
    }
}

/// Complete iris configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrisConfig {
    /// Delivery service settings
    #[serde(default)]
    pub service: ServiceSettings,

    /// Message settings
    #[serde(default)]
    pub message: MessageSettings,
}

impl IrisConfig {
    /// Load configuration for a working directory
    ///
    /// Merges, in increasing priority: defaults, `<dir>/iris.toml` (if
    /// present) and `IRIS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - The configuration file contains invalid TOML syntax
    /// - Configuration values fail type conversion
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_from(dir.as_ref().join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and the environment still
    /// apply.
    ///
    /// # Errors
    ///
    /// See [`IrisConfig::load_from_dir`].
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("IRIS_").split("__").lowercase(true))
            .extract::<Self>()?;

        config.validate()?;
        Ok(config)
    }

    /// Check values that would make every dispatch run fail
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let message = &self.message;
        if message.sender.trim().is_empty() {
            return Err(ConfigError::Invalid("message.sender must not be empty".into()));
        }
        if message.recipient_column.is_empty() {
            return Err(ConfigError::Invalid(
                "message.recipient_column must not be empty".into(),
            ));
        }
        if message.recipient_data_file.is_empty() {
            return Err(ConfigError::Invalid(
                "message.recipient_data_file must not be empty".into(),
            ));
        }
        if let Some(smtp) = &self.service.smtp {
            if smtp.host.is_empty() {
                return Err(ConfigError::Invalid("service.smtp.host must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Write the default configuration to `path`
    ///
    /// Refuses to overwrite an existing file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists or cannot be written.
    pub fn write_default(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(&Self::default())?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path.as_ref())?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}

//! Configuration file loaded by `serve` and `reminders`

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::crypto::generate_token;
use crate::auth::{JwtConfig, PasswordPolicy, SessionConfig};
use crate::http_server::HttpServerConfig;
use crate::observability::LogFormat;
use crate::teams::SmtpConfig;

use super::errors::{CliError, CliResult};

/// Environment variable that overrides `jwt_secret`
pub const JWT_SECRET_ENV: &str = "ROASTER_JWT_SECRET";

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 16;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    /// JSON snapshot file; `null` keeps everything in memory
    #[serde(default = "default_data_file")]
    pub data_file: Option<PathBuf>,

    /// HMAC secret for access tokens
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_access_token_ttl_minutes")]
    pub access_token_ttl_minutes: i64,

    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,

    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Email reminders are logged instead of sent when absent
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

fn default_data_file() -> Option<PathBuf> {
    Some(PathBuf::from("./roaster-data.json"))
}
fn default_access_token_ttl_minutes() -> i64 {
    15
}
fn default_refresh_token_ttl_days() -> i64 {
    30
}
fn default_password_min_length() -> usize {
    8
}

impl AppConfig {
    /// Defaults with the given signing secret
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            server: HttpServerConfig::default(),
            data_file: default_data_file(),
            jwt_secret: secret.into(),
            access_token_ttl_minutes: default_access_token_ttl_minutes(),
            refresh_token_ttl_days: default_refresh_token_ttl_days(),
            password_min_length: default_password_min_length(),
            log_format: LogFormat::default(),
            smtp: None,
        }
    }

    /// Defaults with a freshly generated secret
    pub fn generate() -> Self {
        Self::with_secret(generate_token())
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                config.jwt_secret = secret;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| CliError::io_error(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> CliResult<()> {
        self.server.validate().map_err(CliError::config_error)?;

        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(CliError::config_error(format!(
                "jwt_secret must be at least {} bytes (set it in the config or {})",
                MIN_SECRET_LEN, JWT_SECRET_ENV
            )));
        }

        if self.access_token_ttl_minutes <= 0 {
            return Err(CliError::config_error("access_token_ttl_minutes must be > 0"));
        }

        if self.refresh_token_ttl_days <= 0 {
            return Err(CliError::config_error("refresh_token_ttl_days must be > 0"));
        }

        if self.password_min_length == 0 {
            return Err(CliError::config_error("password_min_length must be > 0"));
        }

        Ok(())
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            access_token_ttl: Duration::minutes(self.access_token_ttl_minutes),
            ..Default::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            refresh_token_ttl: Duration::days(self.refresh_token_ttl_days),
        }
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::with_min_length(self.password_min_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SECRET: &str = "0123456789abcdef0123";

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(&format!(r#"{{"jwt_secret": "{}"}}"#, SECRET)).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.data_file, Some(PathBuf::from("./roaster-data.json")));
        assert_eq!(config.access_token_ttl_minutes, 15);
        assert_eq!(config.refresh_token_ttl_days, 30);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.smtp.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_null_data_file_means_in_memory() {
        let config: AppConfig =
            serde_json::from_str(&format!(r#"{{"jwt_secret": "{}", "data_file": null}}"#, SECRET))
                .unwrap();
        assert!(config.data_file.is_none());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::with_secret("short");
        assert!(config.validate().is_err());

        config.jwt_secret = SECRET.to_string();
        config.server.port = 0;
        assert!(config.validate().is_err());

        config.server.port = 8000;
        config.access_token_ttl_minutes = 0;
        assert!(config.validate().is_err());

        config.access_token_ttl_minutes = 15;
        config.refresh_token_ttl_days = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let json = format!(r#"{{"jwt_secret": "{}", "log_format": "xml"}}"#, SECRET);
        assert!(serde_json::from_str::<AppConfig>(&json).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roaster.json");

        let mut config = AppConfig::generate();
        config.server.port = 9100;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9100);
        assert!(loaded.jwt_secret.len() >= MIN_SECRET_LEN);
    }

    #[test]
    fn test_derived_settings() {
        let mut config = AppConfig::with_secret(SECRET);
        config.access_token_ttl_minutes = 5;
        config.password_min_length = 12;

        assert_eq!(config.jwt_config().access_token_ttl, Duration::minutes(5));
        assert_eq!(config.jwt_config().secret, SECRET);
        assert_eq!(config.session_config().refresh_token_ttl, Duration::days(30));
        assert_eq!(config.password_policy().min_length, 12);
    }
}

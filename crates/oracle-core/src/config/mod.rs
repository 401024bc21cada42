//! Configuration parsing.
//!
//! The optional `.oracle/config.toml` file under the project root sets the
//! default validity window, the expiring-soon window, the key label, the
//! name of the environment variable carrying the signing secret, and an
//! optional default signer. The secret itself never appears in
//! configuration.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::signing::{
    DEFAULT_VALIDITY_DAYS, DEFAULT_WARN_WINDOW_DAYS, ExpirationPolicy, FormatKind,
    MAX_VALIDITY_DAYS,
};

/// Path of the config file relative to the project root.
pub const DEFAULT_CONFIG_PATH: &str = ".oracle/config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// Signing parameters.
    #[serde(default)]
    pub signing: SigningSection,

    /// Default signer identity used by the CLI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerDefaults>,
}

/// The `[signing]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigningSection {
    /// Validity window of new signatures, in days.
    pub validity_days: u32,
    /// Width of the expiring-soon window, in days.
    pub warn_window_days: u32,
    /// Label recorded with each signature.
    pub key_identifier: String,
    /// Environment variable that carries the shared secret.
    pub secret_env: String,
    /// Signature shape produced by default.
    pub format: FormatKind,
}

impl Default for SigningSection {
    fn default() -> Self {
        Self {
            validity_days: DEFAULT_VALIDITY_DAYS,
            warn_window_days: DEFAULT_WARN_WINDOW_DAYS,
            key_identifier: "oracle-default".to_string(),
            secret_env: "ORACLE_SIGNING_SECRET".to_string(),
            format: FormatKind::SingleDocument,
        }
    }
}

impl SigningSection {
    /// Returns the validity window as a duration.
    #[must_use]
    pub fn validity(&self) -> Duration {
        Duration::days(i64::from(self.validity_days))
    }

    /// Returns the expiration policy for the configured warn window.
    #[must_use]
    pub fn expiration_policy(&self) -> ExpirationPolicy {
        ExpirationPolicy::with_warn_days(self.warn_window_days)
    }
}

/// The optional `[signer]` table. Any field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignerDefaults {
    /// Default signer email.
    pub email: Option<String>,
    /// Default signer role.
    pub role: Option<String>,
    /// Default signing reason.
    pub reason: Option<String>,
}

impl OracleConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read, parsed, or
    /// validated.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Returns the default config location under `project_root`.
    #[must_use]
    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root.join(DEFAULT_CONFIG_PATH)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid, contains unknown keys, or
    /// fails [`Self::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Checks semantic constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `validity_days` is zero or above
    /// [`MAX_VALIDITY_DAYS`], or if the key identifier or secret variable name
    /// is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing.validity_days == 0 {
            return Err(ConfigError::Validation(
                "signing.validity_days must be greater than zero".to_string(),
            ));
        }
        if self.signing.validity_days > MAX_VALIDITY_DAYS {
            return Err(ConfigError::Validation(format!(
                "signing.validity_days must not exceed {MAX_VALIDITY_DAYS}"
            )));
        }
        if self.signing.key_identifier.trim().is_empty() {
            return Err(ConfigError::Validation(
                "signing.key_identifier must not be empty".to_string(),
            ));
        }
        if self.signing.secret_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "signing.secret_env must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse configuration.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = OracleConfig::from_toml("").unwrap();
        assert_eq!(config, OracleConfig::default());
        assert_eq!(config.signing.validity_days, 90);
        assert_eq!(config.signing.warn_window_days, 7);
        assert_eq!(config.signing.key_identifier, "oracle-default");
        assert_eq!(config.signing.secret_env, "ORACLE_SIGNING_SECRET");
        assert_eq!(config.signing.format, FormatKind::SingleDocument);
        assert!(config.signer.is_none());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [signing]
            validity_days = 30
            warn_window_days = 3
            key_identifier = "team-key"
            secret_env = "TEAM_SECRET"
            format = "claim-bundle"

            [signer]
            email = "alice@example.com"
            role = "architect"
        "#;
        let config = OracleConfig::from_toml(toml).unwrap();
        assert_eq!(config.signing.validity(), Duration::days(30));
        assert_eq!(config.signing.expiration_policy().warn_window(), Duration::days(3));
        assert_eq!(config.signing.format, FormatKind::ClaimBundle);

        let signer = config.signer.unwrap();
        assert_eq!(signer.email.as_deref(), Some("alice@example.com"));
        assert_eq!(signer.role.as_deref(), Some("architect"));
        assert_eq!(signer.reason, None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = OracleConfig::from_toml("[signing]\nsecret = \"hunter2\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = OracleConfig::from_toml("[daemon]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_validity_rejected() {
        let err = OracleConfig::from_toml("[signing]\nvalidity_days = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("validity_days")),
            other => panic!("Expected ConfigError::Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_validity_rejected() {
        let err = OracleConfig::from_toml("[signing]\nvalidity_days = 4294967295\n").unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("validity_days")),
            other => panic!("Expected ConfigError::Validation, got {other:?}"),
        }

        let config = OracleConfig::from_toml("[signing]\nvalidity_days = 36500\n").unwrap();
        assert_eq!(config.signing.validity_days, MAX_VALIDITY_DAYS);
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = OracleConfig::from_toml("[signing]\nformat = \"jwt\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = OracleConfig::default_path(dir.path());
        let config = OracleConfig::load_or_default(&path).unwrap();
        assert_eq!(config, OracleConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = OracleConfig::default();
        config.signer = Some(SignerDefaults {
            email: Some("bob@example.com".into()),
            ..SignerDefaults::default()
        });
        let text = config.to_toml().unwrap();
        assert_eq!(OracleConfig::from_toml(&text).unwrap(), config);
    }
}

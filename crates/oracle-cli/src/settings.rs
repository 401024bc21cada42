//! Startup settings resolved once at the CLI boundary.
//!
//! This is the only place that reads environment variables or ambient git
//! configuration. Everything resolved here is passed down to
//! `oracle_core` as explicit values.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use oracle_core::{GitCliAnchor, OracleConfig, SignerInfo, SigningKey};
use secrecy::SecretString;

/// Environment variable overriding the default signer email.
pub const SIGNER_EMAIL_ENV: &str = "ORACLE_SIGNER_EMAIL";
/// Environment variable overriding the default signer role.
pub const SIGNER_ROLE_ENV: &str = "ORACLE_SIGNER_ROLE";
/// Environment variable overriding the default signing reason.
pub const SIGNER_REASON_ENV: &str = "ORACLE_SIGNER_REASON";

const DEFAULT_ROLE: &str = "approver";
const DEFAULT_REASON: &str = "Approved";

/// Signer fields supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct SignerFlags {
    pub email: Option<String>,
    pub role: Option<String>,
    pub reason: Option<String>,
}

/// Project root and configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub config: OracleConfig,
}

impl Settings {
    /// Canonicalizes the project root and loads configuration from
    /// `config_path` or the default location under the root.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let project_root = root
            .canonicalize()
            .with_context(|| format!("project root {} is not accessible", root.display()))?;
        let config = match config_path {
            Some(path) => OracleConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => OracleConfig::load_or_default(&OracleConfig::default_path(&project_root))
                .context("failed to load project config")?,
        };
        tracing::debug!(root = %project_root.display(), "settings loaded");
        Ok(Self {
            project_root,
            config,
        })
    }

    /// Builds the signing key from the configured environment variable.
    pub fn signing_key(&self) -> Result<SigningKey> {
        let var = &self.config.signing.secret_env;
        let Some(secret) = env::var(var).ok().filter(|value| !value.is_empty()) else {
            bail!("signing secret is not set: export {var}");
        };
        SigningKey::new(
            self.config.signing.key_identifier.clone(),
            SecretString::from(secret),
        )
        .with_context(|| format!("invalid signing secret in {var}"))
    }

    /// Resolves the signer: flags, then environment, then `[signer]`
    /// config, then (email only) the repository's `user.email`.
    pub fn resolve_signer(&self, flags: &SignerFlags) -> Result<SignerInfo> {
        let defaults = self.config.signer.clone().unwrap_or_default();

        let email = match pick(flags.email.as_ref(), SIGNER_EMAIL_ENV, defaults.email) {
            Some(email) => email,
            None => GitCliAnchor::new(&self.project_root)
                .config_value("user.email")
                .ok()
                .flatten()
                .context(
                    "no signer email: pass --email, set ORACLE_SIGNER_EMAIL, \
                     or configure [signer] email",
                )?,
        };
        let role = pick(flags.role.as_ref(), SIGNER_ROLE_ENV, defaults.role)
            .unwrap_or_else(|| DEFAULT_ROLE.to_string());
        let reason = pick(flags.reason.as_ref(), SIGNER_REASON_ENV, defaults.reason)
            .unwrap_or_else(|| DEFAULT_REASON.to_string());

        Ok(SignerInfo::new(email, role, reason))
    }

    /// Makes `path` absolute against the working directory, resolving
    /// symlinks when the file exists.
    pub fn absolutize(path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        absolute.canonicalize().unwrap_or(absolute)
    }
}

fn pick(flag: Option<&String>, env_var: &str, configured: Option<String>) -> Option<String> {
    flag.cloned()
        .or_else(|| env::var(env_var).ok())
        .or(configured)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

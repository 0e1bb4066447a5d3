//! Configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/cloudsave/cloudsave.toml`
//! - Windows: `%APPDATA%/cloudsave/cloudsave.toml`

use std::path::{Path, PathBuf};

use anyhow::Context;
use cloudsave_drive::{Credentials, ServiceAccountKey};
use serde::{Deserialize, Serialize};

/// Environment variable holding an access token; overrides both credential files.
pub const TOKEN_ENV_VAR: &str = "CLOUDSAVE_ACCESS_TOKEN";

/// Longest autosave interval offered (one day).
pub const MAX_AUTOSAVE_MINUTES: u64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// File holding the root cloud folder id.
    #[serde(default = "default_root_file")]
    pub root_file: PathBuf,

    /// Service-account key file, used when present.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// File holding a Drive OAuth access token.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Choices offered by the autosave prompt.
    #[serde(default = "default_intervals")]
    pub autosave_intervals_minutes: Vec<u64>,

    /// Where archives are staged before upload (system temp dir if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

fn default_root_file() -> PathBuf {
    PathBuf::from("cloudsave.init")
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("authentication.json")
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.txt")
}

fn default_api_url() -> String {
    cloudsave_drive::client::DEFAULT_API_URL.into()
}

fn default_upload_url() -> String {
    cloudsave_drive::client::DEFAULT_UPLOAD_URL.into()
}

fn default_intervals() -> Vec<u64> {
    vec![5, 10, 15]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_file: default_root_file(),
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
            api_url: default_api_url(),
            upload_url: default_upload_url(),
            autosave_intervals_minutes: default_intervals(),
            staging_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("invalid configuration {}", path.display()))?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Reads the root cloud folder id.
    pub fn root_folder_id(&self) -> anyhow::Result<String> {
        read_trimmed(&self.root_file).context("root folder id not configured")
    }

    /// Picks credentials: [`TOKEN_ENV_VAR`], then the service-account key
    /// file, then the token file.
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        self.credentials_from(std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn credentials_from(&self, env_token: Option<String>) -> anyhow::Result<Credentials> {
        if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
            tracing::debug!(var = TOKEN_ENV_VAR, "using access token from environment");
            return Ok(Credentials::AccessToken(token.trim().to_string()));
        }

        if self.credentials_file.exists() {
            let key = ServiceAccountKey::from_file(&self.credentials_file).with_context(|| {
                format!("invalid service account key {}", self.credentials_file.display())
            })?;
            tracing::debug!(client_email = %key.client_email, "using service account");
            return Ok(Credentials::ServiceAccount(key));
        }

        let token = read_trimmed(&self.token_file).with_context(|| {
            format!(
                "no credentials: set {TOKEN_ENV_VAR}, or provide {} or {}",
                self.credentials_file.display(),
                self.token_file.display()
            )
        })?;
        Ok(Credentials::AccessToken(token))
    }

    /// Autosave choices. Zero, duplicate and out-of-range entries are removed.
    pub fn autosave_intervals(&self) -> Vec<u64> {
        let mut minutes: Vec<u64> = self
            .autosave_intervals_minutes
            .iter()
            .copied()
            .filter(|m| (1..=MAX_AUTOSAVE_MINUTES).contains(m))
            .collect();
        if minutes.len() < self.autosave_intervals_minutes.len() {
            tracing::warn!(
                max = MAX_AUTOSAVE_MINUTES,
                "ignoring autosave intervals outside 1..=max minutes"
            );
        }
        minutes.sort_unstable();
        minutes.dedup();
        if minutes.is_empty() {
            default_intervals()
        } else {
            minutes
        }
    }

    pub fn staging_base(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Reads a one-line value file, failing if it is missing or blank.
fn read_trimmed(path: &Path) -> anyhow::Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = content.trim();
    anyhow::ensure!(!value.is_empty(), "{} is empty", path.display());
    Ok(value.to_string())
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata).join("cloudsave").join("cloudsave.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cloudsave")
            .join("cloudsave.toml"))
    }
}

//! CLI configuration.
//!
//! Stored as JSON at `~/.config/sitepush/config.json` (or
//! `%APPDATA%\sitepush\config.json` on Windows). Holds the access token and
//! the current folder/site selection.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sitepush_api::{DEFAULT_BASE_URL, SiteDescriptor};
use sitepush_deploy::{CredentialProvider, Locale, PollPolicy, SelectionStore};
use sitepush_manifest::ManifestBuilder;

pub const TOKEN_ENV: &str = "SITEPUSH_TOKEN";
pub const API_URL_ENV: &str = "SITEPUSH_API_URL";

/// Persistent CLI settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    /// Directory names skipped when scanning, on top of the built-in ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_dirs: Vec<String>,
    /// File names skipped when scanning, on top of the built-in ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_files: Vec<String>,
}

impl AppConfig {
    /// Loads the config file; a missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Self>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Keep the unreadable file so the next save does not destroy it.
                let backup = backup_path(path);
                if let Err(rename_err) = std::fs::rename(path, &backup) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %rename_err,
                        "failed to back up unreadable config"
                    );
                }
                tracing::warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Writes the config file, creating its directory.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        set_permissions_0600(path);

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// API endpoint: environment, then config, then the public default.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        PollPolicy::new(
            self.poll_max_attempts.unwrap_or(defaults.max_attempts),
            self.poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
        )
    }

    /// Scanner with the built-in ignore rules plus the configured ones.
    pub fn manifest_builder(&self) -> ManifestBuilder {
        let builder = self
            .ignore_dirs
            .iter()
            .fold(ManifestBuilder::default(), |b, name| b.ignore_dir(name.as_str()));
        self.ignore_files
            .iter()
            .fold(builder, |b, name| b.ignore_file(name.as_str()))
    }

    /// Display language: explicit flag, then config, then the environment.
    pub fn locale(&self, flag: Option<&str>) -> Locale {
        let env_tag = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .find_map(|k| std::env::var(k).ok().filter(|v| !v.is_empty()));
        resolve_locale(flag, self.locale.as_deref(), env_tag.as_deref())
    }
}

impl CredentialProvider for AppConfig {
    fn token(&self) -> Option<String> {
        resolve_token(std::env::var(TOKEN_ENV).ok(), &self.access_token)
    }
}

impl SelectionStore for AppConfig {
    fn folder(&self) -> Option<PathBuf> {
        self.folder.clone()
    }

    fn site(&self) -> Option<SiteDescriptor> {
        self.site.clone()
    }
}

/// Config selection with one-shot command-line overrides on top.
pub struct Selection<'a> {
    pub config: &'a AppConfig,
    pub folder: Option<PathBuf>,
    pub site_id: Option<String>,
}

impl SelectionStore for Selection<'_> {
    fn folder(&self) -> Option<PathBuf> {
        self.folder.clone().or_else(|| self.config.folder())
    }

    fn site(&self) -> Option<SiteDescriptor> {
        match &self.site_id {
            Some(id) => match self.config.site() {
                Some(site) if &site.id == id => Some(site),
                _ => Some(SiteDescriptor {
                    id: id.clone(),
                    ..Default::default()
                }),
            },
            None => self.config.site(),
        }
    }
}

fn resolve_token(env: Option<String>, stored: &str) -> Option<String> {
    env.filter(|t| !t.trim().is_empty())
        .or_else(|| Some(stored.to_string()).filter(|t| !t.trim().is_empty()))
}

fn resolve_locale(flag: Option<&str>, configured: Option<&str>, env: Option<&str>) -> Locale {
    flag.or(configured)
        .or(env)
        .map(Locale::detect)
        .unwrap_or_default()
}

/// `config.json` -> `config.json.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Default location of the config file.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("sitepush").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA")
            .map_err(|_| anyhow::anyhow!("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(xdg));
        }
        let home = std::env::var_os("HOME").ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}

//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use stream_relay::HttpSettings;

/// TOML-backed file configuration for transfer defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Connect timeout for both legs, in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Idle timeout between reads on both legs, in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Redirects followed on the download leg (0 disables).
    pub max_redirects: Option<usize>,
    /// User-Agent override.
    pub user_agent: Option<String>,
    /// Default for `throw_on_error` when the CLI does not set it.
    pub throw_on_error: Option<bool>,
    /// Default for `batch --continue-on-fail`.
    pub continue_on_fail: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        if let Some(max_redirects) = self.max_redirects
            && max_redirects > 20
        {
            bail!("Invalid config value for `max_redirects`: {max_redirects}. Expected range: 0..=20");
        }

        if let Some(user_agent) = &self.user_agent
            && user_agent.trim().is_empty()
        {
            bail!("Invalid config value for `user_agent`: must not be empty");
        }

        Ok(())
    }

    /// Applies file values over default client settings.
    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        let mut settings = HttpSettings::default();
        if let Some(secs) = self.connect_timeout_secs {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            settings.read_timeout = Duration::from_secs(secs);
        }
        if let Some(max_redirects) = self.max_redirects {
            settings.max_redirects = max_redirects;
        }
        if let Some(user_agent) = &self.user_agent {
            settings.user_agent.clone_from(user_agent);
        }
        settings
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if one is known.
    pub path: Option<PathBuf>,
    /// Parsed config; defaults when no file was read.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/stream-relay/config.toml`
/// 2. `$HOME/.config/stream-relay/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("stream-relay")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("stream-relay")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from an explicit path, or from the default path if present.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        }),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}

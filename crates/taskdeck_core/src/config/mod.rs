use crate::client::parse_base_url;
use crate::cookie::DEFAULT_TTL_DAYS;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKDECK_CONFIG_PATH";
const API_URL_ENV_VAR: &str = "TASKDECK_API_URL";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub cookie_ttl_days: Option<u32>,
    #[serde(default)]
    pub desktop_notifications: bool,
}

impl Config {
    pub fn cookie_ttl_days(&self) -> u32 {
        self.cookie_ttl_days.unwrap_or(DEFAULT_TTL_DAYS)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub cookie_ttl_days: Option<u32>,
    pub desktop_notifications: Option<bool>,
}

/// `TASKDECK_CONFIG_PATH`, else `taskdeck/config.json` under the user's
/// config directory.
pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    Ok(app_config_dir()?.join(CONFIG_FILE_NAME))
}

pub(crate) fn app_config_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskdeck"))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskdeck"))
    }
}

pub fn load_config() -> Result<Config, AppError> {
    let path = config_path()?;
    load_config_from_path(&path)
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    config.api_url = config
        .api_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    config.cookie_ttl_days = config.cookie_ttl_days.filter(|days| *days > 0);
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(api_url) = overrides.api_url.as_ref() {
        merged.api_url = Some(api_url.clone());
    }
    if let Some(days) = overrides.cookie_ttl_days {
        merged.cookie_ttl_days = Some(days);
    }
    if let Some(enabled) = overrides.desktop_notifications {
        merged.desktop_notifications = enabled;
    }
    normalize_config(merged)
}

/// Backend base URL: `TASKDECK_API_URL` at runtime, then the config file,
/// then the value baked in at build time.
pub fn resolve_api_url(config: &Config) -> Result<Url, AppError> {
    let runtime = std::env::var(API_URL_ENV_VAR).ok();
    let built = option_env!("TASKDECK_API_URL");
    select_api_url(runtime.as_deref(), config.api_url.as_deref(), built)
}

fn select_api_url(
    runtime: Option<&str>,
    configured: Option<&str>,
    built: Option<&str>,
) -> Result<Url, AppError> {
    let chosen = [runtime, configured, built]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            AppError::invalid_data(
                "no backend configured; set TASKDECK_API_URL or api_url in the config file",
            )
        })?;
    parse_base_url(chosen)
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides, select_api_url,
    };
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskdeck-{nanos}-{file_name}"))
    }

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let path = temp_path("missing-config.json");
        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let path = temp_path("invalid-config.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);
        fs::remove_file(&path).ok();

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.unwrap().code(), "invalid_data");
    }

    #[test]
    fn load_config_reads_valid_file() {
        let path = temp_path("valid-config.json");
        let content = serde_json::json!({
            "api_url": " http://localhost:4000 ",
            "cookie_ttl_days": 7,
            "desktop_notifications": true
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.api_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(loaded.cookie_ttl_days(), 7);
        assert!(loaded.desktop_notifications);
    }

    #[test]
    fn zero_ttl_falls_back_to_default() {
        let path = temp_path("zero-ttl.json");
        fs::write(&path, r#"{"cookie_ttl_days": 0}"#).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.cookie_ttl_days(), 1);
    }

    #[test]
    fn merge_overrides_replaces_only_supplied_fields() {
        let base = Config {
            api_url: Some("http://localhost:4000".into()),
            cookie_ttl_days: Some(3),
            desktop_notifications: false,
        };
        let overrides = ConfigOverrides {
            desktop_notifications: Some(true),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.api_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(merged.cookie_ttl_days, Some(3));
        assert!(merged.desktop_notifications);
        assert!(!base.desktop_notifications);
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            api_url: Some("http://localhost:4000".into()),
            cookie_ttl_days: None,
            desktop_notifications: true,
        };

        assert_eq!(merge_overrides(&base, &ConfigOverrides::default()), base);
    }

    #[test]
    fn api_url_precedence() {
        let url = select_api_url(
            Some("http://runtime:1"),
            Some("http://config:2"),
            Some("http://built:3"),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://runtime:1/");

        let url = select_api_url(Some("  "), Some("http://config:2"), Some("http://built:3")).unwrap();
        assert_eq!(url.as_str(), "http://config:2/");

        let url = select_api_url(None, None, Some("http://built:3")).unwrap();
        assert_eq!(url.as_str(), "http://built:3/");
    }

    #[test]
    fn api_url_missing_or_invalid_is_reported() {
        assert_eq!(
            select_api_url(None, None, None).unwrap_err().code(),
            "invalid_data"
        );
        assert_eq!(
            select_api_url(None, Some("::nope"), None).unwrap_err().code(),
            "invalid_data"
        );
    }
}

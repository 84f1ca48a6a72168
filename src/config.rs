use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "CNC_CATALOG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogConfig {
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("js").join("db.js")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
    /// Rows left below the viewport at which the next batch is requested.
    #[serde(default = "default_trigger_margin")]
    pub trigger_margin: usize,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            trigger_margin: default_trigger_margin(),
        }
    }
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(120)
}

fn default_trigger_margin() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    #[serde(default = "default_media_enabled")]
    pub enabled: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: default_media_enabled(),
            workers: default_workers(),
        }
    }
}

fn default_media_enabled() -> bool {
    true
}

fn default_workers() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.catalog.data_file.as_os_str().is_empty() {
        base.catalog.data_file = other.catalog.data_file;
    }

    if !other.ui.tick_rate.is_zero() {
        base.ui.tick_rate = other.ui.tick_rate;
    }
    base.ui.trigger_margin = other.ui.trigger_margin;

    base.media.enabled = other.media.enabled;
    if other.media.workers != 0 {
        base.media.workers = other.media.workers;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base
}

/// Environment overrides go straight onto the merged config so that only the
/// variables actually set take effect.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "catalog.data_file" => cfg.catalog.data_file = PathBuf::from(value),
        "ui.tick_rate" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.tick_rate = duration;
            }
        }
        "ui.trigger_margin" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.ui.trigger_margin = parsed;
            }
        }
        "media.enabled" => {
            cfg.media.enabled = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        "media.workers" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.media.workers = parsed;
            }
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        _ => tracing::debug!(key, "ignoring unknown config override"),
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cnc-catalog").join("config.yaml"))
}

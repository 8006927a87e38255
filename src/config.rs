//! Application paths and persisted navigator settings.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::overlay::OverlayMode;
use crate::core::pager::DEFAULT_LOAD_MORE_THRESHOLD;
use crate::source::archive::{DEFAULT_INTERVAL_MINUTES, DEFAULT_PAGE_SIZE};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "capview.json";
/// Default log file name inside the data directory
pub const LOG_FILE: &str = "capview.log";
/// Environment override for the config directory
pub const CONFIG_DIR_ENV: &str = "CAPVIEW_CONFIG_DIR";

const APP_DIR: &str = "capview";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (CAPVIEW_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. CAPVIEW_CONFIG_DIR environment variable
/// 3. Local folder IF any capview files exist (capview.json, capview.log)
/// 4. Platform-specific config directory from dirs-next
///
/// Platform paths:
/// - Linux: ~/.config/capview/{name}
/// - macOS: ~/Library/Application Support/capview/{name}
/// - Windows: %APPDATA%\capview\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir).join(name)
}

/// Get path to a data file (logs). Same priority as [`config_file`], with
/// the platform data directory as the last step.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = resolve_dir(config, dirs_next::config_dir);
    let data_dir = resolve_dir(config, dirs_next::data_dir);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }
    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform: fn() -> Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_config_files(&current_dir) {
            return current_dir;
        }
    }
    if let Some(dir) = platform() {
        return dir.join(APP_DIR);
    }
    PathBuf::from(".")
}

/// Persisted navigator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorSettings {
    // Navigation
    pub snap_to_detections: bool,

    // Overlay
    pub overlay_mode: OverlayMode,

    // Capture list
    pub page_size: usize,
    pub load_more_threshold: f32,
    pub show_capture_list: bool,

    // Fetching
    pub details_cache_size: usize,
    pub workers_override: u32, // 0 = auto

    // Activity plot
    pub timeline_interval_minutes: i64, // bucket width when the archive has no timeline
    pub plot_height: f32,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            snap_to_detections: false,
            overlay_mode: OverlayMode::All,
            page_size: DEFAULT_PAGE_SIZE,
            load_more_threshold: DEFAULT_LOAD_MORE_THRESHOLD,
            show_capture_list: true,
            details_cache_size: 64,
            workers_override: 0,
            timeline_interval_minutes: DEFAULT_INTERVAL_MINUTES,
            plot_height: 80.0,
        }
    }
}

impl NavigatorSettings {
    /// Load from `path`. Missing file → defaults; malformed file → warning
    /// and defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(s)) => {
                debug!("Settings loaded from {}", path.display());
                s
            }
            Ok(None) => {
                debug!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .with_context(|| format!("Malformed settings in {}", path.display()))?;
        Ok(Some(settings))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Worker count: override when set, else pool default
    pub fn worker_count(&self) -> Option<usize> {
        (self.workers_override > 0).then_some(self.workers_override as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file(LOG_FILE, &config), PathBuf::from("/custom/capview.log"));
    }

    #[test]
    fn test_cli_dir_wins() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from-cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from-cli")));
    }

    #[test]
    fn test_ensure_dirs_creates() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/cfg");
        let config = PathConfig {
            config_dir: Some(dir.clone()),
        };
        ensure_dirs(&config).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_settings_missing_and_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        assert_eq!(NavigatorSettings::load(&path), NavigatorSettings::default());

        let settings = NavigatorSettings {
            snap_to_detections: true,
            overlay_mode: OverlayMode::ActiveOnly,
            workers_override: 3,
            ..NavigatorSettings::default()
        };
        settings.save(&path).unwrap();
        let loaded = NavigatorSettings::load(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.worker_count(), Some(3));
    }

    #[test]
    fn test_settings_partial_and_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);

        std::fs::write(&path, r#"{"page_size": 10}"#).unwrap();
        let s = NavigatorSettings::load(&path);
        assert_eq!(s.page_size, 10);
        assert!(s.show_capture_list);
        assert_eq!(s.worker_count(), None);

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(NavigatorSettings::load(&path), NavigatorSettings::default());
    }
}

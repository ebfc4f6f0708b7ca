//! Global nocal configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::error::{NocalError, NocalResult};
use crate::occurrence::Window;
use crate::store::FileStore;

static DEFAULT_DATA_DIR: &str = "~/.nocal";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

/// Configuration at ~/.config/nocal/config.toml, overridable with
/// `NOCAL_*` environment variables (e.g. `NOCAL_DATA_DIR`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NocalConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default listing window, in days on each side of now.
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for NocalConfig {
    fn default() -> Self {
        NocalConfig {
            data_dir: default_data_dir(),
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl NocalConfig {
    pub fn config_path() -> NocalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| NocalError::Config("Could not determine config directory".into()))?
            .join("nocal");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config, writing a commented default file on first run.
    pub fn load() -> NocalResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> NocalResult<Self> {
        let config: NocalConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("NOCAL").try_parsing(true))
            .build()
            .map_err(|e| NocalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| NocalError::Config(e.to_string()))?;

        if !(0..=MAX_WINDOW_DAYS).contains(&config.window_days) {
            return Err(NocalError::Config(format!(
                "window_days must be between 0 and {MAX_WINDOW_DAYS} (got {})",
                config.window_days
            )));
        }
        Ok(config)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> NocalResult<()> {
        let contents = format!(
            "\
# nocal configuration

# Where events, member index and invites are stored:
# data_dir = \"{DEFAULT_DATA_DIR}\"

# Days on each side of now shown by `nocal events`:
# window_days = {DEFAULT_WINDOW_DAYS}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NocalError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| NocalError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// The effective configuration, rendered as TOML.
    pub fn to_toml(&self) -> NocalResult<String> {
        toml::to_string_pretty(self).map_err(|e| NocalError::Config(e.to_string()))
    }

    /// `data_dir` with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn default_window(&self) -> NocalResult<Window> {
        Window::around_now(self.window_days)
    }

    /// Open the file store under `data_path`, creating it if needed.
    pub fn open_store(&self) -> NocalResult<FileStore> {
        FileStore::open(self.data_path()).map_err(|e| {
            NocalError::Config(format!("Could not open data directory: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_default_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nocal").join("config.toml");
        NocalConfig::create_default_config(&path).unwrap();

        let config = NocalConfig::load_from(&path).unwrap();
        assert_eq!(config.window_days, DEFAULT_WINDOW_DAYS);
    }

    #[test]
    fn test_values_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/srv/nocal\"\nwindow_days = 3\n").unwrap();

        let config = NocalConfig::load_from(&path).unwrap();
        assert_eq!(config.data_path(), PathBuf::from("/srv/nocal"));
        assert_eq!(config.window_days, 3);

        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("window_days = 3"));
    }

    #[test]
    fn test_out_of_range_window_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        for days in ["-1", "36501", "200000000000000"] {
            std::fs::write(&path, format!("window_days = {days}\n")).unwrap();
            assert!(matches!(
                NocalConfig::load_from(&path),
                Err(NocalError::Config(_))
            ));
        }
    }
}

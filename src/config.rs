//! Interpreter configuration
//!
//! Settings are read from a TOML file. Every field has a default, so an empty
//! file (or no file at all) yields a usable configuration.

use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "zcore.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of in-memory undo snapshots kept
    pub undo_slots: usize,
    /// Seed for a reproducible random number generator
    pub random_seed: Option<u64>,
    /// Directory where save files are written
    pub save_dir: PathBuf,
    pub screen_width: u8,
    pub screen_height: u8,
    /// Interpreter number reported in the header (6 = IBM PC)
    pub interpreter_number: u8,
    pub interpreter_version: char,
    /// Stop after this many instructions without input
    pub instruction_limit: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            undo_slots: 5,
            random_seed: None,
            save_dir: PathBuf::from("."),
            screen_width: 80,
            screen_height: 24,
            interpreter_number: 6,
            interpreter_version: 'A',
            instruction_limit: None,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        let config: Config =
            toml::from_str(text).map_err(|e| format!("Invalid configuration: {e}"))?;
        if config.undo_slots == 0 {
            debug!("Undo disabled by configuration");
        }
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Load an explicit config file, else `zcore.toml` if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            undo_slots = 8
            random_seed = 1234
            save_dir = "/tmp/saves"
            interpreter_version = "B"
            "#,
        )
        .unwrap();
        assert_eq!(config.undo_slots, 8);
        assert_eq!(config.random_seed, Some(1234));
        assert_eq!(config.save_dir, PathBuf::from("/tmp/saves"));
        assert_eq!(config.interpreter_version, 'B');
        assert_eq!(config.screen_width, 80);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_toml_str("colour_mode = true").is_err());
    }
}

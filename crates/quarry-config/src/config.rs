//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted config inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Default config directory: `<platform config dir>/quarry`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quarry"))
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub log: LogConfig,
    /// Dimension table and starting dimension.
    pub world: WorldConfig,
    /// Capture replay settings.
    pub replay: ReplayConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "quarry_world=debug").
    pub level: String,
    /// Directory for the JSON log file. No file is written when unset.
    pub log_dir: Option<PathBuf>,
    /// Write a JSON log file into `log_dir`.
    pub json_file: bool,
}

/// One known dimension type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionEntry {
    /// Registry name, e.g. `minecraft:overworld`.
    pub name: String,
    /// Lowest block Y.
    pub min_y: i32,
    /// Height in blocks.
    pub height: u32,
}

impl DimensionEntry {
    fn new(name: &str, min_y: i32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            min_y,
            height,
        }
    }
}

/// World configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Dimension active before the first spawn packet.
    pub initial_dimension: String,
    /// Dimension types the client knows about.
    pub dimensions: Vec<DimensionEntry>,
}

/// Replay tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Largest accepted frame in bytes.
    pub max_frame_size: usize,
    /// Abort on the first packet that fails to apply.
    pub stop_on_error: bool,
    /// Events buffered between the world and the event consumer.
    pub event_queue_capacity: usize,
}

// --- Default implementations ---

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            json_file: false,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_dimension: "minecraft:overworld".to_string(),
            dimensions: vec![
                DimensionEntry::new("minecraft:overworld", -64, 384),
                DimensionEntry::new("minecraft:the_nether", 0, 256),
                DimensionEntry::new("minecraft:the_end", 0, 256),
            ],
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 2 * 1024 * 1024,
            stop_on_error: false,
            event_queue_capacity: 1024,
        }
    }
}

// --- Validation ---

impl Config {
    /// Checks values the rest of the program relies on.
    ///
    /// Dimension floors and heights must be multiples of 16, the height
    /// non-zero, and names unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, dim) in self.world.dimensions.iter().enumerate() {
            if dim.min_y % 16 != 0 || dim.height % 16 != 0 || dim.height == 0 {
                return Err(ConfigError::Invalid(format!(
                    "dimension {} must have min_y and a non-zero height divisible by 16 (got {} / {})",
                    dim.name, dim.min_y, dim.height
                )));
            }
            if self.world.dimensions[..i].iter().any(|d| d.name == dim.name) {
                return Err(ConfigError::Invalid(format!(
                    "dimension {} listed twice",
                    dim.name
                )));
            }
        }
        if self.replay.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "replay.event_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(ron_str.contains("level: \"info\""));
        assert!(ron_str.contains("minecraft:the_nether"));
        assert!(ron_str.contains("event_queue_capacity: 1024"));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(log: (level: \"debug\"))").unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.world, WorldConfig::default());
        assert_eq!(config.replay, ReplayConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_custom_dimension_table() {
        let ron_str = r#"(
            world: (
                initial_dimension: "custom:deep",
                dimensions: [(name: "custom:deep", min_y: -128, height: 512)],
            ),
        )"#;
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.world.dimensions.len(), 1);
        assert_eq!(config.world.dimensions[0].min_y, -128);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_unaligned_height() {
        let mut config = Config::default();
        config.world.dimensions[1].height = 250;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("minecraft:the_nether")));
    }

    #[test]
    fn test_validate_rejects_duplicate_dimension() {
        let mut config = Config::default();
        let first = config.world.dimensions[0].clone();
        config.world.dimensions.push(first);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.log.level = "quarry_world=trace".to_string();
        config.log.log_dir = Some(PathBuf::from("/tmp/quarry-logs"));
        config.replay.stop_on_error = true;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.replay.max_frame_size = 4096;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.replay.max_frame_size), Some(4096));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}

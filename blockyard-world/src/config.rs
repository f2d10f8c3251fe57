//! World configuration, read once at startup.
//!
//! ```toml
//! [world]
//! path = "world"
//! seed = 42
//! serializer = "beta"
//! generators = ["simplex", "erosion", "watertable", "safety"]
//! dig_hooks = ["bedrock", "give", "replace"]
//! build_hooks = ["ladder", "tile", "build"]
//! cache_level = 25
//! spawn = [0, 0]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    pub path: PathBuf,
    /// Only used when the world is created; random when unset.
    pub seed: Option<u64>,
    pub serializer: String,
    pub generators: Vec<String>,
    pub dig_hooks: Vec<String>,
    /// `build` vetoes anything unplaceable, so it goes last.
    pub build_hooks: Vec<String>,
    /// Number of chunks around spawn that are never evicted.
    pub cache_level: usize,
    /// Spawn chunk, `[x, z]`.
    pub spawn: Option<(i32, i32)>,
    pub tick_interval_ms: u64,
    /// Most dirty chunks saved per tick.
    pub flush_batch: usize,
    /// A dirty chunk is flushed once it has not changed for this long.
    pub flush_idle_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("world"),
            seed: None,
            serializer: "beta".to_string(),
            generators: strings(&[
                "simplex",
                "erosion",
                "watertable",
                "beaches",
                "grass",
                "snow",
                "ores",
                "safety",
            ]),
            dig_hooks: strings(&["bedrock", "give", "snow", "torch", "replace"]),
            build_hooks: strings(&["ladder", "tile", "build"]),
            cache_level: 25,
            spawn: None,
            tick_interval_ms: 1000,
            flush_batch: 16,
            flush_idle_ms: 5000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    world: WorldConfig,
}

impl WorldConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        file.world.validate()?;
        Ok(file.world)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generators.is_empty() {
            return Err(ConfigError::Invalid("at least one generator stage is required".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.flush_batch == 0 {
            return Err(ConfigError::Invalid("flush_batch must be positive".into()));
        }
        Ok(())
    }
}

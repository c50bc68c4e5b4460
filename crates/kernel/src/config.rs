use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Map name that disables the initial load.
pub const NO_MAP: &str = "none";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: u32,
    pub msaa: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fullscreen: false,
            vsync: 0,
            msaa: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub bloom: bool,
    pub dynamic_lights: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bloom: false,
            dynamic_lights: true,
        }
    }
}

/// Engine settings. Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub display: DisplayConfig,
    pub render: RenderConfig,
    /// Directory relative map names resolve under.
    pub map_dir: PathBuf,
    /// Level loaded when the engine is built. `"none"` or absent skips it.
    pub initial_map: Option<String>,
    /// Simulation steps per second.
    pub tick_rate: f64,
    /// Initial object pool capacity.
    pub object_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            render: RenderConfig::default(),
            map_dir: PathBuf::from("res/maps"),
            initial_map: None,
            tick_rate: 120.0,
            object_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&src)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.step()?;
        if self.object_capacity == 0 {
            return Err(ConfigError::Invalid(
                "object_capacity must be at least 1".into(),
            ));
        }
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "display size must be non-zero, got {}x{}",
                self.display.width, self.display.height
            )));
        }
        Ok(())
    }

    /// The initial map, unless disabled.
    pub fn initial_map(&self) -> Option<&str> {
        self.initial_map
            .as_deref()
            .filter(|name| !name.is_empty() && *name != NO_MAP)
    }

    /// Resolve a map name against `map_dir`. Absolute paths are used as given.
    pub fn map_path(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.map_dir.join(path)
        }
    }

    /// Length of one simulation step. Fails unless `tick_rate` gives a non-zero period a
    /// [`Duration`] can hold.
    pub fn step(&self) -> Result<Duration, ConfigError> {
        let step = (self.tick_rate.is_finite() && self.tick_rate > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / self.tick_rate).ok())
            .flatten()
            .filter(|step| !step.is_zero());
        step.ok_or_else(|| {
            ConfigError::Invalid(format!(
                "tick_rate must be positive with a representable step, got {}",
                self.tick_rate
            ))
        })
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::{lae_log_debug, Error, Result};

pub const DEFAULT_FATIGUE_MIN: f64 = 0.5;
pub const DEFAULT_FATIGUE_MAX: f64 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Lower bound (inclusive) of the per-worker fatigue factor.
    pub fatigue_min: f64,
    /// Upper bound (exclusive) of the per-worker fatigue factor.
    pub fatigue_max: f64,
    /// Fixed RNG seed for reproducible fatigue factors.
    pub seed: Option<u64>,
    pub pretty_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fatigue_min: DEFAULT_FATIGUE_MIN,
            fatigue_max: DEFAULT_FATIGUE_MAX,
            seed: None,
            pretty_output: true,
        }
    }
}

impl Config {
    pub fn lae_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".lae"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::lae_dir()?.join("lae.toml"))
    }

    /// Load ~/.lae/lae.toml, falling back to defaults when it is absent.
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(path) => path,
            Err(Error::NoHomeDir) => {
                lae_log_debug!("No home directory, using default config");
                return Ok(Self::default());
            }
            Err(e) => return Err(e),
        };
        if !path.exists() {
            lae_log_debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate a config file at an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        lae_log_debug!("Config::load_from path={}", path.display());
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        lae_log_debug!(
            "Config loaded: fatigue=[{}, {}), seed={:?}, pretty_output={}",
            config.fatigue_min,
            config.fatigue_max,
            config.seed,
            config.pretty_output
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fatigue_min > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "fatigue_min must be positive, got {}",
                self.fatigue_min
            )));
        }
        if !(self.fatigue_min < self.fatigue_max) || !self.fatigue_max.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "fatigue range [{}, {}) is empty",
                self.fatigue_min, self.fatigue_max
            )));
        }
        Ok(())
    }

    pub fn fatigue_range(&self) -> Range<f64> {
        self.fatigue_min..self.fatigue_max
    }
}

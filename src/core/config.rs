use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};

/// How far the engine is allowed to push memory usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggressivenessLevel {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl AggressivenessLevel {
    pub fn memory_multiplier(self) -> f64 {
        match self {
            AggressivenessLevel::Conservative => 0.7,
            AggressivenessLevel::Balanced => 1.0,
            AggressivenessLevel::Aggressive => 1.3,
        }
    }
}

impl fmt::Display for AggressivenessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggressivenessLevel::Conservative => "conservative",
            AggressivenessLevel::Balanced => "balanced",
            AggressivenessLevel::Aggressive => "aggressive",
        };
        f.write_str(name)
    }
}

impl FromStr for AggressivenessLevel {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(AggressivenessLevel::Conservative),
            "balanced" => Ok(AggressivenessLevel::Balanced),
            "aggressive" => Ok(AggressivenessLevel::Aggressive),
            other => Err(GuardError::config(format!(
                "Unknown aggressiveness level '{}' (expected conservative, balanced or aggressive)",
                other
            ))),
        }
    }
}

/// Engine configuration, persisted as a flat key-value record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub enable_dynamic_allocation: bool,
    pub enable_battery_awareness: bool,
    pub enable_gpu_offload: bool,
    pub enable_neural_engine_optimization: bool,
    pub reserve_system_memory_gb: f64,
    pub max_model_memory_percent: f64,
    pub min_model_memory_percent: f64,
    pub kv_cache_memory_percent: f64,
    pub aggressiveness_level: AggressivenessLevel,
    pub update_interval_seconds: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            enable_dynamic_allocation: true,
            enable_battery_awareness: true,
            enable_gpu_offload: true,
            enable_neural_engine_optimization: true,
            reserve_system_memory_gb: 4.0,
            max_model_memory_percent: 0.75,
            min_model_memory_percent: 0.1,
            kv_cache_memory_percent: 0.2,
            aggressiveness_level: AggressivenessLevel::Balanced,
            update_interval_seconds: 5.0,
        }
    }
}

pub const MIN_UPDATE_INTERVAL_SECONDS: f64 = 0.1;

/// Keys accepted by [`Configuration::set_value`]
pub const CONFIG_KEYS: [&str; 10] = [
    "enable_dynamic_allocation",
    "enable_battery_awareness",
    "enable_gpu_offload",
    "enable_neural_engine_optimization",
    "reserve_system_memory_gb",
    "max_model_memory_percent",
    "min_model_memory_percent",
    "kv_cache_memory_percent",
    "aggressiveness_level",
    "update_interval_seconds",
];

impl Configuration {
    /// Return a copy with every field forced into a usable range.
    ///
    /// Percentages land in [0, 1] with `min <= max`, the reserve is
    /// non-negative and the update interval is at least 100ms. NaN values
    /// fall back to the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Configuration::default();
        let unit = |value: f64, fallback: f64| {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        };

        let max = unit(self.max_model_memory_percent, defaults.max_model_memory_percent);
        let min = unit(self.min_model_memory_percent, defaults.min_model_memory_percent).min(max);

        let reserve = if self.reserve_system_memory_gb.is_finite() {
            self.reserve_system_memory_gb.max(0.0)
        } else {
            defaults.reserve_system_memory_gb
        };

        let interval = if self.update_interval_seconds.is_finite() {
            self.update_interval_seconds.max(MIN_UPDATE_INTERVAL_SECONDS)
        } else {
            defaults.update_interval_seconds
        };

        Self {
            reserve_system_memory_gb: reserve,
            max_model_memory_percent: max,
            min_model_memory_percent: min,
            kv_cache_memory_percent: unit(
                self.kv_cache_memory_percent,
                defaults.kv_cache_memory_percent,
            ),
            update_interval_seconds: interval,
            ..self.clone()
        }
    }

    pub fn reserve_bytes(&self) -> u64 {
        (self.reserve_system_memory_gb.max(0.0) * crate::core::allocation::BYTES_PER_GB as f64)
            as u64
    }

    /// Set a single field from its persisted key and a string value
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse_bool(key: &str, value: &str) -> Result<bool> {
            match value.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(true),
                "false" | "off" | "no" | "0" => Ok(false),
                _ => Err(GuardError::config(format!(
                    "Invalid boolean for {}: '{}'",
                    key, value
                ))),
            }
        }

        fn parse_f64(key: &str, value: &str) -> Result<f64> {
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| GuardError::config(format!("Invalid number for {}: '{}'", key, value)))
        }

        match key {
            "enable_dynamic_allocation" => self.enable_dynamic_allocation = parse_bool(key, value)?,
            "enable_battery_awareness" => self.enable_battery_awareness = parse_bool(key, value)?,
            "enable_gpu_offload" => self.enable_gpu_offload = parse_bool(key, value)?,
            "enable_neural_engine_optimization" => {
                self.enable_neural_engine_optimization = parse_bool(key, value)?
            }
            "reserve_system_memory_gb" => self.reserve_system_memory_gb = parse_f64(key, value)?,
            "max_model_memory_percent" => self.max_model_memory_percent = parse_f64(key, value)?,
            "min_model_memory_percent" => self.min_model_memory_percent = parse_f64(key, value)?,
            "kv_cache_memory_percent" => self.kv_cache_memory_percent = parse_f64(key, value)?,
            "aggressiveness_level" => self.aggressiveness_level = value.parse()?,
            "update_interval_seconds" => self.update_interval_seconds = parse_f64(key, value)?,
            _ => {
                return Err(GuardError::config(format!(
                    "Unknown configuration key '{}'",
                    key
                )))
            }
        }
        Ok(())
    }
}

/// Persistence backend for [`Configuration`]
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration, `Ok(None)` when nothing has been saved yet
    fn load(&self) -> Result<Option<Configuration>>;

    fn save(&self, config: &Configuration) -> Result<()>;
}

/// Load from a store, falling back to defaults on any failure
pub fn load_or_default(store: &dyn ConfigStore) -> Configuration {
    match store.load() {
        Ok(Some(config)) => config.sanitized(),
        Ok(None) => {
            log::debug!("No stored configuration, using defaults");
            Configuration::default()
        }
        Err(e) => {
            log::warn!("Failed to load configuration, using defaults: {}", e);
            Configuration::default()
        }
    }
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config directory (`<config_dir>/inferguard/config.json`)
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GuardError::config("Could not determine config directory"))?;

        Ok(Self::new(config_dir.join("inferguard").join("config.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonConfigStore {
    fn load(&self) -> Result<Option<Configuration>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.path)?;

        // An empty file is treated like a missing one
        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn save(&self, config: &Configuration) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, data)?;

        Ok(())
    }
}

/// Store that keeps the configuration in memory only
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    stored: Mutex<Option<Configuration>>,
    saves: Mutex<usize>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Configuration) -> Self {
        Self {
            stored: Mutex::new(Some(config)),
            saves: Mutex::new(0),
        }
    }

    pub fn stored(&self) -> Option<Configuration> {
        self.stored.lock().clone()
    }

    /// Number of times `save` has been called
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load(&self) -> Result<Option<Configuration>> {
        Ok(self.stored.lock().clone())
    }

    fn save(&self, config: &Configuration) -> Result<()> {
        *self.stored.lock() = Some(config.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

use serde::Deserialize;
use std::path::Path;

use hellblock_game::invasion::InvasionConfig;

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub invasion: InvasionSection,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Game ticks between invasion fine updates. Default: 20 (1 second).
    #[serde(default = "default_update_interval_ticks")]
    pub update_interval_ticks: u64,
    /// Seconds between eligibility scans. Default: 180 (3 minutes).
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

fn default_update_interval_ticks() -> u64 {
    20
}

fn default_scan_interval_secs() -> u64 {
    180
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            update_interval_ticks: default_update_interval_ticks(),
            scan_interval_secs: default_scan_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "data".into()
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Invasion tuning exposed through the config file. Everything not listed
/// here keeps its built-in default.
#[derive(Debug, Default, Deserialize)]
pub struct InvasionSection {
    pub max_tier: Option<u32>,
    pub min_island_level: Option<f32>,
    pub cooldown_secs: Option<u64>,
    pub base_chance: Option<f64>,
    pub max_duration_ticks: Option<u64>,
    pub mount_chance: Option<f64>,
}

impl InvasionSection {
    pub fn to_invasion_config(&self) -> InvasionConfig {
        let defaults = InvasionConfig::default();
        InvasionConfig {
            max_tier: self.max_tier.unwrap_or(defaults.max_tier),
            min_island_level: self.min_island_level.unwrap_or(defaults.min_island_level),
            cooldown_secs: self.cooldown_secs.unwrap_or(defaults.cooldown_secs),
            base_chance: self.base_chance.unwrap_or(defaults.base_chance),
            max_duration_ticks: self
                .max_duration_ticks
                .unwrap_or(defaults.max_duration_ticks),
            mount_chance: self.mount_chance.unwrap_or(defaults.mount_chance),
            ..defaults
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load the config file, falling back to built-in defaults when it does
    /// not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

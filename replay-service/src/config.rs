use std::{collections::BTreeSet, fs, ops::RangeInclusive, time::Duration};

use appliance_data::Device;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Filesystem path or `http(s)://` URL of the CSV.
    pub source: String,
    #[serde(default)]
    pub day_first: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Reveal one more row per step and stop after the last row.
    #[default]
    Progressive,
    /// Re-render "all rows but the last" every step until stopped.
    FixedWindow,
}

impl ReplayMode {
    /// Number of visible rows at `step`, or `None` once the replay is exhausted.
    pub fn visible_rows(self, step: usize, dataset_len: usize) -> Option<usize> {
        match self {
            ReplayMode::Progressive => (step < dataset_len).then_some(step + 1),
            ReplayMode::FixedWindow => Some(dataset_len.saturating_sub(1)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub mode: ReplayMode,
    /// Rows kept in trend charts; 0 keeps the whole window.
    #[serde(default = "default_trailing_rows")]
    pub trailing_rows: usize,
}

impl ReplayConfig {
    pub fn trailing_limit(&self) -> Option<usize> {
        (self.trailing_rows > 0).then_some(self.trailing_rows)
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mode: ReplayMode::default(),
            trailing_rows: default_trailing_rows(),
        }
    }
}

fn default_trailing_rows() -> usize {
    50
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("interval_seconds must be within 1..=5, got {0}")]
    IntervalOutOfRange(u64),
}

/// Runtime display options. Re-read by the replay loop at the top of every step.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DisplaySettings {
    #[serde(default = "default_devices")]
    pub devices: BTreeSet<Device>,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl DisplaySettings {
    pub const INTERVAL_RANGE: RangeInclusive<u64> = 1..=5;

    pub fn validate(&self) -> Result<(), SettingsError> {
        if Self::INTERVAL_RANGE.contains(&self.interval_seconds) {
            Ok(())
        } else {
            Err(SettingsError::IntervalOutOfRange(self.interval_seconds))
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            devices: default_devices(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

fn default_devices() -> BTreeSet<Device> {
    Device::ALL.into_iter().collect()
}

fn default_interval_seconds() -> u64 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub display: DisplaySettings,
    pub dashboard: Option<DashboardConfig>,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("REPLAY_CONFIG").unwrap_or_else(|_| "replay-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.display.validate()?;
        Ok(cfg)
    }
}

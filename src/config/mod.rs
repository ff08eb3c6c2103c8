// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Configuration module
//!
//! Node behaviour (sensor wiring, threshold, report cadence) is fixed at
//! build time by the constants below. The TOML [`Config`] only describes how
//! the host reaches its collaborators: which bus device, which serial port,
//! how fast to pace ticks.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::core::CLOCK_WRAP_SECS;
use crate::report::record_capacity;
use crate::sensors::{ChannelId, Distance, MAX_CHANNELS};

/// Number of ranging sensors on the node
pub const SENSOR_COUNT: usize = 2;

/// Mux channel of each sensor, in report order
pub const SENSOR_CHANNELS: [ChannelId; SENSOR_COUNT] = [ChannelId(2), ChannelId(7)];

/// Readings strictly below this count as presence
pub const PROXIMITY_THRESHOLD: Distance = Distance(150);

/// Seconds between reports
pub const REPORT_PERIOD_SECS: u64 = 60;

pub const REPORT_PERIOD: Duration = Duration::from_secs(REPORT_PERIOD_SECS);

/// Shared bus clock
pub const BUS_SPEED_KHZ: u32 = 400;

/// 7-bit address of the channel multiplexer
pub const MUX_ADDRESS: u8 = 0x70;

/// 7-bit address every ranging sensor answers on behind the mux
pub const RANGING_ADDRESS: u8 = 0x29;

/// Fractional digits per report field
pub const FRACTION_DIGITS: usize = 4;

/// Bytes in one report record, derived from sensor count and period
pub const RECORD_CAPACITY: usize = record_capacity(SENSOR_COUNT, REPORT_PERIOD_SECS);

const _: () = {
    assert!(SENSOR_COUNT > 0);
    assert!(REPORT_PERIOD_SECS > 0);
    assert!(REPORT_PERIOD_SECS < CLOCK_WRAP_SECS, "report period must fit in one clock wrap");
    let mut i = 0;
    while i < SENSOR_COUNT {
        assert!(SENSOR_CHANNELS[i].0 < MAX_CHANNELS, "channel outside the mux range");
        i += 1;
    }
};

/// Sensor wiring, threshold and cadence of a node
#[derive(Debug, Clone, Copy)]
pub struct NodeLayout<'a> {
    pub channels: &'a [ChannelId],
    pub threshold: Distance,
    pub period: Duration,
}

/// The layout this build was compiled for
pub const NODE: NodeLayout<'static> = NodeLayout {
    channels: &SENSOR_CHANNELS,
    threshold: PROXIMITY_THRESHOLD,
    period: REPORT_PERIOD,
};

/// How each poll obtains its distance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RangingMode {
    /// One single-shot reading per poll
    #[default]
    Single,
    /// Mean of several single-shot readings per poll
    Averaged { samples: usize },
}

/// Host-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for received-record journals
    pub data_dir: PathBuf,

    /// Log level
    pub log_level: String,

    /// Use simulated sensors instead of hardware
    pub demo_mode: bool,

    /// Seed for the simulator; entropy when unset
    pub demo_seed: Option<u64>,

    /// Pause between scheduler ticks
    pub tick_interval_ms: u64,

    /// Ranging mode
    pub ranging: RangingMode,

    /// Bus configuration
    pub bus: BusConfig,

    /// Serial link configuration
    pub serial: SerialConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            demo_mode: false,
            demo_seed: None,
            tick_interval_ms: 10,
            ranging: RangingMode::default(),
            bus: BusConfig::default(),
            serial: SerialConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let RangingMode::Averaged { samples } = self.ranging {
            ensure!(samples > 0, "averaged ranging needs at least one sample");
        }
        ensure!(self.serial.baud_rate > 0, "serial baud rate must be positive");
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("tofnode"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Linux I2C character device
    pub device: PathBuf,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { device: PathBuf::from("/dev/i2c-1") }
    }
}

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name; records go to stdout when unset
    pub port: Option<String>,

    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { port: None, baud_rate: 115_200 }
    }
}

// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! tofnode - Presence-Detection Node
//!
//! Several time-of-flight ranging sensors share one bus behind a channel
//! multiplexer. The node polls them in turn, decides per sensor whether
//! something is present, accumulates how long it was present, and emits a
//! fixed-layout text record of those durations once per report period.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Scheduler                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │ BusSelector │ → │ RangingSens │ → │ Sensor (presence │    │
//! │  │ (mux write) │   │ (one read)  │   │  state machine)  │    │
//! │  └─────────────┘   └─────────────┘   └──────────────────┘    │
//! │         ↓                                   ↓                │
//! │  ┌─────────────┐                     ┌──────────────────┐    │
//! │  │  Indicator  │ ← edge events ───── │   SensorArray    │    │
//! │  └─────────────┘                     └──────────────────┘    │
//! │                                             ↓                │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │  Transport  │ ← │   Record    │ ← │   ReportCycle    │    │
//! │  └─────────────┘   └─────────────┘   └──────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread of control. No state is shared.

pub mod config;
pub mod core;
pub mod report;
pub mod sensors;
pub mod streaming;

// Re-exports for convenience
pub use config::{Config, RangingMode};
pub use core::{Clock, MonotonicClock, NodeStats, Scheduler, Timestamp};
pub use report::{Record, ReportCycle};
pub use sensors::{BusSelector, ChannelId, Distance, Sensor, SensorArray};
pub use streaming::{Transport, WriterTransport};

/// tofnode version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// tofnode name
pub const NAME: &str = "tofnode";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
        features: enabled_features(),
        sensors: config::SENSOR_COUNT,
        record_capacity: config::RECORD_CAPACITY,
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub rust_version: String,
    pub target: String,
    pub os: String,
    pub features: Vec<String>,
    /// Sensors compiled into the node
    pub sensors: usize,
    /// Bytes reserved for one report record
    pub record_capacity: usize,
}

fn enabled_features() -> Vec<String> {
    #[allow(unused_mut)]
    let mut features = vec![];

    #[cfg(feature = "serial")]
    features.push("serial".to_string());

    #[cfg(feature = "hardware")]
    features.push("hardware".to_string());

    features
}

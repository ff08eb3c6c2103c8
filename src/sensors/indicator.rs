// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Presence indicator outputs

use tracing::info;

use super::ChannelId;

/// Level output per sensor, asserted while presence holds
pub trait Indicator {
    fn set(&mut self, sensor: usize, channel: ChannelId, on: bool);
}

/// Indicator that reports levels through the log and remembers them
#[derive(Debug, Default)]
pub struct LogIndicator {
    levels: Vec<bool>,
}

impl LogIndicator {
    pub fn new(sensors: usize) -> Self {
        Self { levels: vec![false; sensors] }
    }

    pub fn level(&self, sensor: usize) -> bool {
        self.levels.get(sensor).copied().unwrap_or(false)
    }
}

impl Indicator for LogIndicator {
    fn set(&mut self, sensor: usize, channel: ChannelId, on: bool) {
        if sensor >= self.levels.len() {
            self.levels.resize(sensor + 1, false);
        }
        self.levels[sensor] = on;
        info!("Sensor {} ({}) presence {}", sensor, channel, if on { "ON" } else { "OFF" });
    }
}

impl<I: Indicator + ?Sized> Indicator for &mut I {
    fn set(&mut self, sensor: usize, channel: ChannelId, on: bool) {
        (**self).set(sensor, channel, on)
    }
}

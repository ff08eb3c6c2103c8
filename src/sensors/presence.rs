// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Presence state machine - distance readings to dwell time

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ChannelId, Distance, SensorError};
use crate::core::Timestamp;

/// Indicator edge produced by a presence transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorEvent {
    On,
    Off,
}

impl IndicatorEvent {
    pub fn is_on(self) -> bool {
        matches!(self, IndicatorEvent::On)
    }
}

/// Per-sensor presence state and accumulated dwell time
#[derive(Debug, Clone)]
pub struct Sensor {
    channel: ChannelId,
    threshold: Distance,
    last_sample_time: Timestamp,
    is_present: bool,
    accumulated_active_time: Duration,
}

impl Sensor {
    pub fn new(channel: ChannelId, threshold: Distance, now: Timestamp) -> Self {
        Self {
            channel,
            threshold,
            last_sample_time: now,
            is_present: false,
            accumulated_active_time: Duration::ZERO,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn threshold(&self) -> Distance {
        self.threshold
    }

    pub fn is_present(&self) -> bool {
        self.is_present
    }

    pub fn last_sample_time(&self) -> Timestamp {
        self.last_sample_time
    }

    pub fn accumulated_active_time(&self) -> Duration {
        self.accumulated_active_time
    }

    /// Read the accumulator and zero it.
    pub fn take_accumulated(&mut self) -> Duration {
        std::mem::take(&mut self.accumulated_active_time)
    }

    /// Feed one poll result taken at `now`.
    ///
    /// Only the interval ending in a below-threshold reading counts as
    /// active time. A failed read freezes presence and the accumulator but
    /// still moves the sample time, so the failed window is never credited.
    pub fn update(
        &mut self,
        reading: Result<Distance, SensorError>,
        now: Timestamp,
    ) -> Option<IndicatorEvent> {
        let elapsed = now.elapsed_since(self.last_sample_time);
        self.last_sample_time = now;

        let distance = reading.ok()?;

        if distance < self.threshold {
            self.accumulated_active_time += elapsed;
            if !self.is_present {
                self.is_present = true;
                return Some(IndicatorEvent::On);
            }
        } else if self.is_present {
            self.is_present = false;
            return Some(IndicatorEvent::Off);
        }

        None
    }
}

// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Collaborator traits and common types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest channel a single-byte mux selection can address
pub const MAX_CHANNELS: u8 = 8;

/// Multiplexer input a sensor is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u8);

impl ChannelId {
    /// Selection byte for the mux: one bit per channel.
    pub fn mask(self) -> Result<u8, BusError> {
        if self.0 >= MAX_CHANNELS {
            return Err(BusError::InvalidChannel(self.0));
        }
        Ok(1 << self.0)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Raw range reported by a ranging sensor, in sensor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Distance(pub u16);

/// Failure on the shared bus itself
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("channel {0} is outside the multiplexer range")]
    InvalidChannel(u8),

    #[error("write to bus address {address:#04x} rejected: {reason}")]
    WriteRejected { address: u8, reason: String },

    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single ranging read
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("ranging read failed: {0}")]
    ReadFailed(String),

    #[error("range status {0} marks the reading invalid")]
    InvalidReading(u8),

    #[error("ranging did not complete in time")]
    Timeout,

    #[error("no channel selected")]
    NotSelected,
}

/// Single-byte writes on the shared bus
pub trait BusWrite {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;
}

/// A ranging device reached through whichever mux channel is selected
pub trait RangingSensor {
    /// One synchronous single-shot measurement.
    fn read_distance(&mut self) -> Result<Distance, SensorError>;

    /// Average of up to `samples` single-shot readings, ignoring failed ones.
    ///
    /// Fails only when no reading in the batch succeeded, with the last error seen.
    fn read_averaged(&mut self, samples: usize) -> Result<Distance, SensorError> {
        let mut sum = 0u64;
        let mut valid = 0u64;
        let mut last_err = SensorError::ReadFailed("no samples requested".to_string());

        for _ in 0..samples {
            match self.read_distance() {
                Ok(Distance(d)) => {
                    sum += u64::from(d);
                    valid += 1;
                }
                Err(e) => last_err = e,
            }
        }

        if valid == 0 {
            return Err(last_err);
        }
        Ok(Distance((sum / valid) as u16))
    }
}

impl<B: BusWrite + ?Sized> BusWrite for &mut B {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(address, bytes)
    }
}

impl<R: RangingSensor + ?Sized> RangingSensor for &mut R {
    fn read_distance(&mut self) -> Result<Distance, SensorError> {
        (**self).read_distance()
    }
}

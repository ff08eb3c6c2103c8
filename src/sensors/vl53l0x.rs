// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Linux I2C collaborators - raw bus writes and VL53L0X single-shot ranging

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::{debug, info};

use super::{BusError, BusWrite, Distance, RangingSensor, SensorError};

const SYSRANGE_START: u8 = 0x00;
const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
const RESULT_INTERRUPT_STATUS: u8 = 0x13;
const RESULT_RANGE_STATUS: u8 = 0x14;

/// Range status code for a valid measurement
const RANGE_VALID: u8 = 11;

/// Polls of the interrupt status before a ranging counts as timed out
const POLL_ATTEMPTS: u32 = 100;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A `/dev/i2c-N` bus that opens one handle per target address on demand
pub struct LinuxI2cBus {
    path: PathBuf,
    devices: HashMap<u8, LinuxI2CDevice>,
}

impl LinuxI2cBus {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf(), devices: HashMap::new() }
    }

    fn device(&mut self, address: u8) -> Result<&mut LinuxI2CDevice, BusError> {
        if !self.devices.contains_key(&address) {
            let dev = LinuxI2CDevice::new(&self.path, u16::from(address))
                .map_err(|e| BusError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
            debug!("Opened {} at {:#04x}", self.path.display(), address);
            self.devices.insert(address, dev);
        }
        self.devices
            .get_mut(&address)
            .ok_or_else(|| BusError::Unavailable(format!("no handle for {:#04x}", address)))
    }
}

impl BusWrite for LinuxI2cBus {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.device(address)?
            .write(bytes)
            .map_err(|e| BusError::WriteRejected { address, reason: e.to_string() })
    }
}

/// VL53L0X behind whichever mux channel is currently selected.
///
/// Assumes the device was already brought up; only the single-shot
/// measurement cycle is driven here.
pub struct Vl53l0x {
    dev: LinuxI2CDevice,
}

impl Vl53l0x {
    pub fn open(path: &Path, address: u8) -> Result<Self, BusError> {
        let dev = LinuxI2CDevice::new(path, u16::from(address))
            .map_err(|e| BusError::Unavailable(format!("{}: {}", path.display(), e)))?;
        info!("VL53L0X handle on {} at {:#04x}", path.display(), address);
        Ok(Self { dev })
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.dev
            .smbus_write_byte_data(reg, value)
            .map_err(|e| SensorError::ReadFailed(e.to_string()))
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
        self.dev
            .smbus_read_byte_data(reg)
            .map_err(|e| SensorError::ReadFailed(e.to_string()))
    }

    fn wait_ready(&mut self) -> Result<(), SensorError> {
        for _ in 0..POLL_ATTEMPTS {
            if self.read_reg(RESULT_INTERRUPT_STATUS)? & 0x07 != 0 {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
        Err(SensorError::Timeout)
    }
}

impl RangingSensor for Vl53l0x {
    fn read_distance(&mut self) -> Result<Distance, SensorError> {
        self.write_reg(SYSRANGE_START, 0x01)?;
        self.wait_ready()?;

        let mut result = [0u8; 12];
        self.dev
            .write(&[RESULT_RANGE_STATUS])
            .and_then(|_| self.dev.read(&mut result))
            .map_err(|e| SensorError::ReadFailed(e.to_string()))?;
        self.write_reg(SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        let status = (result[0] >> 3) & 0x0F;
        if status != RANGE_VALID {
            return Err(SensorError::InvalidReading(status));
        }
        Ok(Distance(u16::from_be_bytes([result[10], result[11]])))
    }
}

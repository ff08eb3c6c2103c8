// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Serial link transport

use std::io::{BufRead, BufReader, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use tracing::info;

use super::{Transport, TransportError};
use crate::config::SerialConfig;

const PORT_TIMEOUT: Duration = Duration::from_millis(500);

/// 8N1 serial port carrying report records
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let name = config
            .port
            .as_deref()
            .ok_or_else(|| TransportError::Unavailable("no serial port configured".to_string()))?;

        let port = serialport::new(name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|e| TransportError::Unavailable(format!("{}: {}", name, e)))?;

        info!("Opened serial port {} at {} baud", name, config.baud_rate);
        Ok(Self { port })
    }

    /// Buffered reader over a clone of the port, for the receiving side.
    ///
    /// Reads time out after `PORT_TIMEOUT` with `ErrorKind::TimedOut`.
    pub fn reader(&self) -> Result<impl BufRead, TransportError> {
        let port = self
            .port
            .try_clone()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(BufReader::new(port))
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}

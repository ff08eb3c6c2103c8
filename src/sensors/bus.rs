// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Channel selection on the shared bus multiplexer

use tracing::trace;

use super::{BusError, BusWrite, ChannelId};

/// Routes the shared bus to one sensor at a time.
///
/// Nothing about the current selection is cached: the mux may lose its state
/// to unrelated bus traffic, so every read is preceded by a fresh `select`.
pub struct BusSelector<B> {
    bus: B,
    mux_address: u8,
}

impl<B: BusWrite> BusSelector<B> {
    pub fn new(bus: B, mux_address: u8) -> Self {
        Self { bus, mux_address }
    }

    /// Write the single-bit mask for `channel` to the mux.
    pub fn select(&mut self, channel: ChannelId) -> Result<(), BusError> {
        let mask = channel.mask()?;
        trace!("Selecting {} (mask {:#010b})", channel, mask);
        self.bus.write(self.mux_address, &[mask])
    }

    pub fn mux_address(&self) -> u8 {
        self.mux_address
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, Vec<u8>)>,
        reject: bool,
    }

    impl BusWrite for RecordingBus {
        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
            if self.reject {
                return Err(BusError::WriteRejected { address, reason: "nack".to_string() });
            }
            self.writes.push((address, bytes.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_select_writes_mask_to_mux() {
        let mut selector = BusSelector::new(RecordingBus::default(), 0x70);
        selector.select(ChannelId(2)).unwrap();
        selector.select(ChannelId(7)).unwrap();
        assert_eq!(selector.bus().writes, vec![(0x70, vec![0x04]), (0x70, vec![0x80])]);
    }

    #[test]
    fn test_reselect_is_not_cached() {
        let mut selector = BusSelector::new(RecordingBus::default(), 0x70);
        selector.select(ChannelId(3)).unwrap();
        selector.select(ChannelId(3)).unwrap();
        assert_eq!(selector.bus().writes.len(), 2);
    }

    #[test]
    fn test_select_surfaces_failures() {
        let bus = RecordingBus { reject: true, ..Default::default() };
        let mut selector = BusSelector::new(bus, 0x70);
        assert!(matches!(
            selector.select(ChannelId(1)),
            Err(BusError::WriteRejected { address: 0x70, .. })
        ));
    }

    #[test]
    fn test_invalid_channel_never_reaches_bus() {
        let mut selector = BusSelector::new(RecordingBus::default(), 0x70);
        assert_eq!(selector.select(ChannelId(9)), Err(BusError::InvalidChannel(9)));
        assert!(selector.bus().writes.is_empty());
    }
}

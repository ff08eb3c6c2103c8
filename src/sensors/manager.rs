// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Sensor array - owns every presence sensor and polls them in order

use tracing::{debug, info};

use super::{BusSelector, BusWrite, ChannelId, Distance, Indicator, RangingSensor, Sensor};
use crate::config::RangingMode;
use crate::core::{Clock, NodeStats};

/// Fixed-order collection of presence sensors
pub struct SensorArray {
    sensors: Vec<Sensor>,
}

impl SensorArray {
    /// One sensor per channel, in the given order.
    pub fn new(channels: &[ChannelId], threshold: Distance, clock: &impl Clock) -> Self {
        let now = clock.now();
        let sensors = channels
            .iter()
            .map(|&channel| Sensor::new(channel, threshold, now))
            .collect::<Vec<_>>();

        info!("Sensor array ready: {} sensors on {:?}", sensors.len(), channels);
        Self { sensors }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sensor> {
        self.sensors.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Sensor] {
        &mut self.sensors
    }

    /// Select, read and update every sensor once.
    ///
    /// A failed selection skips that sensor for this pass with its state
    /// untouched. A failed read is handed to the state machine.
    pub fn poll<B, R, C, I>(
        &mut self,
        selector: &mut BusSelector<B>,
        ranger: &mut R,
        clock: &C,
        indicator: &mut I,
        mode: RangingMode,
        stats: &mut NodeStats,
    ) where
        B: BusWrite,
        R: RangingSensor,
        C: Clock,
        I: Indicator,
    {
        for (index, sensor) in self.sensors.iter_mut().enumerate() {
            if let Err(e) = selector.select(sensor.channel()) {
                stats.bus_errors += 1;
                debug!("Skipping sensor {} ({}): {}", index, sensor.channel(), e);
                continue;
            }

            let reading = match mode {
                RangingMode::Single => ranger.read_distance(),
                RangingMode::Averaged { samples } => ranger.read_averaged(samples),
            };
            let now = clock.now();

            match &reading {
                Ok(_) => stats.readings += 1,
                Err(e) => {
                    stats.read_errors += 1;
                    debug!("Read error for sensor {} ({}): {}", index, sensor.channel(), e);
                }
            }

            if let Some(event) = sensor.update(reading, now) {
                indicator.set(index, sensor.channel(), event.is_on());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManualClock, Timestamp};
    use crate::sensors::{BusError, SensorError};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Bus + ranger pair that answer per selected channel
    #[derive(Clone, Default)]
    struct Rig {
        selected: Rc<RefCell<Option<u8>>>,
        failing_channels: Rc<RefCell<Vec<u8>>>,
        distances: Rc<RefCell<Vec<(u8, Result<Distance, SensorError>)>>>,
    }

    impl BusWrite for Rig {
        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
            let channel = bytes[0].trailing_zeros() as u8;
            if self.failing_channels.borrow().contains(&channel) {
                *self.selected.borrow_mut() = None;
                return Err(BusError::WriteRejected { address, reason: "nack".to_string() });
            }
            *self.selected.borrow_mut() = Some(channel);
            Ok(())
        }
    }

    impl RangingSensor for Rig {
        fn read_distance(&mut self) -> Result<Distance, SensorError> {
            let selected = self.selected.borrow().ok_or(SensorError::NotSelected)?;
            self.distances
                .borrow()
                .iter()
                .find(|(ch, _)| *ch == selected)
                .map(|(_, r)| r.clone())
                .unwrap_or(Err(SensorError::Timeout))
        }
    }

    #[derive(Default)]
    struct Events(Vec<(usize, bool)>);

    impl Indicator for Events {
        fn set(&mut self, sensor: usize, _channel: ChannelId, on: bool) {
            self.0.push((sensor, on));
        }
    }

    #[test]
    fn test_poll_reads_each_channel() {
        let clock = ManualClock::new(Timestamp::ZERO);
        let mut array = SensorArray::new(&[ChannelId(2), ChannelId(7)], Distance(150), &clock);
        let rig = Rig::default();
        rig.distances.borrow_mut().extend([(2, Ok(Distance(100))), (7, Ok(Distance(900)))]);

        let mut selector = BusSelector::new(rig.clone(), 0x70);
        let mut ranger = rig.clone();
        let mut events = Events::default();
        let mut stats = NodeStats::default();

        clock.advance(Duration::from_millis(100));
        array.poll(&mut selector, &mut ranger, &clock, &mut events, RangingMode::Single, &mut stats);

        assert_eq!(events.0, vec![(0, true)]);
        assert!(array.get(0).unwrap().is_present());
        assert!(!array.get(1).unwrap().is_present());
        assert_eq!(array.get(0).unwrap().accumulated_active_time(), Duration::from_millis(100));
        assert_eq!(stats.readings, 2);
    }

    #[test]
    fn test_bus_error_skips_without_touching_state() {
        let clock = ManualClock::new(Timestamp::ZERO);
        let mut array = SensorArray::new(&[ChannelId(2), ChannelId(7)], Distance(150), &clock);
        let rig = Rig::default();
        rig.distances.borrow_mut().extend([(2, Ok(Distance(100))), (7, Ok(Distance(100)))]);
        rig.failing_channels.borrow_mut().push(7);

        let mut selector = BusSelector::new(rig.clone(), 0x70);
        let mut ranger = rig.clone();
        let mut events = Events::default();
        let mut stats = NodeStats::default();

        clock.advance(Duration::from_millis(100));
        array.poll(&mut selector, &mut ranger, &clock, &mut events, RangingMode::Single, &mut stats);

        let skipped = array.get(1).unwrap();
        assert_eq!(skipped.last_sample_time(), Timestamp::ZERO);
        assert!(!skipped.is_present());
        assert_eq!(stats.bus_errors, 1);
        assert_eq!(stats.readings, 1);
        assert_eq!(events.0, vec![(0, true)]);
    }

    #[test]
    fn test_read_error_advances_sample_time() {
        let clock = ManualClock::new(Timestamp::ZERO);
        let mut array = SensorArray::new(&[ChannelId(1)], Distance(150), &clock);
        let rig = Rig::default();
        rig.distances.borrow_mut().push((1, Err(SensorError::InvalidReading(4))));

        let mut selector = BusSelector::new(rig.clone(), 0x70);
        let mut ranger = rig.clone();
        let mut events = Events::default();
        let mut stats = NodeStats::default();

        clock.advance(Duration::from_millis(40));
        array.poll(&mut selector, &mut ranger, &clock, &mut events, RangingMode::Single, &mut stats);

        assert_eq!(array.get(0).unwrap().last_sample_time(), Timestamp::from_micros(40_000));
        assert_eq!(stats.read_errors, 1);
        assert!(events.0.is_empty());
    }

    #[test]
    fn test_averaged_mode_uses_batch() {
        let clock = ManualClock::new(Timestamp::ZERO);
        let mut array = SensorArray::new(&[ChannelId(0)], Distance(150), &clock);
        let rig = Rig::default();
        rig.distances.borrow_mut().push((0, Ok(Distance(120))));

        let mut selector = BusSelector::new(rig.clone(), 0x70);
        let mut ranger = rig.clone();
        let mut events = Events::default();
        let mut stats = NodeStats::default();

        array.poll(
            &mut selector,
            &mut ranger,
            &clock,
            &mut events,
            RangingMode::Averaged { samples: 4 },
            &mut stats,
        );
        assert!(array.get(0).unwrap().is_present());
        assert_eq!(stats.readings, 1);
    }
}

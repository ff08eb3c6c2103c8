// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Polling scheduler - one sequential loop over sensors and reports

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Clock, NodeStats};
use crate::config::{NodeLayout, RangingMode, NODE};
use crate::report::{Record, ReportCycle};
use crate::sensors::{BusSelector, BusWrite, Indicator, RangingSensor, SensorArray};
use crate::streaming::Transport;

/// Owns every piece of node state and drives it one tick at a time.
///
/// Sensors and the report reference are touched only from `tick`; nothing
/// here is shared with another execution context.
pub struct Scheduler<B, R, C, I, T> {
    sensors: SensorArray,
    selector: BusSelector<B>,
    ranger: R,
    clock: C,
    indicator: I,
    transport: T,
    cycle: ReportCycle,
    mode: RangingMode,
    stats: NodeStats,
}

impl<B, R, C, I, T> Scheduler<B, R, C, I, T>
where
    B: BusWrite,
    R: RangingSensor,
    C: Clock,
    I: Indicator,
    T: Transport,
{
    /// Scheduler for the compiled-in node layout
    pub fn new(selector: BusSelector<B>, ranger: R, clock: C, indicator: I, transport: T) -> Self {
        Self::with_layout(NODE, selector, ranger, clock, indicator, transport)
    }

    pub fn with_layout(
        layout: NodeLayout<'_>,
        selector: BusSelector<B>,
        ranger: R,
        clock: C,
        indicator: I,
        transport: T,
    ) -> Self {
        let sensors = SensorArray::new(layout.channels, layout.threshold, &clock);

        Self {
            sensors,
            selector,
            ranger,
            clock,
            indicator,
            transport,
            cycle: ReportCycle::new(layout.period),
            mode: RangingMode::Single,
            stats: NodeStats::default(),
        }
    }

    pub fn set_ranging_mode(&mut self, mode: RangingMode) {
        self.mode = mode;
    }

    /// Poll every sensor once, then emit a report if one is due.
    pub fn tick(&mut self) -> Option<Record> {
        self.stats.ticks += 1;

        self.sensors.poll(
            &mut self.selector,
            &mut self.ranger,
            &self.clock,
            &mut self.indicator,
            self.mode,
            &mut self.stats,
        );

        let now = self.clock.now();
        let record = self.cycle.poll(self.sensors.as_mut_slice(), now)?;

        self.stats.reports += 1;
        if record.is_truncated() {
            self.stats.truncated_reports += 1;
        }
        info!("Report: {}", record.as_str().trim_end());

        if let Err(e) = self.transport.send(record.as_bytes()) {
            self.stats.transport_errors += 1;
            warn!("Failed to send report: {}", e);
        }

        Some(record)
    }

    /// Tick until `max_ticks` is reached, or forever when it is `None`.
    pub fn run(&mut self, tick_interval: Duration, max_ticks: Option<u64>) {
        info!(
            "Scheduler running: {} sensors, report every {:?}",
            self.sensors.len(),
            self.cycle.period()
        );

        let mut ticks = 0u64;
        loop {
            self.tick();
            ticks += 1;

            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            if !tick_interval.is_zero() {
                thread::sleep(tick_interval);
            }
        }

        debug!("Scheduler stopped after {} ticks", ticks);
    }

    pub fn sensors(&self) -> &SensorArray {
        &self.sensors
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

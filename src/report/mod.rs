// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Report aggregation - periodic dwell-time records
//!
//! Every report period the accumulated active time of each sensor is drained
//! into one comma-separated, newline-terminated line of fixed-point seconds:
//!
//! ```text
//! 12.3450,0.0000\n
//! ```
//!
//! Records live in a fixed-capacity buffer whose size follows from the sensor
//! count and the report period alone. Should a record still not fit, it is
//! cut at the last whole field. The accumulators are reset either way.

use core::fmt::Write;
use std::time::Duration;

use heapless::String;
use tracing::warn;

use crate::config::{FRACTION_DIGITS, RECORD_CAPACITY};
use crate::core::{Timestamp, CLOCK_WRAP_SECS};
use crate::sensors::Sensor;

const _: () = assert!(FRACTION_DIGITS <= 6, "durations carry microsecond resolution");

/// Microseconds per unit of the last rendered fractional digit
const FRACTION_DIVISOR: u32 = 10u32.pow(6 - FRACTION_DIGITS as u32);

/// Scratch space for one rendered field; fits any `u64` seconds value
const FIELD_SCRATCH: usize = 32;

/// Number of decimal digits in `n`
pub const fn decimal_digits(mut n: u64) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Upper bound on any accumulator when a report fires.
///
/// A report fires on the first tick at or after the period, every sample
/// interval is shorter than one clock wrap, and the first interval after a
/// reset may start before it.
pub const fn max_interval_secs(period_secs: u64) -> u64 {
    period_secs + 2 * CLOCK_WRAP_SECS
}

/// Characters in one rendered field at the largest possible value
pub const fn field_width(period_secs: u64) -> usize {
    decimal_digits(max_interval_secs(period_secs)) + 1 + FRACTION_DIGITS
}

/// Bytes needed for a full record: fields, separators and the newline
pub const fn record_capacity(sensors: usize, period_secs: u64) -> usize {
    if sensors == 0 {
        return 1;
    }
    sensors * field_width(period_secs) + (sensors - 1) + 1
}

/// Render seconds with `FRACTION_DIGITS` digits, truncating the remainder.
pub fn render_field(value: Duration) -> String<FIELD_SCRATCH> {
    let mut field = String::new();
    let fraction = value.subsec_micros() / FRACTION_DIVISOR;
    // 20 integer digits at most, the scratch buffer always fits
    let _ = write!(field, "{}.{:0width$}", value.as_secs(), fraction, width = FRACTION_DIGITS);
    field
}

/// One emitted report line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<const N: usize = RECORD_CAPACITY> {
    text: String<N>,
    fields: usize,
    truncated: bool,
}

impl<const N: usize> Record<N> {
    /// Drain every sensor's accumulator into a new record.
    ///
    /// All sensors are reset, including those whose field did not fit.
    pub fn build(sensors: &mut [Sensor]) -> Self {
        const { assert!(N > 0, "a record needs room for its terminator") };

        let mut text = String::<N>::new();
        let mut fields = 0;
        let mut truncated = false;

        for sensor in sensors.iter_mut() {
            let value = sensor.take_accumulated();
            if truncated {
                continue;
            }

            let field = render_field(value);
            let separator = usize::from(fields > 0);
            if text.len() + separator + field.len() + 1 > N {
                truncated = true;
                continue;
            }
            if separator == 1 {
                let _ = text.push(',');
            }
            let _ = text.push_str(&field);
            fields += 1;
        }

        // room for the newline was reserved with every field
        let _ = text.push('\n');

        Self { text, fields, truncated }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Fields actually written
    pub fn fields(&self) -> usize {
        self.fields
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub const fn capacity() -> usize {
        N
    }
}

impl<const N: usize> std::fmt::Display for Record<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Emit a record if at least `period` has passed since `last_report_time`.
pub fn maybe_emit(
    sensors: &mut [Sensor],
    now: Timestamp,
    last_report_time: &mut Timestamp,
    period: Duration,
) -> Option<Record> {
    maybe_emit_bounded(sensors, now, last_report_time, period)
}

/// [`maybe_emit`] into a buffer of explicit capacity `N`.
pub fn maybe_emit_bounded<const N: usize>(
    sensors: &mut [Sensor],
    now: Timestamp,
    last_report_time: &mut Timestamp,
    period: Duration,
) -> Option<Record<N>> {
    if now.elapsed_since(*last_report_time) < period {
        return None;
    }

    let record = Record::<N>::build(sensors);
    if record.is_truncated() {
        warn!(
            "Report truncated to {} of {} fields ({} byte buffer)",
            record.fields(),
            sensors.len(),
            N
        );
    }

    *last_report_time = now;
    Some(record)
}

/// Report cadence state: the single process-wide reference instant
#[derive(Debug, Clone)]
pub struct ReportCycle {
    last_report: Timestamp,
    period: Duration,
}

impl ReportCycle {
    /// A cycle that has never sent; the boot epoch is the reference.
    pub fn new(period: Duration) -> Self {
        Self { last_report: Timestamp::ZERO, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn last_report(&self) -> Timestamp {
        self.last_report
    }

    pub fn poll(&mut self, sensors: &mut [Sensor], now: Timestamp) -> Option<Record> {
        maybe_emit(sensors, now, &mut self.last_report, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REPORT_PERIOD_SECS;
    use crate::sensors::{ChannelId, Distance};

    const THRESHOLD: Distance = Distance(150);

    /// Sensor whose accumulator holds exactly `active`, built from real updates
    fn sensor_with(active: Duration) -> Sensor {
        let step_limit = Duration::from_secs(4_000);
        let mut now = Timestamp::ZERO;
        let mut sensor = Sensor::new(ChannelId(0), THRESHOLD, now);
        let mut remaining = active;
        while remaining > Duration::ZERO {
            let step = remaining.min(step_limit);
            now = now.advanced(step);
            sensor.update(Ok(Distance(10)), now);
            remaining -= step;
        }
        assert_eq!(sensor.accumulated_active_time(), active);
        sensor
    }

    #[test]
    fn test_render_field() {
        assert_eq!(render_field(Duration::from_micros(12_345_000)).as_str(), "12.3450");
        assert_eq!(render_field(Duration::ZERO).as_str(), "0.0000");
        assert_eq!(render_field(Duration::from_micros(1_999_999)).as_str(), "1.9999");
        assert_eq!(render_field(Duration::from_micros(50)).as_str(), "0.0000");
    }

    #[test]
    fn test_two_sensor_record() {
        let mut sensors = vec![sensor_with(Duration::from_micros(12_345_000)), sensor_with(Duration::ZERO)];
        let mut last = Timestamp::ZERO;
        let now = Timestamp::from_micros(60_000_000);

        let record = maybe_emit(&mut sensors, now, &mut last, Duration::from_secs(60)).unwrap();
        assert_eq!(record.as_str(), "12.3450,0.0000\n");
        assert!(!record.is_truncated());
        assert_eq!(record.fields(), 2);
        assert_eq!(last, now);
        assert!(sensors.iter().all(|s| s.accumulated_active_time() == Duration::ZERO));
    }

    #[test]
    fn test_does_not_fire_before_period() {
        let mut sensors = vec![sensor_with(Duration::from_secs(3))];
        let mut last = Timestamp::ZERO;
        let now = Timestamp::from_micros(59_999_999);

        assert!(maybe_emit(&mut sensors, now, &mut last, Duration::from_secs(60)).is_none());
        assert_eq!(last, Timestamp::ZERO);
        assert_eq!(sensors[0].accumulated_active_time(), Duration::from_secs(3));
    }

    #[test]
    fn test_recheck_does_not_refire() {
        let mut sensors = vec![sensor_with(Duration::from_secs(3))];
        let mut last = Timestamp::ZERO;
        let now = Timestamp::from_micros(60_000_000);
        let period = Duration::from_secs(60);

        assert!(maybe_emit(&mut sensors, now, &mut last, period).is_some());
        assert!(maybe_emit(&mut sensors, now, &mut last, period).is_none());
    }

    #[test]
    fn test_fires_across_clock_wrap() {
        let mut sensors = vec![sensor_with(Duration::ZERO)];
        let mut last = Timestamp::from_micros(u32::MAX - 30_000_000);
        let now = last.advanced(Duration::from_secs(60));
        assert!(now.as_micros() < 60_000_000);

        let record = maybe_emit(&mut sensors, now, &mut last, Duration::from_secs(60)).unwrap();
        assert_eq!(record.as_str(), "0.0000\n");
    }

    #[test]
    fn test_truncates_at_field_boundary() {
        let mut sensors = vec![
            sensor_with(Duration::from_micros(12_345_000)),
            sensor_with(Duration::ZERO),
            sensor_with(Duration::from_secs(1)),
        ];
        let mut last = Timestamp::ZERO;
        let now = Timestamp::from_micros(60_000_000);

        let record: Record<10> =
            maybe_emit_bounded(&mut sensors, now, &mut last, Duration::from_secs(60)).unwrap();
        assert_eq!(record.as_str(), "12.3450\n");
        assert!(record.is_truncated());
        assert_eq!(record.fields(), 1);
        assert_eq!(last, now);
        assert!(sensors.iter().all(|s| s.accumulated_active_time() == Duration::ZERO));
    }

    #[test]
    fn test_nothing_fits_still_terminates() {
        let mut sensors = vec![sensor_with(Duration::from_secs(100))];
        let record = Record::<4>::build(&mut sensors);
        assert_eq!(record.as_str(), "\n");
        assert_eq!(record.fields(), 0);
        assert!(record.is_truncated());
        assert_eq!(sensors[0].accumulated_active_time(), Duration::ZERO);
    }

    #[test]
    fn test_many_sensors_overflow_node_buffer() {
        let mut sensors = (0..5).map(|_| sensor_with(Duration::from_micros(7_250_000))).collect::<Vec<_>>();
        let record = Record::<RECORD_CAPACITY>::build(&mut sensors);

        assert!(record.is_truncated());
        assert!(record.len() <= RECORD_CAPACITY);
        assert!(record.as_str().ends_with('\n'));
        for field in record.as_str().trim_end().split(',') {
            assert_eq!(field, "7.2500");
        }
        assert!(sensors.iter().all(|s| s.accumulated_active_time() == Duration::ZERO));
    }

    #[test]
    fn test_node_record_at_maximal_values_fits() {
        let max = Duration::new(max_interval_secs(REPORT_PERIOD_SECS), 999_999_000);
        let mut sensors = vec![sensor_with(max), sensor_with(max)];
        let record = Record::<RECORD_CAPACITY>::build(&mut sensors);

        assert!(!record.is_truncated());
        assert_eq!(record.len(), RECORD_CAPACITY);
    }

    #[test]
    fn test_capacity_never_undersized() {
        for period in 1..CLOCK_WRAP_SECS {
            let widest = render_field(Duration::new(max_interval_secs(period), 999_999_999));
            assert!(widest.len() <= field_width(period), "period {}", period);

            for sensors in 1..=8usize {
                let full = sensors * widest.len() + (sensors - 1) + 1;
                assert!(full <= record_capacity(sensors, period), "period {} sensors {}", period, sensors);
            }
        }
    }

    #[test]
    fn test_decimal_digits() {
        assert_eq!(decimal_digits(0), 1);
        assert_eq!(decimal_digits(9), 1);
        assert_eq!(decimal_digits(10), 2);
        assert_eq!(decimal_digits(8650), 4);
        assert_eq!(decimal_digits(u64::MAX), 20);
    }

    #[test]
    fn test_report_cycle_starts_from_boot() {
        let mut cycle = ReportCycle::new(Duration::from_secs(60));
        let mut sensors = vec![sensor_with(Duration::ZERO)];

        assert!(cycle.poll(&mut sensors, Timestamp::from_micros(59_000_000)).is_none());
        assert!(cycle.poll(&mut sensors, Timestamp::from_micros(61_000_000)).is_some());
        assert_eq!(cycle.last_report(), Timestamp::from_micros(61_000_000));
        assert!(cycle.poll(&mut sensors, Timestamp::from_micros(120_000_000)).is_none());
    }
}

//! Core module - clock and the polling scheduler

mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp, CLOCK_WRAP_SECS};
pub use scheduler::Scheduler;

use serde::{Deserialize, Serialize};

/// Node-wide counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub ticks: u64,
    pub readings: u64,
    pub read_errors: u64,
    pub bus_errors: u64,
    pub reports: u64,
    pub truncated_reports: u64,
    pub transport_errors: u64,
}

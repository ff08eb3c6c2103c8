//! Sensor module - bus selection, presence state and hardware interfaces

mod bus;
mod indicator;
mod manager;
mod presence;
mod simulator;
mod traits;

#[cfg(feature = "hardware")]
mod vl53l0x;

pub use bus::BusSelector;
pub use indicator::{Indicator, LogIndicator};
pub use manager::SensorArray;
pub use presence::{IndicatorEvent, Sensor};
pub use simulator::{simulated_pair, SimulatedMux, SimulatedRanger};
pub use traits::{BusError, BusWrite, ChannelId, Distance, RangingSensor, SensorError, MAX_CHANNELS};

#[cfg(feature = "hardware")]
pub use vl53l0x::{LinuxI2cBus, Vl53l0x};

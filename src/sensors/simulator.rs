// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Simulated mux and ranging sensor for demo/testing

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use rand::prelude::*;
use rand_distr::Normal;

use super::{BusError, BusWrite, ChannelId, Distance, RangingSensor, SensorError};

/// Largest range the simulated device reports, like a VL53L0X out-of-range value
const MAX_RANGE: f64 = 8190.0;

/// Standard deviation of reading noise
const NOISE_SIGMA: f64 = 6.0;

/// Build a mux/ranger pair that share the selected channel.
///
/// Pass a seed for reproducible runs; `None` seeds from entropy.
pub fn simulated_pair(channels: &[ChannelId], seed: Option<u64>) -> (SimulatedMux, SimulatedRanger) {
    let selected = Rc::new(Cell::new(None));
    let (mux_rng, ranger_rng) = match seed {
        Some(seed) => (StdRng::seed_from_u64(seed), StdRng::seed_from_u64(seed.wrapping_add(1))),
        None => (StdRng::from_entropy(), StdRng::from_entropy()),
    };

    let mux = SimulatedMux {
        selected: Rc::clone(&selected),
        rng: mux_rng,
        failure_probability: 0.002,
    };

    let mut ranger = SimulatedRanger {
        selected,
        rng: ranger_rng,
        channels: HashMap::new(),
        presence_probability: 0.02,
        failure_probability: 0.01,
        noise: Normal::new(0.0, NOISE_SIGMA).expect("noise sigma is finite and positive"),
    };
    for &channel in channels {
        let baseline = ranger.rng.gen_range(400.0..1200.0);
        ranger.channels.insert(channel, ChannelState { baseline, episode_left: 0, close: 0.0 });
    }

    (mux, ranger)
}

/// Simulated multiplexer
pub struct SimulatedMux {
    selected: Rc<Cell<Option<ChannelId>>>,
    rng: StdRng,
    failure_probability: f64,
}

impl SimulatedMux {
    pub fn set_failure_probability(&mut self, p: f64) {
        self.failure_probability = p.clamp(0.0, 1.0);
    }
}

impl BusWrite for SimulatedMux {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        if self.rng.gen::<f64>() < self.failure_probability {
            // a rejected write leaves the mux in an unknown state
            self.selected.set(None);
            return Err(BusError::WriteRejected { address, reason: "simulated nack".to_string() });
        }

        let mask = bytes.first().copied().unwrap_or(0);
        let selected = if mask.count_ones() == 1 {
            Some(ChannelId(mask.trailing_zeros() as u8))
        } else {
            None
        };
        self.selected.set(selected);
        Ok(())
    }
}

struct ChannelState {
    baseline: f64,
    episode_left: u32,
    close: f64,
}

/// Simulated ranging sensor with random presence episodes
pub struct SimulatedRanger {
    selected: Rc<Cell<Option<ChannelId>>>,
    rng: StdRng,
    channels: HashMap<ChannelId, ChannelState>,
    presence_probability: f64,
    failure_probability: f64,
    noise: Normal<f64>,
}

impl SimulatedRanger {
    pub fn set_presence_probability(&mut self, p: f64) {
        self.presence_probability = p.clamp(0.0, 1.0);
    }

    pub fn set_failure_probability(&mut self, p: f64) {
        self.failure_probability = p.clamp(0.0, 1.0);
    }
}

impl RangingSensor for SimulatedRanger {
    fn read_distance(&mut self) -> Result<Distance, SensorError> {
        let channel = self.selected.get().ok_or(SensorError::NotSelected)?;

        if self.rng.gen::<f64>() < self.failure_probability {
            return Err(SensorError::ReadFailed("simulated dropout".to_string()));
        }

        let noise = self.rng.sample(self.noise);
        let start_episode = self.rng.gen::<f64>() < self.presence_probability;
        let episode_len = self.rng.gen_range(5..60);
        let close = self.rng.gen_range(30.0..140.0);

        let state = self.channels.get_mut(&channel).ok_or_else(|| {
            SensorError::ReadFailed(format!("nothing connected on {}", channel))
        })?;

        if state.episode_left == 0 && start_episode {
            state.episode_left = episode_len;
            state.close = close;
        }

        let range = if state.episode_left > 0 {
            state.episode_left -= 1;
            state.close + noise
        } else {
            state.baseline + noise
        };

        Ok(Distance(range.clamp(0.0, MAX_RANGE) as u16))
    }
}

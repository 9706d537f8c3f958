//! Synthetic readings for metrics the host cannot provide.
//!
//! Every draw is independent of earlier ones: a fresh uniform value in the
//! configured range.

use meter_config::{Range, SimulationConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::network::NetworkUsage;

pub struct Simulator {
    config: SimulationConfig,
    rng:    StdRng,
}

impl Simulator {
    /// Seeds from `config.seed`, or from the OS when unset.
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    pub fn temperature(&mut self) -> f64 {
        let range = self.config.temperature;
        self.draw(range)
    }

    pub fn graphics_usage(&mut self) -> f64 {
        let range = self.config.graphics;
        self.draw(range)
    }

    pub fn network_usage(&mut self) -> NetworkUsage {
        let (today, week, month) = (
            self.config.network_today,
            self.config.network_week,
            self.config.network_month,
        );
        NetworkUsage {
            today: self.draw(today) as u64,
            week:  self.draw(week) as u64,
            month: self.draw(month) as u64,
        }
    }

    fn draw(&mut self, range: Range) -> f64 {
        if !range.is_valid() || range.min == range.max {
            return range.min;
        }
        self.rng.random_range(range.min..=range.max)
    }
}

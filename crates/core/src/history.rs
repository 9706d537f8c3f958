use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::state::MetricSample;

/// Number of samples kept per metric unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// Fixed-length window of samples, most recent last.
///
/// The window starts out filled with zeros and never changes length: every
/// [`push`](Self::push) drops the oldest entry and appends the newest.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory {
    samples:  VecDeque<f64>,
    capacity: usize,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    /// Push a new sample, evicting the oldest.
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        self.samples.pop_front();
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recently pushed value (zero before the first push).
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Average of all samples in the window.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Largest sample in the window, used to scale chart axes.
    pub fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0, f64::max)
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// A metric that has a rolling history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Temperature,
    Battery,
    Graphics,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Temperature,
        MetricKind::Battery,
        MetricKind::Graphics,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Cpu         => "cpu",
            MetricKind::Memory      => "memory",
            MetricKind::Temperature => "temperature",
            MetricKind::Battery     => "battery",
            MetricKind::Graphics    => "graphics",
        }
    }
}

/// One [`RollingHistory`] per [`MetricKind`], always updated together.
#[derive(Debug, Clone, PartialEq)]
pub struct Histories {
    cpu:         RollingHistory,
    memory:      RollingHistory,
    temperature: RollingHistory,
    battery:     RollingHistory,
    graphics:    RollingHistory,
}

impl Histories {
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu:         RollingHistory::new(capacity),
            memory:      RollingHistory::new(capacity),
            temperature: RollingHistory::new(capacity),
            battery:     RollingHistory::new(capacity),
            graphics:    RollingHistory::new(capacity),
        }
    }

    pub fn get(&self, kind: MetricKind) -> &RollingHistory {
        match kind {
            MetricKind::Cpu         => &self.cpu,
            MetricKind::Memory      => &self.memory,
            MetricKind::Temperature => &self.temperature,
            MetricKind::Battery     => &self.battery,
            MetricKind::Graphics    => &self.graphics,
        }
    }

    fn get_mut(&mut self, kind: MetricKind) -> &mut RollingHistory {
        match kind {
            MetricKind::Cpu         => &mut self.cpu,
            MetricKind::Memory      => &mut self.memory,
            MetricKind::Temperature => &mut self.temperature,
            MetricKind::Battery     => &mut self.battery,
            MetricKind::Graphics    => &mut self.graphics,
        }
    }

    /// Append the value `sample` reports for every kind, exactly one push each.
    pub fn record(&mut self, sample: &MetricSample) {
        for kind in MetricKind::ALL {
            self.get_mut(kind).push(sample.value(kind));
        }
    }
}

impl Default for Histories {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full_of_zeros() {
        let h = RollingHistory::new(60);
        assert_eq!(h.len(), 60);
        assert!(h.iter().all(|v| v == 0.0));
        assert_eq!(h.latest(), Some(0.0));
    }

    #[test]
    fn length_is_constant_across_many_pushes() {
        let mut h = RollingHistory::new(5);
        for i in 0..23 {
            h.push(i as f64);
            assert_eq!(h.len(), 5);
        }
        assert_eq!(h.to_vec(), vec![18.0, 19.0, 20.0, 21.0, 22.0]);
    }

    #[test]
    fn evicts_value_pushed_capacity_ticks_earlier() {
        let mut h = RollingHistory::new(3);
        h.push(1.0);
        h.push(2.0);
        h.push(3.0);
        assert_eq!(h.to_vec(), vec![1.0, 2.0, 3.0]);
        h.push(4.0);
        // 1.0 was pushed exactly three pushes before 4.0.
        assert_eq!(h.to_vec(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn zero_capacity_stays_empty() {
        let mut h = RollingHistory::new(0);
        h.push(42.0);
        assert!(h.is_empty());
        assert_eq!(h.latest(), None);
        assert_eq!(h.average(), 0.0);
    }

    #[test]
    fn average_and_max() {
        let mut h = RollingHistory::new(4);
        for v in [10.0, 20.0, 30.0, 40.0] {
            h.push(v);
        }
        assert_eq!(h.average(), 25.0);
        assert_eq!(h.max(), 40.0);
    }

    #[test]
    fn record_pushes_once_per_kind() {
        let mut histories = Histories::new(3);
        let sample = MetricSample {
            cpu_usage_percent:      12.5,
            memory_usage_percent:   40.0,
            cpu_temperature_celsius: 51.0,
            battery_charge_percent: 88.0,
            graphics_usage_percent: 7.0,
            ..MetricSample::default()
        };
        histories.record(&sample);

        for kind in MetricKind::ALL {
            let h = histories.get(kind);
            assert_eq!(h.len(), 3);
            assert_eq!(h.latest(), Some(sample.value(kind)));
            assert_eq!(h.to_vec()[..2], [0.0, 0.0]);
        }
    }
}

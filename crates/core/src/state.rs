use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::history::{Histories, MetricKind};

/// A point-in-time set of readings taken during one sampling tick.
///
/// Fields that failed to refresh on a tick keep the value of the previous
/// tick, so a sample is always fully populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSample {
    /// CPU usage (0.0 – 100.0).
    pub cpu_usage_percent: f64,
    /// Memory usage (0.0 – 100.0).
    pub memory_usage_percent: f64,
    /// Memory in use, in bytes.
    pub memory_used_bytes: u64,
    /// Physical memory, in bytes.
    pub memory_total_bytes: u64,
    /// CPU package temperature in °C.
    pub cpu_temperature_celsius: f64,
    /// Battery charge level (0.0 – 100.0).
    pub battery_charge_percent: f64,
    /// Raw current capacity reported by the power source.
    pub battery_capacity: u64,
    /// Raw full-charge capacity reported by the power source.
    pub battery_max_capacity: u64,
    /// Full-charge capacity relative to the design capacity.
    pub battery_health_percent: f64,
    pub battery_is_charging: bool,
    /// Simulated graphics load (0.0 – 100.0).
    pub graphics_usage_percent: f64,
    pub network_usage_today_bytes: u64,
    pub network_usage_week_bytes: u64,
    pub network_usage_month_bytes: u64,
    /// Bytes received on non-loopback interfaces since the previous tick.
    pub network_rx_rate: u64,
    /// Bytes sent on non-loopback interfaces since the previous tick.
    pub network_tx_rate: u64,
}

impl MetricSample {
    /// The value this sample contributes to the history of `kind`.
    #[must_use]
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Cpu         => self.cpu_usage_percent,
            MetricKind::Memory      => self.memory_usage_percent,
            MetricKind::Temperature => self.cpu_temperature_celsius,
            MetricKind::Battery     => self.battery_charge_percent,
            MetricKind::Graphics    => self.graphics_usage_percent,
        }
    }
}

/// Everything observers see after a tick, published as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Published {
    /// Number of completed ticks; `0` means nothing has been sampled yet.
    pub tick:      u64,
    pub sample:    MetricSample,
    pub histories: Histories,
}

impl Published {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            tick:      0,
            sample:    MetricSample::default(),
            histories: Histories::new(history_capacity),
        }
    }

    pub fn history(&self, kind: MetricKind) -> Vec<f64> {
        self.histories.get(kind).to_vec()
    }
}

// ── Alerts ────────────────────────────────────────────────────────────────────

/// Which threshold an [`Alert`] crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Cpu,
    Memory,
}

/// A metric exceeded its configured threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind:      AlertKind,
    /// Observed value (percent).
    pub value:     f64,
    /// Threshold in force when the alert fired (percent).
    pub threshold: f64,
    pub at:        Instant,
}

impl Alert {
    /// One-line human readable description.
    pub fn message(&self) -> String {
        let what = match self.kind {
            AlertKind::Cpu    => "CPU",
            AlertKind::Memory => "memory",
        };
        format!(
            "High {what} usage: {:.0}% exceeds the {:.0}% threshold",
            self.value, self.threshold
        )
    }
}

// ── Speed test ────────────────────────────────────────────────────────────────

/// Phase of the simulated network speed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTestPhase {
    #[default]
    Idle,
    Ping,
    Download,
    Upload,
    Completed,
    Failed,
}

/// Outcome of one completed speed test run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedTestResult {
    pub date:          DateTime<Local>,
    /// Mbps.
    pub download_mbps: f64,
    /// Mbps.
    pub upload_mbps:   f64,
    pub ping_ms:       u32,
}

/// Observable state of the speed test sequencer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedTestState {
    pub running:           bool,
    pub phase:             SpeedTestPhase,
    /// Download progress in `[0, 1]`.
    pub download_progress: f64,
    /// Upload progress in `[0, 1]`.
    pub upload_progress:   f64,
    pub download_mbps:     f64,
    pub upload_mbps:       f64,
    pub ping_ms:           u32,
    /// Most recent last.
    pub history:           Vec<SpeedTestResult>,
}

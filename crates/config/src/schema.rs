use serde::{Deserialize, Serialize};

/// Root configuration structure parsed from `menumeter.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MeterConfig {
    /// Sampling cadence and history settings.
    pub sampler: SamplerConfig,
    /// Power-source settings.
    pub battery: BatteryConfig,
    /// Where the CPU temperature comes from.
    pub thermal: ThermalConfig,
    /// Ranges for the simulated readings.
    pub simulation: SimulationConfig,
    /// High-usage alert thresholds.
    pub alerts: AlertConfig,
    /// Simulated network speed test.
    pub speed_test: SpeedTestConfig,
}

/// Sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds between ticks.  Must be positive.
    pub interval_secs: f64,
    /// Samples kept per rolling history.
    pub history_capacity: usize,
    /// How CPU usage is derived from the tick counters.
    pub cpu_usage: CpuUsageMode,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs:    2.0,
            history_capacity: 60,
            cpu_usage:        CpuUsageMode::Interval,
        }
    }
}

/// CPU usage derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CpuUsageMode {
    /// Usage over the ticks elapsed since the previous sample.
    #[default]
    Interval,
    /// Usage over the cumulative counters, i.e. the average since boot.
    SinceBoot,
}

/// Power-source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// Design capacity (mAh) used when the power source reports none of its own.
    pub design_capacity: u64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self { design_capacity: 8694 }
    }
}

/// Temperature source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ThermalConfig {
    pub source: ThermalSource,
    /// Substring of the sensor label to read in `sensor` mode (case-insensitive).
    /// The hottest matching sensor wins; `None` considers every sensor.
    pub sensor_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThermalSource {
    /// Uniform random value in `simulation.temperature`.
    #[default]
    Simulated,
    /// Hardware sensors.
    Sensor,
}

/// Closed range `[min, max]` for a simulated reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Ranges for every simulated reading.  Network ranges are in bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed RNG seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub temperature: Range,
    pub graphics: Range,
    pub network_today: Range,
    pub network_week: Range,
    pub network_month: Range,
}

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * MIB;

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed:          None,
            temperature:   Range::new(45.0, 65.0),
            graphics:      Range::new(0.0, 40.0),
            network_today: Range::new(300.0 * MIB, 500.0 * MIB),
            network_week:  Range::new(4.0 * GIB, 6.0 * GIB),
            network_month: Range::new(25.0 * GIB, 35.0 * GIB),
        }
    }
}

/// High-usage alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    /// Percent.
    pub cpu_threshold: f64,
    /// Percent.
    pub memory_threshold: f64,
    /// Minimum seconds between two alerts of the same kind.
    pub cooldown_secs: u64,
    /// Alerts kept in the history (newest first).
    pub history_limit: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled:          true,
            cpu_threshold:    85.0,
            memory_threshold: 80.0,
            cooldown_secs:    300,
            history_limit:    50,
        }
    }
}

/// Simulated speed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedTestConfig {
    /// Run one test right after launch.
    pub run_on_start: bool,
    /// Milliseconds between sequencer steps.
    pub step_ms: u64,
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            run_on_start: false,
            step_ms:      250,
        }
    }
}

use meter_config::CpuUsageMode;
use meter_core::{MeterError, Result};

/// Cumulative CPU tick counters since boot, summed over all cores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user:   u64,
    pub system: u64,
    pub idle:   u64,
    pub nice:   u64,
}

impl CpuTicks {
    pub fn active(&self) -> u64 {
        self.user + self.system + self.nice
    }

    pub fn total(&self) -> u64 {
        self.active() + self.idle
    }

    /// `active / total × 100`, or `None` when no ticks were counted.
    pub fn usage_percent(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(self.active() as f64 * 100.0 / total as f64)
    }

    /// Ticks elapsed between `earlier` and `self`.
    ///
    /// Counters that went backwards (wrap, hotplug) count as zero.
    pub fn delta(&self, earlier: &CpuTicks) -> CpuTicks {
        CpuTicks {
            user:   self.user.saturating_sub(earlier.user),
            system: self.system.saturating_sub(earlier.system),
            idle:   self.idle.saturating_sub(earlier.idle),
            nice:   self.nice.saturating_sub(earlier.nice),
        }
    }
}

/// Turns successive [`CpuTicks`] readings into a usage percentage.
#[derive(Debug, Clone)]
pub struct CpuUsage {
    mode:     CpuUsageMode,
    previous: Option<CpuTicks>,
}

impl CpuUsage {
    pub fn new(mode: CpuUsageMode) -> Self {
        Self { mode, previous: None }
    }

    /// Feed the latest counters; `None` means "keep the previous value".
    ///
    /// In [`CpuUsageMode::Interval`] the first reading is measured against a
    /// zero baseline, so it reports the same figure as
    /// [`CpuUsageMode::SinceBoot`].
    pub fn update(&mut self, ticks: CpuTicks) -> Option<f64> {
        match self.mode {
            CpuUsageMode::SinceBoot => ticks.usage_percent(),
            CpuUsageMode::Interval => {
                let baseline = self.previous.replace(ticks).unwrap_or_default();
                ticks.delta(&baseline).usage_percent()
            }
        }
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// see `proc_stat(5)`: `cpu user nice system idle iowait irq softirq ...`
pub fn parse_proc_stat(raw: &str) -> Result<CpuTicks> {
    let line = raw
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| MeterError::query("cpu", "no aggregate cpu line in /proc/stat"))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(4)
        .map(|f| f.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MeterError::query("cpu", format!("bad tick counter: {e}")))?;

    let [user, nice, system, idle] = fields[..] else {
        return Err(MeterError::query("cpu", "too few tick counters in /proc/stat"));
    };

    Ok(CpuTicks { user, system, idle, nice })
}

/// Read the host's cumulative tick counters.
#[cfg(target_os = "linux")]
pub fn read_cpu_ticks() -> Result<CpuTicks> {
    let raw = std::fs::read_to_string("/proc/stat")
        .map_err(|e| MeterError::query("cpu", format!("/proc/stat: {e}")))?;
    parse_proc_stat(&raw)
}

#[cfg(not(target_os = "linux"))]
pub fn read_cpu_ticks() -> Result<CpuTicks> {
    Err(MeterError::query("cpu", "tick counters are not available on this platform"))
}

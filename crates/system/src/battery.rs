use meter_core::{MeterError, Result};
use std::path::Path;

/// Raw power-source description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerSource {
    /// Current charge on the percent scale the power source reports (0 – 100).
    pub current_capacity: u64,
    /// Full-charge capacity, `None` when the source did not report one.
    pub max_capacity: Option<u64>,
    /// Design capacity in the same unit as `max_capacity`, when the source
    /// reports one.  Otherwise the configured mAh design capacity applies.
    pub design_capacity: Option<u64>,
    pub is_charging: bool,
}

impl PowerSource {
    /// Charge level clamped to `[0, 100]`.
    pub fn charge_percent(&self) -> f64 {
        (self.current_capacity as f64).clamp(0.0, 100.0)
    }

    /// Full-charge capacity relative to the design capacity.
    ///
    /// The reported design capacity wins over `fallback_design` (mAh).
    pub fn health_percent(&self, fallback_design: u64) -> Result<f64> {
        let max = self
            .max_capacity
            .ok_or_else(|| MeterError::query("battery health", "full-charge capacity unavailable"))?;
        let design = self.design_capacity.unwrap_or(fallback_design);
        if design == 0 {
            return Err(MeterError::query("battery health", "design capacity is zero"));
        }
        Ok(max as f64 * 100.0 / design as f64)
    }
}

/// Root of the Linux power-supply class.
pub const SYSFS_POWER_SUPPLY: &str = "/sys/class/power_supply";

/// Read battery state from the Linux sysfs power-supply interface.
///
/// Uses the first `BAT*` entry under `root`; a machine without a battery
/// (desktop, VM) reports a query failure.  Capacities are converted from
/// µAh / µWh to milli-units.  A charge-based battery may omit its design
/// file (the configured mAh value stands in); an energy-based one must
/// report `energy_full_design`, otherwise no full-charge capacity is given.
pub fn read_battery(root: &Path) -> Result<PowerSource> {
    for name in ["BAT0", "BAT1", "BAT2"] {
        let base = root.join(name);
        if !base.exists() {
            continue;
        }

        let read = |file: &str| -> Result<String> {
            std::fs::read_to_string(base.join(file))
                .map(|s| s.trim().to_string())
                .map_err(|e| MeterError::query("battery", format!("{name}/{file}: {e}")))
        };
        let milli = |file: &str| -> Option<u64> {
            read(file).ok()?.parse::<u64>().ok().map(|micro| micro / 1000)
        };

        let current_capacity = read("capacity")?
            .parse::<u64>()
            .map_err(|e| MeterError::query("battery", format!("{name}/capacity: {e}")))?;
        let is_charging = read("status")? == "Charging";

        let (max_capacity, design_capacity) = match milli("charge_full") {
            Some(full) => (Some(full), milli("charge_full_design")),
            None => match (milli("energy_full"), milli("energy_full_design")) {
                (Some(full), Some(design)) => (Some(full), Some(design)),
                _ => (None, None),
            },
        };

        return Ok(PowerSource {
            current_capacity,
            max_capacity,
            design_capacity,
            is_charging,
        });
    }

    Err(MeterError::query("battery", "no power source found"))
}

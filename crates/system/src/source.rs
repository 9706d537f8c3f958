use meter_config::{MeterConfig, ThermalConfig, ThermalSource};
use meter_core::{MeterError, Result};
use std::path::PathBuf;
use sysinfo::{Components, Networks, System};

use crate::{
    battery::{self, PowerSource},
    cpu::{self, CpuTicks},
    memory::{self, MemoryReading},
    network::{is_loopback, InterfaceCounters, NetworkUsage},
    simulate::Simulator,
};

/// Where a [`Sampler`](crate::Sampler) gets its raw readings from.
///
/// One fallible query per metric.  A failed query only affects its own
/// metric: the sampler keeps that metric's previous value and retries on the
/// next tick.
pub trait MetricsSource: Send + 'static {
    /// Cumulative CPU tick counters.
    fn cpu_ticks(&mut self) -> Result<CpuTicks>;

    fn memory(&mut self) -> Result<MemoryReading>;

    /// CPU temperature in °C.
    fn temperature(&mut self) -> Result<f64>;

    fn battery(&mut self) -> Result<PowerSource>;

    /// Today / week / month data volume.
    fn network_usage(&mut self) -> Result<NetworkUsage>;

    /// Cumulative interface byte counters, loopback excluded.
    fn interface_counters(&mut self) -> Result<InterfaceCounters>;

    /// Graphics load in percent.
    fn graphics_usage(&mut self) -> Result<f64>;
}

/// Readings from the machine we run on.
///
/// Metrics with no host counterpart (data volume buckets, graphics load and,
/// unless `thermal.source = "sensor"`, temperature) come from a [`Simulator`].
pub struct HostSource {
    system:       System,
    networks:     Networks,
    components:   Option<Components>,
    thermal:      ThermalConfig,
    power_supply: PathBuf,
    simulator:    Simulator,
}

impl HostSource {
    pub fn new(config: &MeterConfig) -> Self {
        let components = match config.thermal.source {
            ThermalSource::Sensor    => Some(Components::new_with_refreshed_list()),
            ThermalSource::Simulated => None,
        };

        Self {
            system:       System::new(),
            networks:     Networks::new_with_refreshed_list(),
            components,
            thermal:      config.thermal.clone(),
            power_supply: PathBuf::from(battery::SYSFS_POWER_SUPPLY),
            simulator:    Simulator::new(config.simulation.clone()),
        }
    }

    fn sensor_temperature(&mut self) -> Result<f64> {
        let Some(components) = self.components.as_mut() else {
            return Err(MeterError::query("temperature", "sensors not initialised"));
        };
        components.refresh(true);

        let wanted = self.thermal.sensor_label.as_deref().map(str::to_lowercase);
        components
            .iter()
            .filter(|c| match &wanted {
                Some(w) => c.label().to_lowercase().contains(w.as_str()),
                None => true,
            })
            .filter_map(|c| c.temperature())
            .filter(|t| t.is_finite())
            .fold(None, |hottest: Option<f32>, t| Some(hottest.map_or(t, |h| h.max(t))))
            .map(f64::from)
            .ok_or_else(|| MeterError::query("temperature", "no matching sensor reading"))
    }
}

impl MetricsSource for HostSource {
    fn cpu_ticks(&mut self) -> Result<CpuTicks> {
        cpu::read_cpu_ticks()
    }

    fn memory(&mut self) -> Result<MemoryReading> {
        let vm = memory::read_vm_statistics()?;
        self.system.refresh_memory();
        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return Err(MeterError::query("memory", "total memory reported as zero"));
        }
        Ok(MemoryReading::from_vm(&vm, total_bytes))
    }

    fn temperature(&mut self) -> Result<f64> {
        match self.thermal.source {
            ThermalSource::Simulated => Ok(self.simulator.temperature()),
            ThermalSource::Sensor    => self.sensor_temperature(),
        }
    }

    fn battery(&mut self) -> Result<PowerSource> {
        battery::read_battery(&self.power_supply)
    }

    fn network_usage(&mut self) -> Result<NetworkUsage> {
        Ok(self.simulator.network_usage())
    }

    fn interface_counters(&mut self) -> Result<InterfaceCounters> {
        self.networks.refresh(true);

        let counters = self
            .networks
            .iter()
            .filter(|(name, _)| !is_loopback(name))
            .fold(InterfaceCounters::default(), |acc, (_, data)| InterfaceCounters {
                received: acc.received.saturating_add(data.total_received()),
                sent:     acc.sent.saturating_add(data.total_transmitted()),
            });

        Ok(counters)
    }

    fn graphics_usage(&mut self) -> Result<f64> {
        Ok(self.simulator.graphics_usage())
    }
}

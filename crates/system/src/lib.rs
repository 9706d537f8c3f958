//! Metric acquisition for menumeter.
//!
//! [`MetricsSampler`] periodically pulls raw readings from a
//! [`MetricsSource`], normalises them into a [`MetricSample`] and keeps the
//! rolling histories the charts are drawn from.
//!
//! [`MetricSample`]: meter_core::MetricSample

pub mod alerts;
pub mod battery;
pub mod cpu;
pub mod memory;
pub mod network;
pub mod sampler;
pub mod simulate;
pub mod source;
pub mod speedtest;

pub use alerts::AlertMonitor;
pub use memory::format_bytes;
pub use sampler::{MetricsSampler, Sampler, SamplerSettings};
pub use simulate::Simulator;
pub use source::{HostSource, MetricsSource};
pub use speedtest::{SpeedTest, SpeedTestRunner};

use meter_config::MeterConfig;
use meter_core::{Published, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Build a sampler over the host's own readings and start it at the
/// configured interval.
///
/// The receiver is subscribed before the first tick, so it is notified of
/// every tick including the first.  Sampling stops when the returned
/// sampler is dropped.
pub fn spawn_monitor(
    config: &MeterConfig,
) -> Result<(MetricsSampler<HostSource>, watch::Receiver<Arc<Published>>)> {
    let sampler = MetricsSampler::new(HostSource::new(config), SamplerSettings::from(config));
    let rx = sampler.subscribe();
    sampler.start_secs(config.sampler.interval_secs)?;
    Ok((sampler, rx))
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

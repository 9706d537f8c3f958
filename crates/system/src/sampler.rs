//! Periodic metrics sampling and rolling-history publication.
//!
//! [`Sampler`] is the synchronous tick engine: one call to
//! [`Sampler::tick`] queries the source, folds the readings into the current
//! sample and appends to every history.  [`MetricsSampler`] drives a sampler
//! from a Tokio interval and publishes each completed tick as a whole
//! [`Published`] over a `watch` channel, so observers never see a tick that
//! is only half applied.

use meter_config::{CpuUsageMode, MeterConfig};
use meter_core::{MeterError, MetricKind, MetricSample, Published, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::{cpu::CpuUsage, lock, network::RateTracker, source::MetricsSource};

/// Knobs that shape how raw readings become published values.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerSettings {
    pub history_capacity: usize,
    pub cpu_usage:        CpuUsageMode,
    /// Battery design capacity used for the health figure (mAh).
    pub design_capacity:  u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self::from(&MeterConfig::default())
    }
}

impl From<&MeterConfig> for SamplerSettings {
    fn from(config: &MeterConfig) -> Self {
        Self {
            history_capacity: config.sampler.history_capacity,
            cpu_usage:        config.sampler.cpu_usage,
            design_capacity:  config.battery.design_capacity,
        }
    }
}

// ── Sampler ───────────────────────────────────────────────────────────────────

/// Turns source readings into samples and histories, one tick at a time.
pub struct Sampler<S> {
    source:   S,
    settings: SamplerSettings,
    cpu:      CpuUsage,
    rates:    RateTracker,
    state:    Published,
    failures: FailureLog,
}

impl<S: MetricsSource> Sampler<S> {
    pub fn new(source: S, settings: SamplerSettings) -> Self {
        Self {
            cpu:      CpuUsage::new(settings.cpu_usage),
            rates:    RateTracker::new(),
            state:    Published::new(settings.history_capacity),
            failures: FailureLog::default(),
            source,
            settings,
        }
    }

    /// State after the last completed tick.
    pub fn published(&self) -> &Published {
        &self.state
    }

    /// Take one sample and append it to every history.
    ///
    /// A metric whose query fails keeps its previous value, and that value
    /// is what goes into its history for this tick.
    pub fn tick(&mut self) -> &Published {
        let mut sample = self.state.sample.clone();

        // ── CPU ──────────────────────────────────────────────────────────────
        let ticks = self.source.cpu_ticks();
        if let Some(ticks) = self.failures.observe("cpu", ticks) {
            if let Some(usage) = self.cpu.update(ticks) {
                sample.cpu_usage_percent = usage.clamp(0.0, 100.0);
            }
        }

        // ── Memory ───────────────────────────────────────────────────────────
        let memory = self.source.memory().and_then(|m| {
            m.usage_percent()
                .map(|pct| (m, pct))
                .ok_or_else(|| MeterError::query("memory", "total memory is zero"))
        });
        if let Some((memory, usage)) = self.failures.observe("memory", memory) {
            sample.memory_used_bytes = memory.used_bytes;
            sample.memory_total_bytes = memory.total_bytes;
            sample.memory_usage_percent = usage.clamp(0.0, 100.0);
        }

        // ── Temperature ──────────────────────────────────────────────────────
        let temperature = self.source.temperature();
        if let Some(celsius) = self.failures.observe("temperature", temperature) {
            sample.cpu_temperature_celsius = celsius;
        }

        // ── Battery ──────────────────────────────────────────────────────────
        let battery = self.source.battery();
        if let Some(power) = self.failures.observe("battery", battery) {
            sample.battery_charge_percent = power.charge_percent();
            sample.battery_capacity = power.current_capacity;
            sample.battery_is_charging = power.is_charging;

            let health = power.health_percent(self.settings.design_capacity);
            if let Some(health) = self.failures.observe("battery health", health) {
                sample.battery_health_percent = health;
                sample.battery_max_capacity = power.max_capacity.unwrap_or_default();
            }
        }

        // ── Network ──────────────────────────────────────────────────────────
        let usage = self.source.network_usage();
        if let Some(usage) = self.failures.observe("network usage", usage) {
            sample.network_usage_today_bytes = usage.today;
            sample.network_usage_week_bytes = usage.week;
            sample.network_usage_month_bytes = usage.month;
        }

        let counters = self.source.interface_counters();
        if let Some(counters) = self.failures.observe("interfaces", counters) {
            let rate = self.rates.update(counters);
            sample.network_rx_rate = rate.rx;
            sample.network_tx_rate = rate.tx;
        }

        // ── Graphics ─────────────────────────────────────────────────────────
        let graphics = self.source.graphics_usage();
        if let Some(usage) = self.failures.observe("graphics", graphics) {
            sample.graphics_usage_percent = usage.clamp(0.0, 100.0);
        }

        self.state.histories.record(&sample);
        self.state.sample = sample;
        self.state.tick += 1;

        trace!(
            tick = self.state.tick,
            cpu = self.state.sample.cpu_usage_percent,
            memory = self.state.sample.memory_usage_percent,
            "sampled"
        );

        &self.state
    }
}

/// Tracks which queries are currently failing, so a persistent failure is
/// reported once rather than on every tick.
#[derive(Debug, Default)]
struct FailureLog {
    failing: HashSet<&'static str>,
}

impl FailureLog {
    fn observe<T>(&mut self, query: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                if self.failing.remove(query) {
                    info!("{query} readings recovered");
                }
                Some(value)
            }
            Err(e) => {
                if self.failing.insert(query) {
                    warn!("{e}; keeping previous {query} value");
                } else {
                    debug!("{e}");
                }
                None
            }
        }
    }
}

// ── MetricsSampler ────────────────────────────────────────────────────────────

struct Shared<S> {
    sampler:    Sampler<S>,
    tx:         watch::Sender<Arc<Published>>,
    /// Bumped by `stop`; a task whose generation is stale publishes nothing.
    generation: u64,
}

/// Owns a [`Sampler`] and the periodic task that drives it.
///
/// Observers read the latest [`Published`] state through
/// [`current_snapshot`](Self::current_snapshot), [`history`](Self::history)
/// or a [`subscribe`](Self::subscribe)d receiver; all of them see whole ticks
/// only.  The sampler task is the only writer.
pub struct MetricsSampler<S: MetricsSource> {
    shared: Arc<Mutex<Shared<S>>>,
    rx:     watch::Receiver<Arc<Published>>,
    task:   Mutex<Option<JoinHandle<()>>>,
}

impl<S: MetricsSource> MetricsSampler<S> {
    pub fn new(source: S, settings: SamplerSettings) -> Self {
        let sampler = Sampler::new(source, settings);
        let (tx, rx) = watch::channel(Arc::new(sampler.published().clone()));

        Self {
            shared: Arc::new(Mutex::new(Shared {
                sampler,
                tx,
                generation: 0,
            })),
            rx,
            task: Mutex::new(None),
        }
    }

    /// Begin sampling: one tick right away, then one every `interval`.
    ///
    /// Calling this while already running does nothing.  Must be called
    /// from within a Tokio runtime.
    pub fn start(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(MeterError::InvalidInterval(0.0));
        }

        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Sampler already running; ignoring start");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MeterError::System(format!("sampler needs a Tokio runtime: {e}")))?;

        let generation = lock(&self.shared).generation;
        let shared = Arc::clone(&self.shared);
        *task = Some(runtime.spawn(run(shared, generation, interval)));

        info!("Sampling every {:.2}s", interval.as_secs_f64());
        Ok(())
    }

    /// [`start`](Self::start) with the interval given in seconds.
    pub fn start_secs(&self, interval_secs: f64) -> Result<()> {
        if !(interval_secs.is_finite() && interval_secs > 0.0) {
            return Err(MeterError::InvalidInterval(interval_secs));
        }
        let interval = Duration::try_from_secs_f64(interval_secs)
            .map_err(|_| MeterError::InvalidInterval(interval_secs))?;
        self.start(interval)
    }

    /// Cancel the periodic task.  No tick is published after this returns.
    pub fn stop(&self) {
        let task = lock(&self.task).take();
        lock(&self.shared).generation += 1;

        if let Some(task) = task {
            task.abort();
            info!("Sampling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task).as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Values computed by the most recent tick.
    pub fn current_snapshot(&self) -> MetricSample {
        self.rx.borrow().sample.clone()
    }

    /// Rolling window for `kind`, oldest first.
    pub fn history(&self, kind: MetricKind) -> Vec<f64> {
        self.rx.borrow().history(kind)
    }

    /// The whole state published by the most recent tick.
    pub fn published(&self) -> Arc<Published> {
        Arc::clone(&self.rx.borrow())
    }

    /// A receiver that is notified once per completed tick.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Published>> {
        lock(&self.shared).tx.subscribe()
    }
}

impl<S: MetricsSource> Drop for MetricsSampler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<S: MetricsSource>(shared: Arc<Mutex<Shared<S>>>, generation: u64, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut guard = lock(&shared);
        if guard.generation != generation {
            break;
        }
        let published = Arc::new(guard.sampler.tick().clone());
        guard.tx.send_replace(published);
    }
}

//! Application loop for `menumeter`.
//!
//! Owns the event loop and wires together all background tasks:
//! - Metrics sampler (CPU, memory, temperature, battery, network, graphics)
//! - Config file watcher (live reload of alert thresholds)
//! - Simulated speed test (optional, on launch)
//! - Ctrl-C / shutdown signal
//!
//! Every task forwards into one [`Message`] channel; [`App::update`] is the
//! only place state changes, and may return follow-up messages (alerts).

pub mod render;

use anyhow::{Context, Result};
use meter_config::{default_path, load as load_config, MeterConfig};
use meter_core::{
    event::Message, MetricKind, Published, SpeedTestPhase, SpeedTestState,
};
use meter_system::{AlertMonitor, SpeedTestRunner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Width of the history sparklines written to the debug log.
const SPARKLINE_WIDTH: usize = 30;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Start sampling and run until Ctrl-C.
pub async fn run() -> Result<()> {
    let path = default_path();
    let config = load_config(&path).context("loading configuration")?;

    let (tx, mut rx) = mpsc::channel::<Message>(32);

    let (sampler, published) =
        meter_system::spawn_monitor(&config).context("starting the sampler")?;
    tokio::spawn(published_stream(published, tx.clone()));

    let (_watcher, reloads) = meter_config::ConfigWatcher::spawn(&path);
    tokio::spawn(config_stream(reloads, tx.clone()));

    let speed_test = SpeedTestRunner::new(
        Duration::from_millis(config.speed_test.step_ms.max(1)),
        config.simulation.seed,
    );
    tokio::spawn(speed_test_stream(speed_test.subscribe(), tx.clone()));
    if config.speed_test.run_on_start {
        speed_test.start().context("starting the speed test")?;
    }

    tokio::spawn(shutdown_stream(tx));

    let mut app = App::new(config, path);
    while let Some(message) = rx.recv().await {
        let mut pending = vec![message];
        while let Some(message) = pending.pop() {
            pending.extend(app.update(message));
        }
        if app.shutting_down {
            break;
        }
    }

    speed_test.cancel();
    sampler.stop();
    info!("menumeter stopped");
    Ok(())
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Headless observer of the sampler's published state.
pub struct App {
    config:        MeterConfig,
    config_path:   PathBuf,
    alerts:        AlertMonitor,
    speed_phase:   SpeedTestPhase,
    shutting_down: bool,
}

impl App {
    pub fn new(config: MeterConfig, config_path: PathBuf) -> Self {
        Self {
            alerts: AlertMonitor::new(config.alerts.clone()),
            config,
            config_path,
            speed_phase: SpeedTestPhase::Idle,
            shutting_down: false,
        }
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    pub fn alerts(&self) -> &AlertMonitor {
        &self.alerts
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    // ── Update ────────────────────────────────────────────────────────────────

    /// Apply one message; returns any follow-up messages.
    pub fn update(&mut self, message: Message) -> Vec<Message> {
        match message {
            Message::Published(published) => return self.on_published(&published),
            Message::Alert(alert) => warn!("{}", alert.message()),
            Message::SpeedTest(state) => self.on_speed_test(&state),
            Message::ConfigReloaded => self.reload_config(),
            Message::Shutdown => {
                info!("Shutdown requested");
                self.shutting_down = true;
            }
        }
        Vec::new()
    }

    fn on_published(&mut self, published: &Published) -> Vec<Message> {
        if published.tick == 0 {
            return Vec::new();
        }

        info!("{}", render::status_line(&published.sample));
        for kind in [MetricKind::Cpu, MetricKind::Memory, MetricKind::Temperature] {
            debug!(
                "{:<11} {}",
                kind.label(),
                render::history_line(published.histories.get(kind), SPARKLINE_WIDTH)
            );
        }

        self.alerts
            .check(&published.sample, Instant::now())
            .into_iter()
            .map(Message::Alert)
            .collect()
    }

    fn on_speed_test(&mut self, state: &SpeedTestState) {
        if state.phase == self.speed_phase {
            return;
        }
        self.speed_phase = state.phase;

        match state.phase {
            SpeedTestPhase::Completed => info!(
                "Speed test: {:.1} Mbps down, {:.1} Mbps up, ping {} ms",
                state.download_mbps, state.upload_mbps, state.ping_ms
            ),
            SpeedTestPhase::Failed => warn!("Speed test did not complete"),
            phase => debug!("Speed test phase: {phase:?}"),
        }
    }

    fn reload_config(&mut self) {
        match load_config(&self.config_path) {
            Ok(cfg) => {
                info!("Config reloaded");
                if cfg.sampler != self.config.sampler || cfg.thermal != self.config.thermal {
                    warn!("Sampler and thermal settings take effect after a restart");
                }
                self.alerts.set_config(cfg.alerts.clone());
                self.config = cfg;
            }
            Err(e) => warn!("Config reload failed: {e}"),
        }
    }
}

// ── Streams ───────────────────────────────────────────────────────────────────
//
// Each task forwards one source into the shared message channel and ends
// when either side goes away.

/// Forwards every tick the sampler publishes.
async fn published_stream(mut rx: watch::Receiver<Arc<Published>>, tx: mpsc::Sender<Message>) {
    while rx.changed().await.is_ok() {
        let published = Arc::clone(&rx.borrow_and_update());
        if tx.send(Message::Published(published)).await.is_err() {
            break;
        }
    }
}

/// Forwards speed test progress.
async fn speed_test_stream(mut rx: watch::Receiver<SpeedTestState>, tx: mpsc::Sender<Message>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if tx.send(Message::SpeedTest(state)).await.is_err() {
            break;
        }
    }
}

/// Turns config file writes into `ConfigReloaded`.
async fn config_stream(mut rx: mpsc::Receiver<()>, tx: mpsc::Sender<Message>) {
    while rx.recv().await.is_some() {
        if tx.send(Message::ConfigReloaded).await.is_err() {
            break;
        }
    }
}

async fn shutdown_stream(tx: mpsc::Sender<Message>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {e}");
        return;
    }
    let _ = tx.send(Message::Shutdown).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_config::AlertConfig;
    use meter_core::{AlertKind, MetricSample};

    fn published(tick: u64, cpu: f64, memory: f64) -> Message {
        let mut p = Published::new(60);
        p.tick = tick;
        p.sample = MetricSample {
            cpu_usage_percent:    cpu,
            memory_usage_percent: memory,
            ..MetricSample::default()
        };
        p.histories.record(&p.sample.clone());
        Message::Published(Arc::new(p))
    }

    fn app() -> App {
        App::new(MeterConfig::default(), PathBuf::from("/nonexistent/menumeter.toml"))
    }

    #[test]
    fn high_usage_emits_alert_messages() {
        let mut app = app();
        let follow_ups = app.update(published(1, 97.0, 85.0));

        let kinds: Vec<AlertKind> = follow_ups
            .iter()
            .map(|m| match m {
                Message::Alert(a) => a.kind,
                other => panic!("unexpected follow-up {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec![AlertKind::Cpu, AlertKind::Memory]);
        assert_eq!(app.alerts().history().count(), 2);

        // Alerts themselves produce nothing further.
        for message in follow_ups {
            assert!(app.update(message).is_empty());
        }
    }

    #[test]
    fn initial_state_is_not_checked() {
        let mut app = app();
        assert!(app.update(published(0, 100.0, 100.0)).is_empty());
    }

    #[test]
    fn shutdown_sets_flag() {
        let mut app = app();
        assert!(!app.is_shutting_down());
        app.update(Message::Shutdown);
        assert!(app.is_shutting_down());
    }

    #[test]
    fn reload_applies_new_thresholds() {
        let dir = std::env::temp_dir().join(format!("menumeter-app-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("menumeter.toml");

        let mut app = App::new(MeterConfig::default(), path.clone());
        assert!(app.update(published(1, 70.0, 0.0)).is_empty());

        std::fs::write(&path, "[alerts]\ncpu_threshold = 60.0\n").unwrap();
        app.update(Message::ConfigReloaded);
        assert_eq!(
            app.config().alerts,
            AlertConfig { cpu_threshold: 60.0, ..AlertConfig::default() }
        );
        assert_eq!(app.update(published(2, 70.0, 0.0)).len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_reload_keeps_previous_config() {
        let dir = std::env::temp_dir().join(format!("menumeter-app-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("menumeter.toml");
        std::fs::write(&path, "[sampler]\ninterval_secs = -2.0\n").unwrap();

        let mut app = App::new(MeterConfig::default(), path);
        app.update(Message::ConfigReloaded);
        assert_eq!(app.config(), &MeterConfig::default());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn published_stream_forwards_ticks() {
        let (watch_tx, watch_rx) = watch::channel(Arc::new(Published::new(4)));
        let (tx, mut rx) = mpsc::channel(4);
        let forwarder = tokio::spawn(published_stream(watch_rx, tx));

        let mut next = Published::new(4);
        next.tick = 1;
        watch_tx.send_replace(Arc::new(next));

        match rx.recv().await {
            Some(Message::Published(p)) => assert_eq!(p.tick, 1),
            other => panic!("unexpected {other:?}"),
        }

        drop(watch_tx);
        forwarder.await.unwrap();
    }
}

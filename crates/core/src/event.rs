use std::sync::Arc;

use crate::state::{Alert, Published, SpeedTestState};

/// All messages (events) that can flow through the application event bus.
///
/// Sources:
/// - Metrics sampler task  → `Published`
/// - Alert monitor         → `Alert`
/// - Speed test driver     → `SpeedTest`
/// - Config watcher task   → `ConfigReloaded`
/// - Signal handler        → `Shutdown`
#[derive(Debug, Clone)]
pub enum Message {
    // ── Metrics ───────────────────────────────────────────────────────────────
    /// A tick completed; carries the full published state.
    Published(Arc<Published>),
    /// A threshold was crossed.
    Alert(Alert),

    // ── Speed test ────────────────────────────────────────────────────────────
    /// The simulated speed test advanced.
    SpeedTest(SpeedTestState),

    // ── Config ────────────────────────────────────────────────────────────────
    /// Config file changed on disk; triggers a live reload.
    ConfigReloaded,

    // ── Internal ──────────────────────────────────────────────────────────────
    /// Graceful shutdown requested.
    Shutdown,
}

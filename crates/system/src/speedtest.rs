//! Simulated network speed test.
//!
//! A linear phase sequence (idle → ping → download → upload → completed)
//! with synthetic results.  No traffic is generated.

use meter_core::{MeterError, Result, SpeedTestPhase, SpeedTestResult, SpeedTestState};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::info;

use crate::lock;

/// Completed runs kept in the history.
pub const HISTORY_LIMIT: usize = 20;

/// The phase sequencer; one [`advance`](Self::advance) per step.
#[derive(Debug, Default)]
pub struct SpeedTest {
    state: SpeedTestState,
}

impl SpeedTest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SpeedTestState {
        &self.state
    }

    /// Begin a run.  Returns `false` (and changes nothing) if one is in progress.
    pub fn start(&mut self) -> bool {
        if self.state.running {
            return false;
        }
        self.state.running = true;
        self.state.phase = SpeedTestPhase::Idle;
        self.state.download_progress = 0.0;
        self.state.upload_progress = 0.0;
        true
    }

    /// Abort a run in progress; it ends as [`SpeedTestPhase::Failed`].
    pub fn cancel(&mut self) {
        if self.state.running {
            self.state.running = false;
            self.state.phase = SpeedTestPhase::Failed;
        }
    }

    /// Move the running test forward by one step.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> SpeedTestPhase {
        if !self.state.running {
            return self.state.phase;
        }

        let state = &mut self.state;
        match state.phase {
            SpeedTestPhase::Idle => state.phase = SpeedTestPhase::Ping,
            SpeedTestPhase::Ping => {
                state.ping_ms = rng.random_range(10..=80);
                state.download_progress = 0.0;
                state.phase = SpeedTestPhase::Download;
            }
            SpeedTestPhase::Download => {
                if step_progress(&mut state.download_progress, rng) {
                    state.download_mbps = rng.random_range(50.0..=300.0);
                    state.upload_progress = 0.0;
                    state.phase = SpeedTestPhase::Upload;
                }
            }
            SpeedTestPhase::Upload => {
                if step_progress(&mut state.upload_progress, rng) {
                    state.upload_mbps = rng.random_range(10.0..=60.0);
                    self.complete();
                }
            }
            SpeedTestPhase::Completed | SpeedTestPhase::Failed => state.running = false,
        }

        self.state.phase
    }

    fn complete(&mut self) {
        let state = &mut self.state;
        state.phase = SpeedTestPhase::Completed;
        state.running = false;
        state.history.push(SpeedTestResult {
            date:          chrono::Local::now(),
            download_mbps: state.download_mbps,
            upload_mbps:   state.upload_mbps,
            ping_ms:       state.ping_ms,
        });
        if state.history.len() > HISTORY_LIMIT {
            let excess = state.history.len() - HISTORY_LIMIT;
            state.history.drain(..excess);
        }
    }
}

/// Adds `0.05 + U[0, 0.02]`; returns `true` once the bar is full.
fn step_progress<R: Rng>(progress: &mut f64, rng: &mut R) -> bool {
    *progress += 0.05 + rng.random_range(0.0..=0.02);
    if *progress >= 1.0 {
        *progress = 1.0;
        return true;
    }
    false
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Runs [`SpeedTest`] steps on a Tokio interval and publishes the state.
pub struct SpeedTestRunner {
    test: Arc<Mutex<SpeedTest>>,
    tx:   Arc<watch::Sender<SpeedTestState>>,
    step: Duration,
    seed: Option<u64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SpeedTestRunner {
    /// `seed` fixes the synthetic results; `None` seeds from the OS.
    pub fn new(step: Duration, seed: Option<u64>) -> Self {
        let (tx, _) = watch::channel(SpeedTestState::default());
        Self {
            test: Arc::new(Mutex::new(SpeedTest::new())),
            tx: Arc::new(tx),
            step,
            seed,
            task: Mutex::new(None),
        }
    }

    /// Start a run in the background.  Returns `Ok(false)` if one is already going.
    pub fn start(&self) -> Result<bool> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MeterError::System(format!("speed test needs a Tokio runtime: {e}")))?;

        let mut task = lock(&self.task);
        {
            let mut test = lock(&self.test);
            if !test.start() {
                return Ok(false);
            }
            self.tx.send_replace(test.state().clone());
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        *task = Some(runtime.spawn(drive(
            Arc::clone(&self.test),
            Arc::clone(&self.tx),
            self.step,
            rng,
        )));

        info!("Speed test started");
        Ok(true)
    }

    pub fn cancel(&self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        let mut test = lock(&self.test);
        if test.state().running {
            test.cancel();
            self.tx.send_replace(test.state().clone());
            info!("Speed test cancelled");
        }
    }

    pub fn state(&self) -> SpeedTestState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeedTestState> {
        self.tx.subscribe()
    }
}

impl Drop for SpeedTestRunner {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

async fn drive(
    test: Arc<Mutex<SpeedTest>>,
    tx: Arc<watch::Sender<SpeedTestState>>,
    step: Duration,
    mut rng: StdRng,
) {
    let mut ticker = time::interval(step);
    // The first tick completes immediately; steps start one period in.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let state = {
            let mut test = lock(&test);
            test.advance(&mut rng);
            test.state().clone()
        };
        let done = !state.running;
        if done {
            info!(
                "Speed test finished: {:?}, {:.1} Mbps down, {:.1} Mbps up, {} ms",
                state.phase, state.download_mbps, state.upload_mbps, state.ping_ms
            );
        }
        tx.send_replace(state);
        if done {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(test: &mut SpeedTest, rng: &mut StdRng) -> Vec<SpeedTestPhase> {
        let mut phases = vec![test.state().phase];
        for _ in 0..100 {
            let phase = test.advance(rng);
            if phases.last() != Some(&phase) {
                phases.push(phase);
            }
            if !test.state().running {
                break;
            }
        }
        phases
    }

    #[test]
    fn phases_run_in_order() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut test = SpeedTest::new();
        assert!(test.start());

        let phases = run_to_end(&mut test, &mut rng);
        assert_eq!(
            phases,
            vec![
                SpeedTestPhase::Idle,
                SpeedTestPhase::Ping,
                SpeedTestPhase::Download,
                SpeedTestPhase::Upload,
                SpeedTestPhase::Completed,
            ]
        );

        let state = test.state();
        assert!(!state.running);
        assert_eq!(state.download_progress, 1.0);
        assert_eq!(state.upload_progress, 1.0);
        assert!((10..=80).contains(&state.ping_ms));
        assert!((50.0..=300.0).contains(&state.download_mbps));
        assert!((10.0..=60.0).contains(&state.upload_mbps));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].ping_ms, state.ping_ms);
    }

    #[test]
    fn start_is_not_reentrant() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut test = SpeedTest::new();
        assert!(test.start());
        test.advance(&mut rng);
        test.advance(&mut rng);
        assert_eq!(test.state().phase, SpeedTestPhase::Download);

        assert!(!test.start());
        assert_eq!(test.state().phase, SpeedTestPhase::Download);
    }

    #[test]
    fn cancel_fails_the_run_without_a_result() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut test = SpeedTest::new();
        test.start();
        test.advance(&mut rng);
        test.cancel();

        assert_eq!(test.state().phase, SpeedTestPhase::Failed);
        assert!(!test.state().running);
        assert!(test.state().history.is_empty());
        assert_eq!(test.advance(&mut rng), SpeedTestPhase::Failed);
    }

    #[test]
    fn history_keeps_last_twenty() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut test = SpeedTest::new();
        let mut pings = Vec::new();
        for _ in 0..25 {
            test.start();
            run_to_end(&mut test, &mut rng);
            pings.push(test.state().ping_ms);
        }

        let history = &test.state().history;
        assert_eq!(history.len(), HISTORY_LIMIT);
        let kept: Vec<u32> = history.iter().map(|r| r.ping_ms).collect();
        assert_eq!(kept, pings[5..]);
    }

    #[tokio::test(start_paused = true)]
    async fn runner_publishes_until_completion() {
        let runner = SpeedTestRunner::new(Duration::from_millis(250), Some(5));
        let mut rx = runner.subscribe();

        assert!(runner.start().unwrap());
        assert!(!runner.start().unwrap());

        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if !state.running {
                assert_eq!(state.phase, SpeedTestPhase::Completed);
                break;
            }
        }
        assert_eq!(runner.state().history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runner_cancel() {
        let runner = SpeedTestRunner::new(Duration::from_millis(250), Some(5));
        runner.start().unwrap();
        time::sleep(Duration::from_millis(600)).await;
        runner.cancel();

        assert_eq!(runner.state().phase, SpeedTestPhase::Failed);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runner.state().phase, SpeedTestPhase::Failed);
        assert!(runner.state().history.is_empty());
    }
}

use meter_config::AlertConfig;
use meter_core::{Alert, AlertKind, MetricSample};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Raises an [`Alert`] when CPU or memory usage crosses its threshold.
///
/// Each kind has its own cooldown so a sustained spike produces one alert
/// per cooldown period instead of one per tick.
#[derive(Debug)]
pub struct AlertMonitor {
    config:      AlertConfig,
    last_cpu:    Option<Instant>,
    last_memory: Option<Instant>,
    /// Newest first.
    history:     VecDeque<Alert>,
}

impl AlertMonitor {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            last_cpu:    None,
            last_memory: None,
            history:     VecDeque::new(),
        }
    }

    /// Apply reloaded thresholds.  Cooldowns already running are kept.
    pub fn set_config(&mut self, config: AlertConfig) {
        self.config = config;
        self.history.truncate(self.config.history_limit);
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Alerts raised so far, newest first.
    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter()
    }

    /// Compare `sample` against the thresholds and return any new alerts.
    pub fn check(&mut self, sample: &MetricSample, now: Instant) -> Vec<Alert> {
        if !self.config.enabled {
            return Vec::new();
        }

        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        let mut raised = Vec::new();

        for (kind, value, threshold) in [
            (AlertKind::Cpu, sample.cpu_usage_percent, self.config.cpu_threshold),
            (AlertKind::Memory, sample.memory_usage_percent, self.config.memory_threshold),
        ] {
            if value <= threshold {
                continue;
            }

            let last = match kind {
                AlertKind::Cpu    => &mut self.last_cpu,
                AlertKind::Memory => &mut self.last_memory,
            };
            let cooled = last.map_or(true, |at| now.saturating_duration_since(at) > cooldown);
            if !cooled {
                continue;
            }

            *last = Some(now);
            raised.push(Alert { kind, value, threshold, at: now });
        }

        for alert in &raised {
            self.history.push_front(alert.clone());
        }
        self.history.truncate(self.config.history_limit);

        raised
    }
}

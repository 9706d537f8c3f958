/// Data volume buckets (bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkUsage {
    pub today: u64,
    pub week:  u64,
    pub month: u64,
}

/// Cumulative bytes over every non-loopback interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub received: u64,
    pub sent:     u64,
}

/// Bytes moved since the previous reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkRate {
    pub rx: u64,
    pub tx: u64,
}

/// Derives per-tick rates from cumulative interface counters.
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    previous: Option<InterfaceCounters>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `current − previous`; the first reading has no baseline and yields zero.
    pub fn update(&mut self, current: InterfaceCounters) -> NetworkRate {
        match self.previous.replace(current) {
            None => NetworkRate::default(),
            Some(prev) => NetworkRate {
                rx: current.received.saturating_sub(prev.received),
                tx: current.sent.saturating_sub(prev.sent),
            },
        }
    }
}

/// Interface names that never carry external traffic.
pub fn is_loopback(name: &str) -> bool {
    name == "lo" || name.starts_with("lo0") || name.eq_ignore_ascii_case("loopback")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reading_has_zero_rate() {
        let mut rates = RateTracker::new();
        let rate = rates.update(InterfaceCounters { received: 5_000, sent: 1_000 });
        assert_eq!(rate, NetworkRate::default());
    }

    #[test]
    fn rate_is_difference_of_cumulative_counters() {
        let mut rates = RateTracker::new();
        rates.update(InterfaceCounters { received: 5_000, sent: 1_000 });
        let rate = rates.update(InterfaceCounters { received: 7_500, sent: 1_200 });
        assert_eq!(rate, NetworkRate { rx: 2_500, tx: 200 });
    }

    #[test]
    fn counter_reset_yields_zero_not_underflow() {
        let mut rates = RateTracker::new();
        rates.update(InterfaceCounters { received: 5_000, sent: 1_000 });
        let rate = rates.update(InterfaceCounters { received: 10, sent: 10 });
        assert_eq!(rate, NetworkRate::default());
    }

    #[test]
    fn loopback_names() {
        assert!(is_loopback("lo"));
        assert!(is_loopback("lo0"));
        assert!(!is_loopback("en0"));
        assert!(!is_loopback("wlan0"));
    }
}

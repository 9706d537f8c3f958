//! Plain-text rendering of a published tick for the log.

use meter_core::{MetricSample, RollingHistory};
use meter_system::format_bytes;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One-line summary of every metric in `sample`.
pub fn status_line(sample: &MetricSample) -> String {
    let battery = format!(
        "{} {:.0}%",
        battery_icon(sample.battery_charge_percent, sample.battery_is_charging),
        sample.battery_charge_percent
    );

    format!(
        "CPU {:.0}%  MEM {:.0}% ({}/{})  {:.0}°C  {battery} (health {:.0}%)  GPU {:.0}%  ↓{} ↑{}  today {}",
        sample.cpu_usage_percent,
        sample.memory_usage_percent,
        format_bytes(sample.memory_used_bytes),
        format_bytes(sample.memory_total_bytes),
        sample.cpu_temperature_celsius,
        sample.battery_health_percent,
        sample.graphics_usage_percent,
        format_rate(sample.network_rx_rate),
        format_rate(sample.network_tx_rate),
        format_bytes(sample.network_usage_today_bytes),
    )
}

/// The newest `width` history values as block characters, scaled to the
/// largest value in the whole history so every width shares one axis.
pub fn sparkline(history: &RollingHistory, width: usize) -> String {
    let skip = history.len().saturating_sub(width);
    let peak = history.max();

    history
        .iter()
        .skip(skip)
        .map(|v| {
            if peak <= 0.0 || !v.is_finite() {
                return BARS[0];
            }
            let level = (v.max(0.0) / peak * (BARS.len() - 1) as f64).round() as usize;
            BARS[level.min(BARS.len() - 1)]
        })
        .collect()
}

fn battery_icon(pct: f64, charging: bool) -> &'static str {
    if charging {
        return "⚡";
    }
    match pct {
        p if p >= 80.0 => "█",
        p if p >= 60.0 => "▊",
        p if p >= 40.0 => "▌",
        p if p >= 20.0 => "▎",
        _              => "▏",
    }
}

/// Sparkline followed by the window average, e.g. `▁▃█ avg 12.5`.
pub fn history_line(history: &RollingHistory, width: usize) -> String {
    format!("{} avg {:.1}", sparkline(history, width), history.average())
}

/// Bytes per tick as a compact string.
fn format_rate(bytes: u64) -> String {
    const MB: u64 = 1_000_000;
    const KB: u64 = 1_000;

    if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0}K", bytes as f64 / KB as f64)
    } else {
        format!("{bytes}B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparkline_scales_to_peak() {
        let mut history = RollingHistory::new(4);
        for v in [0.0, 50.0, 100.0, 25.0] {
            history.push(v);
        }
        assert_eq!(sparkline(&history, 4), "▁▅█▃");
    }

    #[test]
    fn sparkline_keeps_newest_values() {
        let mut history = RollingHistory::new(6);
        for v in [9.0, 9.0, 1.0, 2.0] {
            history.push(v);
        }
        assert_eq!(sparkline(&history, 2).chars().count(), 2);
        // Scaled against the 9.0 still in the history.
        assert_eq!(sparkline(&history, 2), "▂▃");
    }

    #[test]
    fn history_line_appends_average() {
        let mut history = RollingHistory::new(4);
        for v in [10.0, 20.0, 30.0, 40.0] {
            history.push(v);
        }
        assert_eq!(history_line(&history, 4), "▃▅▆█ avg 25.0");
    }

    #[test]
    fn all_zero_history_is_flat() {
        let history = RollingHistory::new(5);
        assert_eq!(sparkline(&history, 10), "▁▁▁▁▁");
    }

    #[test]
    fn status_line_mentions_every_metric() {
        let sample = MetricSample {
            cpu_usage_percent:         20.0,
            memory_usage_percent:      50.0,
            memory_used_bytes:         4 << 30,
            memory_total_bytes:        8 << 30,
            cpu_temperature_celsius:   55.4,
            battery_charge_percent:    87.0,
            battery_health_percent:    92.0,
            graphics_usage_percent:    12.0,
            network_rx_rate:           1_500,
            network_tx_rate:           200,
            network_usage_today_bytes: 400 << 20,
            ..MetricSample::default()
        };
        let line = status_line(&sample);

        assert!(line.starts_with("CPU 20%  MEM 50% (4.0 GiB/8.0 GiB)  55°C  █ 87%"));
        assert!(line.contains("health 92%"));
        assert!(line.contains("GPU 12%"));
        assert!(line.contains("↓2K ↑200B"));
        assert!(line.ends_with("today 400.0 MiB"));
    }

    #[test]
    fn charging_icon_wins() {
        assert_eq!(battery_icon(10.0, true), "⚡");
        assert_eq!(battery_icon(10.0, false), "▏");
        assert_eq!(battery_icon(65.0, false), "▊");
    }

    #[test]
    fn rates() {
        assert_eq!(format_rate(999), "999B");
        assert_eq!(format_rate(12_000), "12K");
        assert_eq!(format_rate(2_500_000), "2.5M");
    }
}

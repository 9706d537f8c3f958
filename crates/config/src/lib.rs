pub mod schema;
pub mod watcher;

pub use schema::{
    AlertConfig, BatteryConfig, CpuUsageMode, MeterConfig, Range, SamplerConfig,
    SimulationConfig, SpeedTestConfig, ThermalConfig, ThermalSource,
};
pub use watcher::ConfigWatcher;

use meter_core::{MeterError, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `MeterConfig::default()` if
/// the file doesn't exist so the monitor always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<MeterConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(MeterConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| MeterError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<MeterConfig> {
    let config: MeterConfig =
        toml::from_str(raw).map_err(|e| MeterError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Reject values the sampler cannot work with.
pub fn validate(config: &MeterConfig) -> Result<()> {
    let interval = config.sampler.interval_secs;
    if !(interval.is_finite() && interval > 0.0) {
        return Err(MeterError::InvalidInterval(interval));
    }
    if config.battery.design_capacity == 0 {
        return Err(MeterError::Config("battery.design_capacity must be non-zero".into()));
    }

    let sim = &config.simulation;
    for (name, range) in [
        ("temperature", sim.temperature),
        ("graphics", sim.graphics),
        ("network_today", sim.network_today),
        ("network_week", sim.network_week),
        ("network_month", sim.network_month),
    ] {
        if !range.is_valid() {
            return Err(MeterError::Config(format!(
                "simulation.{name}: invalid range {}..={}",
                range.min, range.max
            )));
        }
    }

    Ok(())
}

/// Return the default config path, honouring `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("menumeter").join("menumeter.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("menumeter-does-not-exist/menumeter.toml");
        let cfg = load(&path).unwrap();
        assert_eq!(cfg, MeterConfig::default());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = std::env::temp_dir().join(format!("menumeter-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("menumeter.toml");
        std::fs::write(&path, "[sampler]\ninterval_secs = 1.0\n").unwrap();

        let cfg = load(&path).unwrap();
        assert_eq!(cfg.sampler.interval_secs, 1.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_non_positive_interval() {
        let err = parse("[sampler]\ninterval_secs = 0.0\n").unwrap_err();
        assert!(matches!(err, MeterError::InvalidInterval(v) if v == 0.0));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = parse("[simulation]\ngraphics = { min = 50.0, max = 10.0 }\n").unwrap_err();
        assert!(matches!(err, MeterError::Config(msg) if msg.contains("graphics")));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(parse("[sampler"), Err(MeterError::Config(_))));
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = default_path();
        assert!(path.ends_with("menumeter/menumeter.toml"));
    }
}

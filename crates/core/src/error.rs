use thiserror::Error;

/// Top-level error type used across the entire application.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("config error: {0}")]
    Config(String),

    #[error("system error: {0}")]
    System(String),

    /// A single OS statistics call did not return success.
    ///
    /// The sampler swallows these per metric and keeps the previous value.
    #[error("{query} query failed: {reason}")]
    OsQuery {
        query:  &'static str,
        reason: String,
    },

    #[error("sampling interval must be positive, got {0}s")]
    InvalidInterval(f64),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MeterError {
    /// Shorthand for an [`MeterError::OsQuery`] failure.
    pub fn query(query: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::OsQuery {
            query,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = MeterError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_query_display_names_the_query() {
        let err = MeterError::query("battery", "no power source");
        assert_eq!(err.to_string(), "battery query failed: no power source");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MeterError = io.into();
        assert!(matches!(err, MeterError::Io { .. }));
    }
}

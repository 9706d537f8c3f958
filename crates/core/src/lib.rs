pub mod error;
pub mod event;
pub mod history;
pub mod state;

pub use error::{MeterError, Result};
pub use event::Message;
pub use history::{Histories, MetricKind, RollingHistory, DEFAULT_HISTORY_CAPACITY};
pub use state::{
    Alert, AlertKind, MetricSample, Published, SpeedTestPhase, SpeedTestResult, SpeedTestState,
};

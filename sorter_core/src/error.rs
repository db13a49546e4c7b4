use thiserror::Error;

/// Why the sweeper dropped into emergency stop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyCause {
    #[error("limit switch hit unexpectedly")]
    UnexpectedLimit,
    #[error("home switch not reached within the step budget")]
    HomingFailed,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SorterError {
    #[error("emergency stop: {0}")]
    EmergencyStop(EmergencyCause),
    #[error("sweeper move already in progress")]
    MoveInProgress,
    #[error("target position {target} outside [0, {max}]")]
    OutOfRange { target: i64, max: i32 },
    #[error("sweeper is not homed")]
    NotHomed,
    #[error("system is disabled")]
    Disabled,
    #[error("belt speed {speed} outside -{max}..={max}")]
    InvalidSpeed { speed: i8, max: i8 },
    #[error("a classification is already in flight")]
    VisionBusy,
    #[error("timeout waiting for classifier")]
    Timeout,
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("worker has shut down")]
    Shutdown,
}

impl SorterError {
    /// Emergency stops need an explicit `home()` to clear.
    pub fn is_emergency(&self) -> bool {
        matches!(self, SorterError::EmergencyStop(_))
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing belt drive")]
    MissingBelt,
    #[error("missing sweeper drive")]
    MissingSweeper,
    #[error("missing status lights")]
    MissingLights,
    #[error("missing vision link")]
    MissingVision,
    #[error("missing bin map")]
    MissingBins,
}

pub type Result<T> = std::result::Result<T, SorterError>;
pub use eyre::Report;

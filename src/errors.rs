use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BenchError {
    #[error("no samples to summarize")]
    EmptySample,
    #[error("incomplete window: expected {expected} samples, got {actual}")]
    IncompleteWindow { expected: usize, actual: usize },
    #[error("window overflow: capacity {capacity} already reached")]
    WindowOverflow { capacity: usize },
    #[error("subject setup error: {0}")]
    SubjectSetup(String),
    #[error("unit of work failed: {0}")]
    UnitOfWork(String),
    #[error("warmup did not stabilize after {windows} windows")]
    WarmupDidNotConverge { windows: usize },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

impl BenchError {
    pub fn setup<T: Into<String>>(msg: T) -> Self {
        BenchError::SubjectSetup(msg.into())
    }

    pub fn unit_of_work<T: Into<String>>(msg: T) -> Self {
        BenchError::UnitOfWork(msg.into())
    }

    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        BenchError::InvalidConfig(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        BenchError::Io(msg.into())
    }

    pub fn telemetry<T: Into<String>>(msg: T) -> Self {
        BenchError::Telemetry(msg.into())
    }
}

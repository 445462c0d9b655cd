//! Adaptive latency benchmark for SQL instrumentation wrappers over SQLite.
//! Run `cargo run --release --bin sqlinstr-bench -- --baseline` to compare every wrapper
//! against the uninstrumented connection.

pub mod attribute;
pub mod config;
pub mod db;
pub mod errors;
pub mod report;
pub mod runner;
pub mod stats;
pub mod subject;
pub mod suite;
pub mod telemetry;
pub mod warmup;
pub mod window;

pub use crate::config::{BenchConfig, DatabaseConfig, FailurePolicy};
pub use crate::errors::BenchError;
pub use crate::report::BenchReport;
pub use crate::runner::{BenchRunner, timed};
pub use crate::stats::{LatencySummary, mean, median, p99};
pub use crate::subject::{Subject, SubjectKind};
pub use crate::suite::{BenchSuite, SuiteOutcome};
pub use crate::telemetry::{TelemetryConfig, TelemetryGuard};
pub use crate::warmup::WarmupState;
pub use crate::window::SampleWindow;

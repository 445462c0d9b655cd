//! Runner, database and failure-handling configuration.
//!
//! Defaults reproduce the reference benchmark: windows of 200 calls, a 5%
//! tolerance over the last 3 window medians, and the canonical query limited
//! to 65536 rows.

use std::path::PathBuf;

use crate::errors::BenchError;

pub const DEFAULT_WINDOW_SIZE: usize = 200;
pub const DEFAULT_TOLERANCE: f64 = 0.05;
pub const DEFAULT_RECORD_SIZE: usize = 3;
pub const DEFAULT_MAX_WARMUP_WINDOWS: usize = 1_000;
pub const DEFAULT_ROW_LIMIT: i64 = 65_536;
pub const DEFAULT_SEED_ROWS: usize = 1_000;
pub const DEFAULT_CONTENT_LEN: usize = 64;
pub const DEFAULT_SEED: u64 = 0x5EED_0B5E;

/// Parameters of the adaptive measurement loop.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    /// Timed calls per window.
    pub window_size: usize,
    /// Relative spread allowed between the latest window median and the
    /// rest of the history.
    pub tolerance: f64,
    /// Number of window medians kept for the stability test.
    pub record_size: usize,
    /// Warmup windows allowed before giving up; `None` loops until stable.
    pub max_warmup_windows: Option<usize>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            tolerance: DEFAULT_TOLERANCE,
            record_size: DEFAULT_RECORD_SIZE,
            max_warmup_windows: Some(DEFAULT_MAX_WARMUP_WINDOWS),
        }
    }
}

impl BenchConfig {
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_record_size(mut self, record_size: usize) -> Self {
        self.record_size = record_size;
        self
    }

    pub fn with_max_warmup_windows(mut self, max: Option<usize>) -> Self {
        self.max_warmup_windows = max;
        self
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.window_size == 0 {
            return Err(BenchError::invalid_config("window size must be positive"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(BenchError::invalid_config(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        // K = 0 never stabilizes, so it is only usable with an escape hatch.
        if self.record_size == 0 && self.max_warmup_windows.is_none() {
            return Err(BenchError::invalid_config(
                "record size 0 can never stabilize without a warmup window limit",
            ));
        }
        if self.max_warmup_windows == Some(0) {
            return Err(BenchError::invalid_config(
                "max warmup windows must be positive when set",
            ));
        }
        Ok(())
    }
}

/// Where each subject's connection points and how the fixture is seeded.
#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    /// `None` opens a private in-memory database per subject.
    pub path: Option<PathBuf>,
    pub seed_rows: usize,
    pub content_len: usize,
    pub row_limit: i64,
    pub seed: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_rows: DEFAULT_SEED_ROWS,
            content_len: DEFAULT_CONTENT_LEN,
            row_limit: DEFAULT_ROW_LIMIT,
            seed: DEFAULT_SEED,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_seed_rows(mut self, rows: usize) -> Self {
        self.seed_rows = rows;
        self
    }

    pub fn with_row_limit(mut self, limit: i64) -> Self {
        self.row_limit = limit;
        self
    }

    /// Label used for the `db.namespace` span attribute.
    pub fn namespace(&self) -> String {
        match &self.path {
            Some(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            None => ":memory:".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.row_limit < 0 {
            return Err(BenchError::invalid_config(format!(
                "row limit must be non-negative, got {}",
                self.row_limit
            )));
        }
        Ok(())
    }
}

/// What the suite does when one subject fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the whole run on the first error.
    #[default]
    Abort,
    /// Log the failure, record it, and move on to the next subject.
    Isolate,
}

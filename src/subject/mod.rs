//! Instrumentation wrappers under test.
//!
//! Each subject owns its own `rusqlite::Connection` and runs the same unit
//! of work: begin, run [`CANONICAL_QUERY`](crate::db::CANONICAL_QUERY),
//! drain every row, commit.

use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

use crate::{config::DatabaseConfig, errors::BenchError};

pub mod counting;
pub mod plain;
pub mod redacting;
pub mod span_attrs;

pub use counting::CountingSubject;
pub use plain::PlainSubject;
pub use redacting::RedactingSubject;
pub use span_attrs::SpanAttrsSubject;

pub trait Subject {
    fn name(&self) -> &str;

    /// Runs one transaction around the canonical query and returns the number
    /// of rows drained.
    fn run_query(&mut self) -> Result<usize, BenchError>;

    fn timed_query(&mut self) -> Result<Duration, BenchError> {
        let start = Instant::now();
        self.run_query()?;
        Ok(start.elapsed())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Plain,
    Counting,
    SpanAttrs,
    Redacting,
}

impl SubjectKind {
    pub fn all() -> &'static [SubjectKind] {
        &[
            SubjectKind::Plain,
            SubjectKind::Counting,
            SubjectKind::SpanAttrs,
            SubjectKind::Redacting,
        ]
    }

    /// The wrappers compared by default, without the baseline.
    pub fn instrumented() -> &'static [SubjectKind] {
        &[
            SubjectKind::SpanAttrs,
            SubjectKind::Counting,
            SubjectKind::Redacting,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            SubjectKind::Plain => "plain",
            SubjectKind::Counting => "counting",
            SubjectKind::SpanAttrs => "span-attrs",
            SubjectKind::Redacting => "redacting",
        }
    }

    pub fn open(self, config: &DatabaseConfig) -> Result<Box<dyn Subject>, BenchError> {
        Ok(match self {
            SubjectKind::Plain => Box::new(PlainSubject::open(config)?),
            SubjectKind::Counting => Box::new(CountingSubject::open(config)?),
            SubjectKind::SpanAttrs => Box::new(SpanAttrsSubject::open(config)?),
            SubjectKind::Redacting => Box::new(RedactingSubject::open(config)?),
        })
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubjectKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubjectKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BenchError::invalid_config(format!("unknown subject {s}")))
    }
}

/// Runs `body` between `begin` and `commit`, rolling back if the body or the
/// commit fails.
pub(crate) fn with_transaction<T, B, Q, C, R>(
    begin: B,
    body: Q,
    commit: C,
    rollback: R,
) -> Result<T, BenchError>
where
    B: FnOnce() -> Result<(), BenchError>,
    Q: FnOnce() -> Result<T, BenchError>,
    C: FnOnce() -> Result<(), BenchError>,
    R: FnOnce(),
{
    begin()?;
    let result = body().and_then(|value| commit().map(|()| value));
    if result.is_err() {
        rollback();
    }
    result
}

pub(crate) fn uow(err: rusqlite::Error) -> BenchError {
    BenchError::unit_of_work(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in SubjectKind::all() {
            assert_eq!(kind.name().parse::<SubjectKind>().unwrap(), *kind);
        }
        assert!("mystery".parse::<SubjectKind>().is_err());
    }
}

use std::io::Write;

use tracing::{error, info};

use crate::{
    config::{DatabaseConfig, FailurePolicy},
    errors::BenchError,
    report::BenchReport,
    runner::BenchRunner,
    subject::{Subject, SubjectKind},
};

#[derive(Clone, Debug, PartialEq)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: BenchError,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuiteOutcome {
    pub reports: Vec<BenchReport>,
    pub failures: Vec<SubjectFailure>,
}

impl SuiteOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Benchmarks subjects strictly one after another. Each subject is opened
/// right before its turn and dropped right after it.
pub struct BenchSuite {
    runner: BenchRunner,
    database: DatabaseConfig,
    policy: FailurePolicy,
}

impl BenchSuite {
    pub fn new(runner: BenchRunner, database: DatabaseConfig, policy: FailurePolicy) -> Self {
        Self {
            runner,
            database,
            policy,
        }
    }

    pub fn runner(&self) -> &BenchRunner {
        &self.runner
    }

    pub fn run<W: Write>(&self, kinds: &[SubjectKind], out: &mut W) -> Result<SuiteOutcome, BenchError> {
        self.run_with(
            kinds.iter().map(|kind| {
                let kind = *kind;
                (kind.name().to_string(), move |db: &DatabaseConfig| kind.open(db))
            }),
            out,
        )
    }

    /// Same as [`run`](Self::run) but with caller-supplied constructors, each
    /// paired with the name used when it fails before producing a subject.
    pub fn run_with<I, F, W>(&self, openers: I, out: &mut W) -> Result<SuiteOutcome, BenchError>
    where
        I: IntoIterator<Item = (String, F)>,
        F: FnOnce(&DatabaseConfig) -> Result<Box<dyn Subject>, BenchError>,
        W: Write,
    {
        let mut outcome = SuiteOutcome::default();
        for (label, open) in openers {
            match self.run_one(open, out) {
                Ok(report) => outcome.reports.push(report),
                Err(err) => match self.policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Isolate => {
                        error!(subject = %label, "subject failed: {err}");
                        outcome.failures.push(SubjectFailure {
                            subject: label,
                            error: err,
                        });
                    }
                },
            }
        }
        info!(
            reports = outcome.reports.len(),
            failures = outcome.failures.len(),
            "suite finished"
        );
        Ok(outcome)
    }

    fn run_one<F, W>(&self, open: F, out: &mut W) -> Result<BenchReport, BenchError>
    where
        F: FnOnce(&DatabaseConfig) -> Result<Box<dyn Subject>, BenchError>,
        W: Write,
    {
        let mut subject = open(&self.database)?;
        let name = subject.name().to_string();
        self.runner
            .benchmark_subject(&name, || subject.timed_query(), out)
    }
}

use std::time::Duration;

use sqlinstr_bench::{
    BenchConfig, BenchError, BenchRunner, BenchSuite, DatabaseConfig, FailurePolicy, Subject,
    SubjectKind,
};

struct FixedSubject {
    name: &'static str,
    fail_on_call: Option<usize>,
    calls: usize,
}

impl Subject for FixedSubject {
    fn name(&self) -> &str {
        self.name
    }

    fn run_query(&mut self) -> Result<usize, BenchError> {
        self.calls += 1;
        if Some(self.calls) == self.fail_on_call {
            return Err(BenchError::unit_of_work("scan failed"));
        }
        Ok(1)
    }

    fn timed_query(&mut self) -> Result<Duration, BenchError> {
        self.run_query()?;
        Ok(Duration::from_micros(40))
    }
}

type Opener = Box<dyn FnOnce(&DatabaseConfig) -> Result<Box<dyn Subject>, BenchError>>;

fn fixed(name: &'static str, fail_on_call: Option<usize>) -> (String, Opener) {
    (
        name.to_string(),
        Box::new(
            move |_: &DatabaseConfig| -> Result<Box<dyn Subject>, BenchError> {
                Ok(Box::new(FixedSubject {
                    name,
                    fail_on_call,
                    calls: 0,
                }))
            },
        ),
    )
}

fn failing_setup(name: &'static str) -> (String, Opener) {
    (
        name.to_string(),
        Box::new(
            |_: &DatabaseConfig| -> Result<Box<dyn Subject>, BenchError> {
                Err(BenchError::setup("driver not registered"))
            },
        ),
    )
}

fn suite(policy: FailurePolicy) -> BenchSuite {
    let runner = BenchRunner::new(BenchConfig::default().with_window_size(4)).unwrap();
    BenchSuite::new(runner, DatabaseConfig::in_memory(), policy)
}

#[test]
fn test_abort_stops_at_first_failure() {
    let mut out = Vec::new();
    let result = suite(FailurePolicy::Abort).run_with(
        vec![fixed("a", None), fixed("b", Some(3)), fixed("c", None)],
        &mut out,
    );
    assert_eq!(result, Err(BenchError::unit_of_work("scan failed")));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("===a==="));
    assert!(text.contains("===b==="));
    assert!(!text.contains("===c==="));
}

#[test]
fn test_abort_on_setup_error() {
    let result = suite(FailurePolicy::Abort).run_with(
        vec![failing_setup("x"), fixed("a", None)],
        &mut Vec::new(),
    );
    assert_eq!(result, Err(BenchError::setup("driver not registered")));
}

#[test]
fn test_isolate_keeps_measuring_other_subjects() {
    let mut out = Vec::new();
    let outcome = suite(FailurePolicy::Isolate)
        .run_with(
            vec![
                fixed("a", None),
                failing_setup("x"),
                fixed("b", Some(1)),
                fixed("c", None),
            ],
            &mut out,
        )
        .unwrap();
    let names: Vec<&str> = outcome.reports.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(names, ["a", "c"]);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].subject, "x");
    assert_eq!(outcome.failures[1].subject, "b");
    assert!(!outcome.is_success());
    assert!(outcome.reports.iter().all(|r| r.p50 == Duration::from_micros(40)));
}

#[test]
fn test_run_real_subjects_sequentially() {
    let runner = BenchRunner::new(
        BenchConfig::default()
            .with_window_size(3)
            .with_tolerance(1_000.0)
            .with_max_warmup_windows(Some(50)),
    )
    .unwrap();
    let suite = BenchSuite::new(
        runner,
        DatabaseConfig::in_memory().with_seed_rows(10),
        FailurePolicy::Abort,
    );
    let mut out = Vec::new();
    let outcome = suite.run(SubjectKind::all(), &mut out).unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.reports.len(), SubjectKind::all().len());
    for (report, kind) in outcome.reports.iter().zip(SubjectKind::all()) {
        assert_eq!(report.subject, kind.name());
        assert_eq!(report.samples, 3);
        assert!(report.warmup_windows >= 3);
    }
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.matches("======\n").count(), SubjectKind::all().len());
}

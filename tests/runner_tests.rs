use std::{cell::Cell, time::Duration};

use sqlinstr_bench::{BenchConfig, BenchError, BenchRunner, SampleWindow, timed};

fn runner(window_size: usize) -> BenchRunner {
    BenchRunner::new(BenchConfig::default().with_window_size(window_size)).unwrap()
}

#[test]
fn test_constant_operation_stabilizes_after_record_size_windows() {
    let runner = runner(5);
    let d = Duration::from_micros(120);
    let calls = Cell::new(0usize);
    let mut op = || {
        calls.set(calls.get() + 1);
        Ok(d)
    };
    let mut state = runner.new_warmup_state();
    let windows = runner.run_warmup(&mut op, &mut state).unwrap();
    assert_eq!(windows, 3);
    assert_eq!(calls.get(), 15);
    assert!(state.is_stable());
}

#[test]
fn test_benchmark_subject_reports_constant_duration() {
    let runner = runner(5);
    let d = Duration::from_micros(120);
    let mut out = Vec::new();
    let report = runner.benchmark_subject("fake", || Ok(d), &mut out).unwrap();
    assert_eq!(report.p50, d);
    assert_eq!(report.p99, d);
    assert_eq!(report.mean, d);
    assert_eq!(report.warmup_windows, 3);
    assert_eq!(report.samples, 5);

    let text = String::from_utf8(out).unwrap();
    assert_eq!(
        text,
        "===fake===\np(50): 120µs\np(99): 120µs\navg: 120µs\n======\n"
    );
}

#[test]
fn test_benchmark_subject_is_repeatable() {
    let runner = runner(5);
    let d = Duration::from_nanos(987_654);
    let first = runner
        .benchmark_subject("fake", || Ok(d), &mut Vec::new())
        .unwrap();
    let second = runner
        .benchmark_subject("fake", || Ok(d), &mut Vec::new())
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_failing_operation_aborts_without_report() {
    let runner = runner(5);
    let calls = Cell::new(0usize);
    let mut out = Vec::new();
    let result = runner.benchmark_subject(
        "broken",
        || {
            calls.set(calls.get() + 1);
            if calls.get() == 7 {
                Err(BenchError::unit_of_work("commit failed"))
            } else {
                Ok(Duration::from_micros(10))
            }
        },
        &mut out,
    );
    assert_eq!(result, Err(BenchError::unit_of_work("commit failed")));
    assert_eq!(calls.get(), 7);
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "===broken===\n");
}

#[test]
fn test_warmup_escape_hatch_trips_on_oscillation() {
    let runner = BenchRunner::new(
        BenchConfig::default()
            .with_window_size(2)
            .with_max_warmup_windows(Some(10)),
    )
    .unwrap();
    let calls = Cell::new(0u64);
    let mut op = || {
        calls.set(calls.get() + 1);
        // Alternate the whole window between fast and slow.
        let window = (calls.get() - 1) / 2;
        Ok(if window % 2 == 0 {
            Duration::from_micros(10)
        } else {
            Duration::from_micros(50)
        })
    };
    let mut state = runner.new_warmup_state();
    let result = runner.run_warmup(&mut op, &mut state);
    assert_eq!(result, Err(BenchError::WarmupDidNotConverge { windows: 10 }));
    assert_eq!(state.observed(), 10);
}

#[test]
fn test_measurement_runs_exactly_one_window() {
    let runner = runner(9);
    let calls = Cell::new(0usize);
    let mut op = || {
        calls.set(calls.get() + 1);
        Ok(Duration::from_nanos(calls.get() as u64))
    };
    let samples = runner.run_measurement(&mut op).unwrap();
    assert_eq!(samples.len(), 9);
    assert_eq!(calls.get(), 9);
}

#[test]
fn test_timed_measures_real_work() {
    let mut op = timed(|| {
        std::thread::sleep(Duration::from_millis(2));
        Ok::<_, BenchError>(())
    });
    assert!(op().unwrap() >= Duration::from_millis(2));
}

#[test]
fn test_partial_window_is_rejected() {
    let mut window = SampleWindow::new(3);
    window.push(Duration::from_nanos(1)).unwrap();
    assert_eq!(
        window.clone().finish(),
        Err(BenchError::IncompleteWindow {
            expected: 3,
            actual: 1
        })
    );
    window.push(Duration::from_nanos(2)).unwrap();
    window.push(Duration::from_nanos(3)).unwrap();
    assert_eq!(
        window.push(Duration::from_nanos(4)),
        Err(BenchError::WindowOverflow { capacity: 3 })
    );
    assert_eq!(window.finish().unwrap().len(), 3);
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = BenchRunner::new(BenchConfig::default().with_window_size(0));
    assert!(matches!(result, Err(BenchError::InvalidConfig(_))));
}

use std::time::Duration;

use sqlinstr_bench::{
    BenchReport, LatencySummary,
    report::{export_json, load_json, overhead_against, write_overhead_table},
};

fn report(subject: &str, p50_us: u64, p99_us: u64, mean_us: u64) -> BenchReport {
    BenchReport::new(
        subject,
        LatencySummary {
            p50: Duration::from_micros(p50_us),
            p99: Duration::from_micros(p99_us),
            mean: Duration::from_micros(mean_us),
        },
        3,
        200,
    )
}

#[test]
fn test_display_matches_report_block() {
    let r = report("counting", 1_500, 2_000, 1_600);
    assert_eq!(r.to_string(), "p(50): 1.5ms\np(99): 2ms\navg: 1.6ms");
}

#[test]
fn test_overhead_relative_to_baseline() {
    let reports = vec![report("plain", 100, 200, 100), report("counting", 110, 300, 150)];
    let rows = overhead_against(&reports, "plain");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].p50_delta_pct, 0.0);
    assert!((rows[1].p50_delta_pct - 10.0).abs() < 1e-9);
    assert!((rows[1].p99_delta_pct - 50.0).abs() < 1e-9);
    assert!((rows[1].mean_delta_pct - 50.0).abs() < 1e-9);

    let mut out = Vec::new();
    write_overhead_table(&mut out, "plain", &rows).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("overhead vs plain\n"));
    assert!(text.contains("+10.00%"));
}

#[test]
fn test_overhead_without_baseline_is_empty() {
    let reports = vec![report("counting", 110, 300, 150)];
    let rows = overhead_against(&reports, "plain");
    assert!(rows.is_empty());
    let mut out = Vec::new();
    write_overhead_table(&mut out, "plain", &rows).unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_export_json_writes_nanosecond_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.json");
    export_json(&path, &[report("redacting", 7, 9, 8)]).unwrap();
    let records = load_json(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subject, "redacting");
    assert_eq!(records[0].p50_ns, 7_000);
    assert_eq!(records[0].p99_ns, 9_000);
    assert_eq!(records[0].mean_ns, 8_000);
    assert_eq!(records[0].samples, 200);
}

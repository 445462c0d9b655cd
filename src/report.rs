use std::{fmt, fs, io::Write, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{errors::BenchError, stats::LatencySummary};

pub const SEPARATOR: &str = "======";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchReport {
    pub subject: String,
    pub p50: Duration,
    pub p99: Duration,
    pub mean: Duration,
    pub warmup_windows: usize,
    pub samples: usize,
}

impl BenchReport {
    pub fn new(subject: &str, summary: LatencySummary, warmup_windows: usize, samples: usize) -> Self {
        Self {
            subject: subject.to_string(),
            p50: summary.p50,
            p99: summary.p99,
            mean: summary.mean,
            warmup_windows,
            samples,
        }
    }

    pub fn record(&self) -> ReportRecord {
        ReportRecord {
            subject: self.subject.clone(),
            p50_ns: nanos(self.p50),
            p99_ns: nanos(self.p99),
            mean_ns: nanos(self.mean),
            warmup_windows: self.warmup_windows,
            samples: self.samples,
        }
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p(50): {:?}\np(99): {:?}\navg: {:?}",
            self.p50, self.p99, self.mean
        )
    }
}

/// Flat, serializable form of a report with integer nanosecond fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportRecord {
    pub subject: String,
    pub p50_ns: u64,
    pub p99_ns: u64,
    pub mean_ns: u64,
    pub warmup_windows: usize,
    pub samples: usize,
}

pub fn write_header<W: Write>(out: &mut W, subject: &str) -> Result<(), BenchError> {
    writeln!(out, "==={subject}===").map_err(|e| BenchError::io(e.to_string()))
}

pub fn write_report<W: Write>(out: &mut W, report: &BenchReport) -> Result<(), BenchError> {
    writeln!(out, "{report}\n{SEPARATOR}").map_err(|e| BenchError::io(e.to_string()))
}

pub fn export_json(path: &Path, reports: &[BenchReport]) -> Result<(), BenchError> {
    let records: Vec<ReportRecord> = reports.iter().map(BenchReport::record).collect();
    let data =
        serde_json::to_vec_pretty(&records).map_err(|e| BenchError::io(e.to_string()))?;
    fs::write(path, data).map_err(|e| BenchError::io(format!("{}: {e}", path.display())))
}

pub fn load_json(path: &Path) -> Result<Vec<ReportRecord>, BenchError> {
    let data = fs::read(path).map_err(|e| BenchError::io(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&data).map_err(|e| BenchError::io(e.to_string()))
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverheadRow {
    pub subject: String,
    pub p50_delta_pct: f64,
    pub p99_delta_pct: f64,
    pub mean_delta_pct: f64,
}

/// Relative latency of every report against the `baseline` subject.
/// Empty when the baseline did not run.
pub fn overhead_against(reports: &[BenchReport], baseline: &str) -> Vec<OverheadRow> {
    let Some(base) = reports.iter().find(|r| r.subject == baseline) else {
        return Vec::new();
    };
    reports
        .iter()
        .map(|report| OverheadRow {
            subject: report.subject.clone(),
            p50_delta_pct: delta_pct(base.p50, report.p50),
            p99_delta_pct: delta_pct(base.p99, report.p99),
            mean_delta_pct: delta_pct(base.mean, report.mean),
        })
        .collect()
}

pub fn write_overhead_table<W: Write>(
    out: &mut W,
    baseline: &str,
    rows: &[OverheadRow],
) -> Result<(), BenchError> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut write = || -> std::io::Result<()> {
        writeln!(out, "overhead vs {baseline}")?;
        writeln!(out, "{:<14}{:>10}{:>10}{:>10}", "subject", "p(50)", "p(99)", "avg")?;
        for row in rows {
            writeln!(
                out,
                "{:<14}{:>+9.2}%{:>+9.2}%{:>+9.2}%",
                row.subject, row.p50_delta_pct, row.p99_delta_pct, row.mean_delta_pct
            )?;
        }
        writeln!(out, "{SEPARATOR}")
    };
    write().map_err(|e| BenchError::io(e.to_string()))
}

fn delta_pct(base: Duration, current: Duration) -> f64 {
    let base_ns = base.as_nanos() as f64;
    if base_ns == 0.0 {
        return 0.0;
    }
    (current.as_nanos() as f64 - base_ns) / base_ns * 100.0
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

use std::{
    io::{self, Write},
    path::PathBuf,
    process,
};

use clap::Parser;
use sqlinstr_bench::{
    BenchConfig, BenchError, BenchRunner, BenchSuite, DatabaseConfig, FailurePolicy, SubjectKind,
    TelemetryConfig, TelemetryGuard,
    config::{
        DEFAULT_MAX_WARMUP_WINDOWS, DEFAULT_RECORD_SIZE, DEFAULT_ROW_LIMIT, DEFAULT_SEED,
        DEFAULT_SEED_ROWS, DEFAULT_TOLERANCE, DEFAULT_WINDOW_SIZE,
    },
    report::{export_json, overhead_against, write_overhead_table},
};

#[derive(Parser, Debug)]
#[command(
    name = "sqlinstr-bench",
    about = "Compare SQL instrumentation wrappers by warmup-stabilized query latency"
)]
struct Cli {
    /// Timed queries per window.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// Relative spread allowed across the last window medians.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Number of window medians that must agree before measuring.
    #[arg(long, default_value_t = DEFAULT_RECORD_SIZE)]
    record_size: usize,

    /// Warmup windows allowed before giving up (0 = unbounded).
    #[arg(long, default_value_t = DEFAULT_MAX_WARMUP_WINDOWS)]
    max_warmup_windows: usize,

    /// Subjects to benchmark, in order (plain, counting, span-attrs, redacting).
    #[arg(long, value_delimiter = ',', default_value = "span-attrs,counting,redacting")]
    subjects: Vec<SubjectKind>,

    /// Run the uninstrumented `plain` subject first and print relative overhead.
    #[arg(long)]
    baseline: bool,

    /// SQLite file shared by all subjects; in-memory per subject when absent.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Rows seeded into `messages` when the table is empty.
    #[arg(long, default_value_t = DEFAULT_SEED_ROWS)]
    rows: usize,

    /// LIMIT bound to the canonical query.
    #[arg(long, default_value_t = DEFAULT_ROW_LIMIT)]
    row_limit: i64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Keep benchmarking the remaining subjects when one fails.
    #[arg(long)]
    keep_going: bool,

    /// Write the reports as JSON to this path.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Log filter directive (defaults to RUST_LOG, then `info`).
    #[arg(long)]
    log: Option<String>,

    /// Log every span close with its timing.
    #[arg(long)]
    span_events: bool,
}

impl Cli {
    fn bench_config(&self) -> BenchConfig {
        let max = (self.max_warmup_windows > 0).then_some(self.max_warmup_windows);
        BenchConfig::default()
            .with_window_size(self.window_size)
            .with_tolerance(self.tolerance)
            .with_record_size(self.record_size)
            .with_max_warmup_windows(max)
    }

    fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            path: self.db.clone(),
            seed_rows: self.rows,
            row_limit: self.row_limit,
            seed: self.seed,
            ..DatabaseConfig::default()
        }
    }

    fn subject_kinds(&self) -> Vec<SubjectKind> {
        let mut kinds = Vec::with_capacity(self.subjects.len() + 1);
        if self.baseline {
            kinds.push(SubjectKind::Plain);
        }
        for kind in &self.subjects {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}

fn main() {
    let cli = Cli::parse();
    let _telemetry = match TelemetryGuard::install(&TelemetryConfig {
        filter: cli.log.clone(),
        span_events: cli.span_events,
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err @ BenchError::InvalidConfig(_)) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<bool, BenchError> {
    let runner = BenchRunner::new(cli.bench_config())?;
    let database = cli.database_config();
    database.validate()?;
    let policy = if cli.keep_going {
        FailurePolicy::Isolate
    } else {
        FailurePolicy::Abort
    };
    let suite = BenchSuite::new(runner, database, policy);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = suite.run(&cli.subject_kinds(), &mut out)?;

    let baseline = SubjectKind::Plain.name();
    let rows = overhead_against(&outcome.reports, baseline);
    write_overhead_table(&mut out, baseline, &rows)?;
    out.flush().map_err(|e| BenchError::io(e.to_string()))?;

    if let Some(path) = &cli.export {
        export_json(path, &outcome.reports)?;
    }
    for failure in &outcome.failures {
        eprintln!("{} failed: {}", failure.subject, failure.error);
    }
    Ok(outcome.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_goes_first_without_duplicates() {
        let cli = Cli::parse_from(["sqlinstr-bench", "--baseline", "--subjects", "counting,plain"]);
        assert_eq!(
            cli.subject_kinds(),
            vec![SubjectKind::Plain, SubjectKind::Counting]
        );
    }

    #[test]
    fn test_zero_max_warmup_means_unbounded() {
        let cli = Cli::parse_from(["sqlinstr-bench", "--max-warmup-windows", "0"]);
        assert_eq!(cli.bench_config().max_warmup_windows, None);
    }
}

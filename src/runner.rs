use std::{
    io::Write,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

use crate::{
    config::BenchConfig,
    errors::BenchError,
    report::{BenchReport, write_header, write_report},
    stats::{LatencySummary, median},
    warmup::WarmupState,
    window::SampleWindow,
};

/// Wraps an untimed unit of work so each call reports its own wall time.
pub fn timed<F, T>(mut work: F) -> impl FnMut() -> Result<Duration, BenchError>
where
    F: FnMut() -> Result<T, BenchError>,
{
    move || {
        let start = Instant::now();
        work()?;
        Ok(start.elapsed())
    }
}

#[derive(Clone, Debug)]
pub struct BenchRunner {
    config: BenchConfig,
}

impl BenchRunner {
    pub fn new(config: BenchConfig) -> Result<Self, BenchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn new_warmup_state(&self) -> WarmupState {
        WarmupState::new(self.config.record_size, self.config.tolerance)
    }

    /// One full window of timed calls; the first failure aborts it.
    pub fn run_window<F>(&self, op: &mut F) -> Result<Vec<Duration>, BenchError>
    where
        F: FnMut() -> Result<Duration, BenchError>,
    {
        let mut window = SampleWindow::new(self.config.window_size);
        while !window.is_full() {
            window.push(op()?)?;
        }
        window.finish()
    }

    /// Repeats windows until `state` reports stability. Returns the number of
    /// warmup windows executed.
    pub fn run_warmup<F>(&self, op: &mut F, state: &mut WarmupState) -> Result<usize, BenchError>
    where
        F: FnMut() -> Result<Duration, BenchError>,
    {
        let mut windows = 0usize;
        while !state.is_stable() {
            if let Some(max) = self.config.max_warmup_windows {
                if windows >= max {
                    warn!(windows, "warmup did not stabilize");
                    return Err(BenchError::WarmupDidNotConverge { windows });
                }
            }
            let samples = self.run_window(op)?;
            let p50 = median(&samples)?;
            state.record(p50);
            windows += 1;
            debug!(window = windows, p50 = ?p50, "warmup window");
        }
        Ok(windows)
    }

    pub fn run_measurement<F>(&self, op: &mut F) -> Result<Vec<Duration>, BenchError>
    where
        F: FnMut() -> Result<Duration, BenchError>,
    {
        self.run_window(op)
    }

    /// Warmup to stability, one measured window, then the report block.
    pub fn benchmark_subject<F, W>(
        &self,
        name: &str,
        mut op: F,
        out: &mut W,
    ) -> Result<BenchReport, BenchError>
    where
        F: FnMut() -> Result<Duration, BenchError>,
        W: Write,
    {
        write_header(out, name)?;
        info!(subject = name, "warmup");
        let mut state = self.new_warmup_state();
        let warmup_windows = self.run_warmup(&mut op, &mut state)?;

        info!(subject = name, warmup_windows, "start bench");
        let samples = self.run_measurement(&mut op)?;
        let summary = LatencySummary::from_samples(&samples)?;
        let report = BenchReport::new(name, summary, warmup_windows, samples.len());
        write_report(out, &report)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_propagates_work_error() {
        let mut op = timed(|| -> Result<(), BenchError> { Err(BenchError::unit_of_work("boom")) });
        assert_eq!(op(), Err(BenchError::unit_of_work("boom")));
    }

    #[test]
    fn test_run_window_collects_exact_size() {
        let runner = BenchRunner::new(BenchConfig::default().with_window_size(7)).unwrap();
        let mut calls = 0u64;
        let mut op = || {
            calls += 1;
            Ok(Duration::from_nanos(calls))
        };
        let samples = runner.run_window(&mut op).unwrap();
        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0], Duration::from_nanos(1));
        assert_eq!(samples[6], Duration::from_nanos(7));
    }
}

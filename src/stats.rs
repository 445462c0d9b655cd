//! Latency statistics over a window of samples.
//!
//! Every function sorts a private copy, so callers can keep using the window
//! in invocation order afterwards.

use std::time::Duration;

use crate::errors::BenchError;

const P99_RANK: f64 = 0.99;

/// Median with upper-biased averaging for even lengths.
///
/// For an even count the two elements at `n/2` and `n/2 + 1` are averaged
/// rather than the textbook `n/2 - 1` and `n/2`. With two samples the upper
/// index falls off the end and is clamped to the last element.
pub fn median(samples: &[Duration]) -> Result<Duration, BenchError> {
    let sorted = sorted_copy(samples)?;
    let n = sorted.len();
    if n % 2 == 1 {
        return Ok(sorted[n / 2]);
    }
    let lo = sorted[n / 2];
    let hi = sorted[(n / 2 + 1).min(n - 1)];
    Ok(average_pair(lo, hi))
}

/// 99th percentile by linear interpolation between adjacent ranks.
pub fn p99(samples: &[Duration]) -> Result<Duration, BenchError> {
    let sorted = sorted_copy(samples)?;
    let n = sorted.len();
    let position = P99_RANK * (n - 1) as f64;
    let idx = position.floor() as usize;
    let frac = position - idx as f64;
    if idx + 1 < n {
        let lo = sorted[idx].as_nanos() as f64;
        let hi = sorted[idx + 1].as_nanos() as f64;
        let interpolated = lo + (hi - lo) * frac;
        return Ok(Duration::from_nanos(interpolated as u64));
    }
    Ok(sorted[idx])
}

/// Arithmetic mean with truncating integer nanosecond division.
pub fn mean(samples: &[Duration]) -> Result<Duration, BenchError> {
    if samples.is_empty() {
        return Err(BenchError::EmptySample);
    }
    let total: u128 = samples.iter().map(Duration::as_nanos).sum();
    let avg = total / samples.len() as u128;
    Ok(Duration::from_nanos(
        u64::try_from(avg).unwrap_or(u64::MAX),
    ))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p99: Duration,
    pub mean: Duration,
}

impl LatencySummary {
    pub fn from_samples(samples: &[Duration]) -> Result<Self, BenchError> {
        Ok(Self {
            p50: median(samples)?,
            p99: p99(samples)?,
            mean: mean(samples)?,
        })
    }
}

fn sorted_copy(samples: &[Duration]) -> Result<Vec<Duration>, BenchError> {
    if samples.is_empty() {
        return Err(BenchError::EmptySample);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    Ok(sorted)
}

fn average_pair(a: Duration, b: Duration) -> Duration {
    let sum = a.as_nanos() + b.as_nanos();
    Duration::from_nanos(u64::try_from(sum / 2).unwrap_or(u64::MAX))
}

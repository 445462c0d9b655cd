//! Warmup convergence detection over the last K window medians.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct WarmupState {
    p50s: Box<[Duration]>,
    cursor: usize,
    observed: usize,
    tolerance: f64,
}

impl WarmupState {
    pub fn new(record_size: usize, tolerance: f64) -> Self {
        Self {
            p50s: vec![Duration::ZERO; record_size].into_boxed_slice(),
            cursor: 0,
            observed: 0,
            tolerance,
        }
    }

    pub fn record(&mut self, p50: Duration) {
        self.observed += 1;
        if self.p50s.is_empty() {
            return;
        }
        self.p50s[self.cursor] = p50;
        self.cursor = (self.cursor + 1) % self.p50s.len();
    }

    /// True once the buffer has been filled and every entry is within
    /// `tolerance` (relative) of the most recently recorded median.
    pub fn is_stable(&self) -> bool {
        let Some(reference) = self.latest() else {
            return false;
        };
        if self.observed < self.p50s.len() {
            return false;
        }
        self.p50s
            .iter()
            .all(|value| relative_diff(reference, *value) <= self.tolerance)
    }

    /// Most recently recorded median, at slot `(cursor - 1) mod K`.
    pub fn latest(&self) -> Option<Duration> {
        let k = self.p50s.len();
        if k == 0 || self.observed == 0 {
            return None;
        }
        Some(self.p50s[(self.cursor + k - 1) % k])
    }

    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn capacity(&self) -> usize {
        self.p50s.len()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

// A zero reference only matches other zeros.
fn relative_diff(reference: Duration, value: Duration) -> f64 {
    let diff = reference.abs_diff(value);
    if diff.is_zero() {
        return 0.0;
    }
    if reference.is_zero() {
        return f64::INFINITY;
    }
    diff.as_nanos() as f64 / reference.as_nanos() as f64
}

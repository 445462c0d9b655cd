use std::time::Duration;

use crate::errors::BenchError;

/// Fixed-size batch of samples collected in invocation order.
#[derive(Clone, Debug)]
pub struct SampleWindow {
    capacity: usize,
    samples: Vec<Duration>,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: Duration) -> Result<(), BenchError> {
        if self.is_full() {
            return Err(BenchError::WindowOverflow {
                capacity: self.capacity,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Hands out the samples once exactly `capacity` have been collected.
    pub fn finish(self) -> Result<Vec<Duration>, BenchError> {
        if self.samples.len() != self.capacity {
            return Err(BenchError::IncompleteWindow {
                expected: self.capacity,
                actual: self.samples.len(),
            });
        }
        Ok(self.samples)
    }
}

//! Thread-safe FIFO of numeric samples.
//!
//! # Responsibilities
//! - Decouple the network worker from the computation side
//! - Keep every read-modify (size check + drain, append) under one lock hold
//!
//! # Design Decisions
//! - `std::sync::Mutex` around a `VecDeque<f64>`; nothing here ever blocks on I/O
//! - Poisoning is recovered: the queue holds plain numbers, a panicking holder
//!   cannot leave it half-updated in a way later callers would observe

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Double-ended queue of samples used first-in first-out.
#[derive(Debug, Default)]
pub struct FifoBuffer {
    inner: Mutex<VecDeque<f64>>,
}

impl FifoBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer pre-populated with `values`, oldest first.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self {
            inner: Mutex::new(values.into_iter().collect()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<f64>> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn push_back(&self, value: f64) {
        self.lock().push_back(value);
    }

    /// Append every value of `values` in order, under a single lock hold.
    pub fn extend_from_slice(&self, values: &[f64]) {
        self.lock().extend(values.iter().copied());
    }

    pub fn pop_front(&self) -> Option<f64> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Fill `out` from the front of the queue if enough values are buffered.
    ///
    /// Returns `false` and leaves the queue untouched when fewer than
    /// `out.len()` values are available.
    pub fn drain_front_into(&self, out: &mut [f64]) -> bool {
        let mut queue = self.lock();
        let wanted = out.len();
        if queue.len() < wanted {
            return false;
        }
        for (slot, value) in out.iter_mut().zip(queue.drain(..wanted)) {
            *slot = value;
        }
        true
    }

    /// Remove and return everything currently buffered.
    pub fn take_all(&self) -> Vec<f64> {
        self.lock().drain(..).collect()
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.lock().iter().copied().collect()
    }
}

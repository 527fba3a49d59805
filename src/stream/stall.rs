//! Consecutive no-progress counter.

/// Counts consecutive ticks that transferred nothing.
///
/// `record` reports exhaustion on the `limit`-th consecutive stall; any
/// successful transfer calls `reset`.
#[derive(Debug, Clone, Copy)]
pub struct StallCounter {
    count: u32,
    limit: u32,
}

impl StallCounter {
    pub fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    /// Record one stall. Returns `true` once the ceiling is reached.
    pub fn record(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count >= self.limit
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

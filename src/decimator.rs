//! Windowed sampling of the global totals
//!
//! Every `window` terminated basic blocks the decimator yields the change in
//! the global totals since its previous sample. Only the previous snapshot is
//! kept, so each sample costs one field-wise subtraction.

use crate::counters::CounterSet;

#[derive(Debug, Clone)]
pub struct Decimator {
    window: u64,
    pending: u64,
    previous: CounterSet,
    header_shown: bool,
}

impl Decimator {
    /// Create a decimator emitting one sample per `window` blocks (at least 1)
    pub fn new(window: u64) -> Self {
        Decimator {
            window: window.max(1),
            pending: 0,
            previous: CounterSet::new(),
            header_shown: false,
        }
    }

    /// Count one terminated block; return the delta when the window fills
    pub fn record_block(&mut self, totals: &CounterSet) -> Option<CounterSet> {
        self.pending += 1;
        if self.pending < self.window {
            return None;
        }
        Some(self.advance(totals))
    }

    /// Delta for a partially filled window, if any blocks are pending
    pub fn flush(&mut self, totals: &CounterSet) -> Option<CounterSet> {
        if self.pending == 0 {
            return None;
        }
        Some(self.advance(totals))
    }

    fn advance(&mut self, totals: &CounterSet) -> CounterSet {
        let delta = totals.difference(&self.previous);
        self.previous = *totals;
        self.pending = 0;
        delta
    }

    /// True exactly once, for the caller that should print the header
    pub fn take_header(&mut self) -> bool {
        !std::mem::replace(&mut self.header_shown, true)
    }

    /// Blocks counted toward the current window
    pub fn pending(&self) -> u64 {
        self.pending
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    /// Global totals as of the last sample
    pub fn previous(&self) -> &CounterSet {
        &self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(flops: u64, blocks: u64) -> CounterSet {
        CounterSet {
            flops,
            basic_blocks: blocks,
            ..CounterSet::default()
        }
    }

    #[test]
    fn test_window_of_one_samples_every_block() {
        let mut decimator = Decimator::new(1);
        let delta = decimator.record_block(&totals(5, 1)).unwrap();
        assert_eq!(delta.flops, 5);
        let delta = decimator.record_block(&totals(8, 2)).unwrap();
        assert_eq!(delta.flops, 3);
        assert_eq!(delta.basic_blocks, 1);
    }

    #[test]
    fn test_zero_window_acts_as_one() {
        let decimator = Decimator::new(0);
        assert_eq!(decimator.window(), 1);
    }

    #[test]
    fn test_samples_after_window_fills() {
        let mut decimator = Decimator::new(2);
        assert!(decimator.record_block(&totals(1, 1)).is_none());
        assert_eq!(decimator.pending(), 1);

        let delta = decimator.record_block(&totals(3, 2)).unwrap();
        assert_eq!(delta.flops, 3);
        assert_eq!(decimator.pending(), 0);
        assert_eq!(decimator.previous(), &totals(3, 2));
    }

    #[test]
    fn test_flush_partial_window() {
        let mut decimator = Decimator::new(2);
        decimator.record_block(&totals(1, 1));
        decimator.record_block(&totals(2, 2));
        assert!(decimator.record_block(&totals(7, 3)).is_none());

        let delta = decimator.flush(&totals(7, 3)).unwrap();
        assert_eq!(delta.flops, 5);
        assert_eq!(delta.basic_blocks, 1);
        assert!(decimator.flush(&totals(7, 3)).is_none());
    }

    #[test]
    fn test_header_taken_once() {
        let mut decimator = Decimator::new(4);
        assert!(decimator.take_header());
        assert!(!decimator.take_header());
    }
}

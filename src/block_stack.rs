//! Per-thread stack of open basic-block frames
//!
//! One frame exists per active call depth. A caller flushes its partial block
//! into its own frame before the call, the callee works in a fresh frame, and
//! the caller's frame is untouched until control returns to it.

use crate::counters::{BlockEnd, CounterSet};
use crate::pool::{CounterPool, Frame, PoolStats};
use crate::tally::Tally;

/// LIFO stack of pooled counter sets
///
/// The stack always holds at least one frame, the program's outermost block,
/// so there is always a top to flush into.
#[derive(Debug)]
pub struct BlockStack {
    frames: Vec<Frame>,
    pool: CounterPool,
}

impl Default for BlockStack {
    fn default() -> Self {
        Self::new(CounterPool::default())
    }
}

impl BlockStack {
    /// Create a stack holding the outermost frame
    pub fn new(mut pool: CounterPool) -> Self {
        let base = pool.allocate();
        BlockStack {
            frames: vec![base],
            pool,
        }
    }

    /// Open a new frame before entering a callee
    pub fn push(&mut self) {
        let frame = self.pool.allocate();
        self.frames.push(frame);
    }

    /// Discard the top frame after the callee returns
    ///
    /// Popping the outermost frame zeroes it in place instead.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                self.pool.deallocate(frame);
            }
        } else {
            self.reset_top();
        }
    }

    /// Zero the top frame without pushing or popping
    pub fn reset_top(&mut self) {
        self.top_mut().reset();
    }

    /// Move the thread's tally into the top frame and zero the tally
    pub fn flush(&mut self, tally: &mut Tally, end: BlockEnd) -> &CounterSet {
        let pending = tally.take();
        let top = self.top_mut();
        top.accumulate_tally(&pending, end);
        top
    }

    /// The innermost open frame
    pub fn top(&self) -> &CounterSet {
        // The base frame is never removed.
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut CounterSet {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Number of open frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Statistics of the backing pool
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::OperandType;
    use crate::pool::PoolConfig;

    fn tally_with_load(bytes: u64) -> Tally {
        let mut tally = Tally::default();
        tally.record_load(bytes, OperandType::Int64);
        tally
    }

    #[test]
    fn test_new_stack_has_base_frame() {
        let stack = BlockStack::default();
        assert_eq!(stack.depth(), 1);
        assert!(stack.top().is_zero());
    }

    #[test]
    fn test_flush_moves_tally_into_top() {
        let mut stack = BlockStack::default();
        let mut tally = tally_with_load(8);

        let top = stack.flush(&mut tally, BlockEnd::NotEnd);
        assert_eq!(top.loads, 8);
        assert_eq!(top.basic_blocks, 0);
        assert!(tally.is_zero());
    }

    #[test]
    fn test_callee_frame_does_not_touch_caller() {
        let mut stack = BlockStack::default();
        let mut tally = tally_with_load(8);
        stack.flush(&mut tally, BlockEnd::NotEnd);

        stack.push();
        let mut callee_tally = tally_with_load(100);
        stack.flush(&mut callee_tally, BlockEnd::Unconditional);
        assert_eq!(stack.top().loads, 100);

        stack.pop();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top().loads, 8);
    }

    #[test]
    fn test_reset_top() {
        let mut stack = BlockStack::default();
        let mut tally = tally_with_load(16);
        stack.flush(&mut tally, BlockEnd::Conditional);

        stack.reset_top();
        assert!(stack.top().is_zero());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_pop_base_frame_resets_it() {
        let mut stack = BlockStack::default();
        let mut tally = tally_with_load(4);
        stack.flush(&mut tally, BlockEnd::NotEnd);

        stack.pop();
        assert_eq!(stack.depth(), 1);
        assert!(stack.top().is_zero());
    }

    #[test]
    fn test_frames_are_recycled() {
        let mut stack = BlockStack::new(CounterPool::new(PoolConfig::new(1)));
        for _ in 0..100 {
            stack.push();
            stack.pop();
        }
        let stats = stack.pool_stats();
        // Base frame took the one preallocated frame; the first push missed
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.acquired, 101);
    }
}

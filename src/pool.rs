//! Recycling allocator for counter sets
//!
//! Every call depth needs its own open-block [`CounterSet`]. Frames are pushed
//! before a call and popped after it returns, millions of times per second in
//! call-heavy programs, so frames come from a free list instead of the heap.
//! Misses only happen when the call stack reaches a new peak depth.

use crate::counters::CounterSet;

/// A counter set on loan from a [`CounterPool`]
pub type Frame = Box<CounterSet>;

/// Configuration for the counter pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Frames preallocated up front
    pub capacity: usize,
    /// Whether pooling is enabled
    pub enabled: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            capacity: 16,
            enabled: true,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration
    pub fn new(capacity: usize) -> Self {
        PoolConfig {
            capacity,
            enabled: true,
        }
    }

    /// Disable pooling (for debugging)
    pub fn disabled() -> Self {
        PoolConfig {
            capacity: 0,
            enabled: false,
        }
    }
}

/// Free list of counter sets
#[derive(Debug)]
pub struct CounterPool {
    free: Vec<Frame>,
    config: PoolConfig,
    allocated: usize,
    acquired: usize,
}

impl Default for CounterPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl CounterPool {
    /// Create a new counter pool with the given configuration
    ///
    /// A disabled pool preallocates nothing, whatever its capacity says.
    pub fn new(mut config: PoolConfig) -> Self {
        if !config.enabled {
            config.capacity = 0;
        }
        let mut free = Vec::with_capacity(config.capacity);

        if config.enabled {
            for _ in 0..config.capacity {
                free.push(Box::default());
            }
        }

        CounterPool {
            allocated: free.len(),
            free,
            config,
            acquired: 0,
        }
    }

    /// Take a zeroed counter set, reusing a released one when possible
    pub fn allocate(&mut self) -> Frame {
        self.acquired += 1;

        if self.config.enabled {
            if let Some(mut frame) = self.free.pop() {
                frame.reset();
                return frame;
            }
        }

        self.allocated += 1;
        tracing::trace!(allocated = self.allocated, "counter pool miss");
        Box::default()
    }

    /// Return a counter set to the free list
    ///
    /// If pooling is disabled, the frame is simply dropped.
    pub fn deallocate(&mut self, frame: Frame) {
        if self.config.enabled {
            self.free.push(frame);
        }
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.config.capacity,
            available: self.free.len(),
            allocated: self.allocated,
            acquired: self.acquired,
            enabled: self.config.enabled,
        }
    }

    /// Check if the pool is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Number of frames sitting on the free list
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

/// Pool statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Frames preallocated up front
    pub capacity: usize,
    /// Frames on the free list
    pub available: usize,
    /// Total frames ever constructed (preallocated plus misses)
    pub allocated: usize,
    /// Total allocate operations
    pub acquired: usize,
    /// Whether pooling is enabled
    pub enabled: bool,
}

impl PoolStats {
    /// Allocations that had to construct a new frame
    pub fn misses(&self) -> usize {
        self.allocated.saturating_sub(self.capacity)
    }

    /// Percentage of allocate operations served from the free list
    pub fn hit_rate(&self) -> f64 {
        if self.acquired == 0 {
            return 0.0;
        }
        let hits = self.acquired.saturating_sub(self.misses());
        (hits as f64 / self.acquired as f64) * 100.0
    }
}

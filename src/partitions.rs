//! User-defined partitions of basic blocks
//!
//! A categorization hook is consulted once per terminating basic block. When
//! it names a tag, the finished block's counters are added to that tag's
//! totals, which are reported next to the global totals.

use crate::counters::CounterSet;
use crate::symbols::{Symbol, SymbolTable};
use fnv::FnvHashMap;

/// Hook that assigns the block being finalized to a partition
///
/// Implementations run inside the engine on the instrumented thread and must
/// not call back into the engine from the same thread.
pub trait Categorize: Send + Sync {
    /// Tag for the current block, or `None` to leave it unpartitioned
    fn categorize(&self) -> Option<&str>;
}

/// Default hook: no block belongs to any partition
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCategories;

impl Categorize for NoCategories {
    fn categorize(&self) -> Option<&str> {
        None
    }
}

impl<F> Categorize for F
where
    F: Fn() -> Option<&'static str> + Send + Sync,
{
    fn categorize(&self) -> Option<&str> {
        self()
    }
}

/// Counter totals per partition tag
#[derive(Debug, Default)]
pub struct PartitionTable {
    totals: FnvHashMap<Symbol, CounterSet>,
}

impl PartitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finished block to the partition `tag`, creating it on first use
    pub fn accumulate(&mut self, tag: Symbol, block: &CounterSet) {
        self.totals.entry(tag).or_default().accumulate(block);
    }

    pub fn get(&self, tag: Symbol) -> Option<&CounterSet> {
        self.totals.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// All partitions sorted by tag
    pub fn sorted<'a>(&'a self, symbols: &'a SymbolTable) -> Vec<(&'a str, &'a CounterSet)> {
        let mut rows: Vec<_> = self
            .totals
            .iter()
            .map(|(&tag, totals)| (symbols.resolve(tag), totals))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }
}

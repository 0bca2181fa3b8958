//! Per-function attribution
//!
//! Counters are attributed to an attribution key: the bare function name, or
//! with call-stack attribution the function plus its live ancestors. Calls are
//! tallied separately by bare callee name, which also covers callees that were
//! never instrumented themselves.

use crate::counters::{BlockEnd, CounterSet};
use crate::symbols::{Symbol, SymbolTable};
use crate::tally::Tally;
use fnv::{FnvHashMap, FnvHashSet};

/// Accumulated counters and entry count for one attribution key
#[derive(Debug, Clone, Default)]
pub struct FunctionRecord {
    /// Counters attributed to this key
    pub counters: CounterSet,
    /// Number of times the key was entered
    pub invocations: u64,
    /// Whether any counters were ever attributed to this key
    pub tallied: bool,
}

/// One row of the callee report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalleeRow<'a> {
    pub name: &'a str,
    pub calls: u64,
    /// Whether the callee itself was ever entered through instrumentation
    pub instrumented: bool,
}

/// Tracks function-level counters and invocation tallies
#[derive(Debug, Default)]
pub struct FunctionTable {
    records: FnvHashMap<Symbol, FunctionRecord>,
    calls: FnvHashMap<Symbol, u64>,
    instrumented: FnvHashSet<Symbol>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute a thread's pending tallies to `key`
    pub fn assoc(&mut self, key: Symbol, tally: &Tally, end: BlockEnd) {
        let record = self.records.entry(key).or_default();
        record.counters.accumulate_tally(tally, end);
        record.tallied = true;
    }

    /// Record that instrumented `function` was entered under attribution `key`
    pub fn record_entry(&mut self, key: Symbol, function: Symbol) {
        let record = self.records.entry(key).or_default();
        record.invocations += 1;
        self.instrumented.insert(function);
    }

    /// Bump the call tally of a callee, instrumented or not
    pub fn incr_invocation(&mut self, function: Symbol) {
        *self.calls.entry(function).or_default() += 1;
    }

    pub fn record(&self, key: Symbol) -> Option<&FunctionRecord> {
        self.records.get(&key)
    }

    /// Entry count of an attribution key
    pub fn invocations(&self, key: Symbol) -> u64 {
        self.records.get(&key).map_or(0, |r| r.invocations)
    }

    /// Call tally of a bare callee name
    pub fn call_tally(&self, function: Symbol) -> u64 {
        self.calls.get(&function).copied().unwrap_or(0)
    }

    pub fn is_instrumented(&self, function: Symbol) -> bool {
        self.instrumented.contains(&function)
    }

    /// Sum of all attributed counters
    pub fn total(&self) -> CounterSet {
        let mut total = CounterSet::new();
        for record in self.records.values() {
            total.accumulate(&record.counters);
        }
        total
    }

    /// Records that received counters, sorted by attribution key
    pub fn sorted_records<'a>(
        &'a self,
        symbols: &'a SymbolTable,
    ) -> Vec<(&'a str, &'a FunctionRecord)> {
        let mut rows: Vec<_> = self
            .records
            .iter()
            .filter(|(_, record)| record.tallied)
            .map(|(&key, record)| (symbols.resolve(key), record))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(b.0));
        rows
    }

    /// Callees with a non-zero tally, most-called first, ties by name
    pub fn sorted_callees<'a>(&'a self, symbols: &'a SymbolTable) -> Vec<CalleeRow<'a>> {
        let mut rows: Vec<_> = self
            .calls
            .iter()
            .filter(|(_, calls)| **calls > 0)
            .map(|(&function, &calls)| CalleeRow {
                name: symbols.resolve(function),
                calls,
                instrumented: self.instrumented.contains(&function),
            })
            .collect();
        rows.sort_by(|a, b| b.calls.cmp(&a.calls).then_with(|| a.name.cmp(b.name)));
        rows
    }
}

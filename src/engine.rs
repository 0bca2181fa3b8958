//! The counter engine
//!
//! An [`Engine`] is the process-wide context: configuration, the symbol table,
//! the shared aggregates and the report sink. Each instrumented thread works
//! through its own [`ThreadContext`], which owns the scalar tally, the block
//! stack, the call stack and a counter pool. The hot path (tally increments,
//! block push/pop, flushes into the top frame) never takes a lock; only
//! folding a finished block or a function attribution does.
//!
//! ```
//! use bytesflops::{BlockEnd, Engine, EngineConfig, OperandType, SharedBuffer};
//!
//! # fn main() -> bytesflops::Result<()> {
//! let output = SharedBuffer::new();
//! let engine = Engine::builder(EngineConfig::default())
//!     .output(output.clone())
//!     .build()?;
//!
//! let mut thread = engine.thread();
//! thread.record_load(8, OperandType::Double);
//! thread.record_flops(2, 128);
//! thread.on_basic_block_finalize(BlockEnd::Unconditional)?;
//! thread.shutdown()?;
//!
//! assert_eq!(engine.global_totals().flops, 2);
//! assert!(output.contents().contains("BYFL_SUMMARY"));
//! # Ok(())
//! # }
//! ```

use crate::analysis::Collaborators;
use crate::block_stack::BlockStack;
use crate::call_stack::{CallStack, EMPTY_STACK, NO_FUNCTION};
use crate::config::EngineConfig;
use crate::counters::{BlockEnd, CounterSet, OperandType};
use crate::decimator::Decimator;
use crate::error::Result;
use crate::functions::FunctionTable;
use crate::output::OutputSink;
use crate::partitions::{Categorize, PartitionTable};
use crate::pool::{CounterPool, PoolConfig, PoolStats};
use crate::report::Reporter;
use crate::symbols::{Symbol, SymbolTable};
use crate::tally::Tally;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Process-wide aggregates, folded under one lock
#[derive(Debug)]
struct Aggregates {
    globals: CounterSet,
    decimator: Decimator,
    functions: FunctionTable,
    partitions: PartitionTable,
    /// Unflushed tallies of threads that have gone away
    residual: Tally,
}

#[derive(Debug)]
struct Shared {
    config: EngineConfig,
    pool: PoolConfig,
    symbols: SymbolTable,
    collaborators: Collaborators,
    // Lock order: aggregates, then output.
    aggregates: Mutex<Aggregates>,
    output: Mutex<OutputSink>,
    max_call_depth: AtomicUsize,
    finished: AtomicBool,
}

/// Builder for an [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    pool: PoolConfig,
    output: Option<Box<dyn Write + Send>>,
    collaborators: Collaborators,
}

impl EngineBuilder {
    /// Send reports to `writer` instead of standard output
    pub fn output(mut self, writer: impl Write + Send + 'static) -> Self {
        self.output = Some(Box::new(writer));
        self
    }

    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    /// Install a partition hook
    pub fn categorizer(mut self, categorizer: impl Categorize + 'static) -> Self {
        self.collaborators = self.collaborators.with_categorizer(categorizer);
        self
    }

    /// Pool configuration for each thread's block stack
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Validate the configuration and evaluate the output gate
    pub fn build(self) -> Result<Engine> {
        let filter = self.config.validate()?;
        let enabled = filter.as_ref().map_or(true, |f| f.matches());
        let output = match self.output {
            Some(writer) => OutputSink::new(writer, enabled),
            None => OutputSink::stdout(filter.as_ref()),
        };
        if !output.is_enabled() {
            debug!(filter = ?filter, "output suppressed for this process");
        }
        debug!(config = ?self.config, "counter engine initialized");

        let aggregates = Aggregates {
            globals: CounterSet::new(),
            decimator: Decimator::new(self.config.window()),
            functions: FunctionTable::new(),
            partitions: PartitionTable::new(),
            residual: Tally::default(),
        };
        Ok(Engine {
            shared: Arc::new(Shared {
                config: self.config,
                pool: self.pool,
                symbols: SymbolTable::new(),
                collaborators: self.collaborators,
                aggregates: Mutex::new(aggregates),
                output: Mutex::new(output),
                max_call_depth: AtomicUsize::new(0),
                finished: AtomicBool::new(false),
            }),
        })
    }
}

/// Process-wide counter engine
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Engine reporting to standard output with no collaborators
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            pool: PoolConfig::default(),
            output: None,
            collaborators: Collaborators::default(),
        }
    }

    /// Context for the calling thread
    pub fn thread(&self) -> ThreadContext {
        ThreadContext::new(Arc::clone(&self.shared))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.shared.symbols
    }

    /// Snapshot of the global totals
    pub fn global_totals(&self) -> CounterSet {
        self.shared.aggregates.lock().globals
    }

    /// Snapshot of a partition's totals
    pub fn partition_totals(&self, tag: &str) -> Option<CounterSet> {
        let tag = self.shared.symbols.get(tag)?;
        self.shared.aggregates.lock().partitions.get(tag).copied()
    }

    /// Counters attributed to `key`: a function name, or with call-stack
    /// attribution a chain such as `"f3 f2 f1"`
    pub fn function_totals(&self, key: &str) -> Option<CounterSet> {
        let key = self.shared.symbols.get(key)?;
        let aggregates = self.shared.aggregates.lock();
        aggregates.functions.record(key).map(|r| r.counters)
    }

    /// Times the attribution key `key` was entered
    pub fn invocations(&self, key: &str) -> u64 {
        self.shared
            .symbols
            .get(key)
            .map_or(0, |key| self.shared.aggregates.lock().functions.invocations(key))
    }

    /// Calls recorded for callee `name`
    pub fn call_tally(&self, name: &str) -> u64 {
        self.shared
            .symbols
            .get(name)
            .map_or(0, |name| self.shared.aggregates.lock().functions.call_tally(name))
    }

    /// Deepest call stack seen on any thread
    pub fn max_call_depth(&self) -> usize {
        self.shared.max_call_depth.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    /// Print the final reports; later calls do nothing
    ///
    /// Tallies still live in a [`ThreadContext`] are not seen here; use
    /// [`ThreadContext::shutdown`] from the main thread to include them.
    pub fn shutdown(&self) -> Result<()> {
        self.shared.shutdown(None)
    }

    /// Guard that shuts the engine down when dropped
    pub fn shutdown_guard(&self) -> ShutdownGuard {
        ShutdownGuard {
            engine: self.clone(),
        }
    }
}

/// Runs [`Engine::shutdown`] on drop
#[derive(Debug)]
#[must_use = "the engine shuts down when the guard is dropped"]
pub struct ShutdownGuard {
    engine: Engine,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if let Err(e) = self.engine.shutdown() {
            warn!(error = %e, "failed to write final report");
        }
    }
}

impl Shared {
    /// Fold one finished block into the aggregates and run the decimator
    fn fold_block(&self, block: &CounterSet) -> Result<()> {
        // The hook runs before locking so it may take its own locks freely.
        let tag = self
            .collaborators
            .categorizer
            .categorize()
            .map(|tag| self.symbols.intern(tag));

        let mut aggregates = self.aggregates.lock();
        let Aggregates {
            globals,
            decimator,
            partitions,
            ..
        } = &mut *aggregates;

        globals.accumulate(block);
        if let Some(tag) = tag {
            partitions.accumulate(tag, block);
        }

        let header = decimator.take_header();
        let sample = decimator.record_block(globals);
        if !header && sample.is_none() {
            return Ok(());
        }

        let mut output = self.output.lock();
        if !output.is_enabled() {
            return Ok(());
        }
        let reporter = Reporter::new(&self.config, &self.collaborators);
        if header {
            reporter.block_header(output.writer())?;
        }
        if let Some(delta) = sample {
            reporter.block_sample(output.writer(), &delta)?;
        }
        Ok(())
    }

    fn shutdown(&self, live: Option<&Tally>) -> Result<()> {
        if self.finished.swap(true, Ordering::AcqRel) {
            trace!("engine already shut down");
            return Ok(());
        }

        let mut aggregates = self.aggregates.lock();
        let mut output = self.output.lock();
        if !output.is_enabled() {
            debug!("engine shut down with output suppressed");
            return Ok(());
        }

        let config = &self.config;
        let reporter = Reporter::new(config, &self.collaborators);
        let max_call_depth = self.max_call_depth.load(Ordering::Relaxed);
        let out = output.writer();
        let Aggregates {
            globals,
            decimator,
            functions,
            partitions,
            residual,
        } = &mut *aggregates;

        if let Some(delta) = decimator.flush(globals) {
            reporter.block_sample(out, &delta)?;
        }

        if config.per_function {
            reporter.functions(out, functions, &self.symbols, max_call_depth)?;
            reporter.callees(out, functions, &self.symbols)?;
        }

        if config.vectors {
            self.collaborators
                .vectors
                .report_histogram(max_call_depth, out)?;
        }

        // Not instrumented at basic-block level: take whatever is still in
        // the tallies plus the per-function totals.
        if globals.basic_blocks == 0 {
            let mut pending = *residual;
            if let Some(live) = live {
                pending.merge(live);
            }
            globals.accumulate_tally(&pending, BlockEnd::NotEnd);
            globals.accumulate(&functions.total());
            globals.basic_blocks = 0;
            globals.cond_brs = 0;
        }

        for (tag, totals) in partitions.sorted(&self.symbols) {
            reporter.summary(out, Some(tag), totals)?;
        }
        reporter.summary(out, None, globals)?;
        out.flush()?;

        debug!(partitions = partitions.len(), "final report written");
        Ok(())
    }
}

/// One thread's view of the engine
///
/// Each instrumented thread creates its own with [`Engine::thread`].
#[derive(Debug)]
pub struct ThreadContext {
    shared: Arc<Shared>,
    tally: Tally,
    blocks: BlockStack,
    calls: CallStack,
    /// Attribution key of the innermost live call
    current: Symbol,
}

impl ThreadContext {
    fn new(shared: Arc<Shared>) -> Self {
        let blocks = BlockStack::new(CounterPool::new(shared.pool.clone()));
        let current = shared.symbols.intern(NO_FUNCTION);
        trace!("thread context created");
        ThreadContext {
            shared,
            tally: Tally::default(),
            blocks,
            calls: CallStack::new(),
            current,
        }
    }

    #[inline(always)]
    pub fn record_load(&mut self, bytes: u64, ty: OperandType) {
        self.tally.record_load(bytes, ty);
    }

    #[inline(always)]
    pub fn record_store(&mut self, bytes: u64, ty: OperandType) {
        self.tally.record_store(bytes, ty);
    }

    #[inline(always)]
    pub fn record_flops(&mut self, count: u64, bits: u64) {
        self.tally.record_flops(count, bits);
    }

    #[inline(always)]
    pub fn record_ops(&mut self, count: u64, bits: u64) {
        self.tally.record_ops(count, bits);
    }

    /// Scalars tallied since the last flush
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Open a block frame before entering a callee
    pub fn on_basic_block_enter(&mut self) {
        self.blocks.push();
    }

    /// Discard the top block frame after a callee returns
    pub fn on_basic_block_exit(&mut self) {
        self.blocks.pop();
    }

    /// Zero the top block frame in place
    pub fn reset_block(&mut self) {
        self.blocks.reset_top();
    }

    /// Flush the tally into the top frame
    ///
    /// A terminating block is then folded into the global and partition
    /// totals, the decimator runs, and the frame starts over from zero.
    pub fn on_basic_block_finalize(&mut self, end: BlockEnd) -> Result<()> {
        self.blocks.flush(&mut self.tally, end);
        if !end.is_terminal() {
            return Ok(());
        }
        let block = *self.blocks.top();
        self.blocks.reset_top();
        self.shared.fold_block(&block)
    }

    /// Attribute the current tally to a function
    ///
    /// Reads the tally without consuming it, so call it before
    /// [`on_basic_block_finalize`](Self::on_basic_block_finalize) or
    /// [`discard_tally`](Self::discard_tally).
    pub fn assoc_with_function(&mut self, name: &str, end: BlockEnd) {
        let key = if self.shared.config.call_stack {
            self.current
        } else {
            self.shared.symbols.intern(name)
        };
        self.shared
            .aggregates
            .lock()
            .functions
            .assoc(key, &self.tally, end);
    }

    /// Enter an instrumented function
    pub fn on_function_enter(&mut self, name: &str) {
        let entry = self.calls.push_function(&self.shared.symbols, name);
        self.shared
            .max_call_depth
            .fetch_max(self.calls.max_depth(), Ordering::Relaxed);
        self.current = entry.chain;

        let key = if self.shared.config.call_stack {
            entry.chain
        } else {
            entry.function
        };
        self.shared
            .aggregates
            .lock()
            .functions
            .record_entry(key, entry.function);
    }

    /// Return from the innermost instrumented function
    pub fn on_function_exit(&mut self) {
        self.current = match self.calls.pop_function() {
            Some(chain) => chain,
            None => self.shared.symbols.intern(EMPTY_STACK),
        };
    }

    /// Count a call to `name`, instrumented or not
    pub fn incr_call_tally(&mut self, name: &str) {
        let function = self.shared.symbols.intern(name);
        self.shared
            .aggregates
            .lock()
            .functions
            .incr_invocation(function);
    }

    /// Zero the tally without folding it anywhere
    pub fn discard_tally(&mut self) {
        self.tally.clear();
    }

    /// Current attribution key
    pub fn current_function(&self) -> &str {
        self.shared.symbols.resolve(self.current)
    }

    /// Depth of this thread's call stack
    pub fn call_depth(&self) -> usize {
        self.calls.depth()
    }

    /// Depth of this thread's block stack
    pub fn block_depth(&self) -> usize {
        self.blocks.depth()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.blocks.pool_stats()
    }

    /// Print the final reports, including this thread's live tally
    pub fn shutdown(&mut self) -> Result<()> {
        self.shared.shutdown(Some(&self.tally))
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        if self.tally.is_zero() {
            return;
        }
        trace!("parking unflushed tally of exiting thread");
        self.shared.aggregates.lock().residual.merge(&self.tally);
    }
}

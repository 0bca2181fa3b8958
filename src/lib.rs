//! Bytesflops - runtime counter aggregation for instrumented programs
//!
//! Instrumented code calls into this library at every load, store, flop,
//! integer operation and basic-block or function boundary. The counts are
//! attributed to basic blocks, functions (optionally with their full call
//! chain) and user-defined partitions, sampled every N basic blocks, and
//! summarized with derived ratios such as bytes per flop when the program
//! exits.
//!
//! Embed an [`Engine`] directly, or use the process-global entry points in
//! [`runtime`].

pub mod analysis;
pub mod block_stack;
pub mod call_stack;
pub mod config;
pub mod counters;
pub mod decimator;
pub mod engine;
pub mod error;
pub mod functions;
pub mod output;
pub mod partitions;
pub mod pool;
pub mod report;
pub mod runtime;
pub mod symbols;
pub mod tally;

pub use analysis::{
    AddressTally, Collaborators, NoAnalysis, ReuseAnalysis, ReuseSummary, VectorAnalysis,
    VectorSummary,
};
pub use config::EngineConfig;
pub use counters::{BlockEnd, CounterSet, OperandType};
pub use engine::{Engine, EngineBuilder, ShutdownGuard, ThreadContext};
pub use error::{ConfigError, EngineError, Result};
pub use output::{OutputFilter, SharedBuffer};
pub use partitions::{Categorize, NoCategories};
pub use pool::{PoolConfig, PoolStats};
pub use tally::Tally;

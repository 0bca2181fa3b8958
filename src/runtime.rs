//! Process-global entry points for instrumented code
//!
//! Instrumented programs cannot thread an [`Engine`] through their own code,
//! so this module keeps one engine per process and one [`ThreadContext`] per
//! thread. Every entry point is a no-op until [`init`] has run. The engine is
//! never torn down implicitly: hold the [`RuntimeGuard`] returned by `init`
//! for the life of `main`, or call [`shutdown`] on the exit path.

use crate::config::EngineConfig;
use crate::counters::{BlockEnd, OperandType};
use crate::engine::{Engine, EngineBuilder, ThreadContext};
use crate::error::{EngineError, Result};
use std::cell::RefCell;
use std::sync::OnceLock;
use tracing::warn;

static ENGINE: OnceLock<Engine> = OnceLock::new();

thread_local! {
    static CONTEXT: RefCell<Option<ThreadContext>> = const { RefCell::new(None) };
}

/// Install the process engine, reporting to standard output
pub fn init(config: EngineConfig) -> Result<RuntimeGuard> {
    init_with(Engine::builder(config))
}

/// Install the process engine built by `builder`
pub fn init_with(builder: EngineBuilder) -> Result<RuntimeGuard> {
    let engine = builder.build()?;
    ENGINE
        .set(engine)
        .map_err(|_| EngineError::AlreadyInitialized)?;
    Ok(RuntimeGuard { _private: () })
}

/// [`init`], printing the error and exiting with status 1 on failure
pub fn init_or_exit(config: EngineConfig) -> RuntimeGuard {
    match init(config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// The process engine, once initialized
pub fn engine() -> Option<&'static Engine> {
    ENGINE.get()
}

/// Run `f` on the calling thread's context, creating it on first use
///
/// Returns `None` before [`init`], during thread teardown, or when called
/// re-entrantly from inside another entry point.
fn with_context<R>(f: impl FnOnce(&mut ThreadContext) -> R) -> Option<R> {
    let engine = ENGINE.get()?;
    CONTEXT
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            let context = slot.get_or_insert_with(|| engine.thread());
            Some(f(context))
        })
        .ok()
        .flatten()
}

#[inline]
pub fn record_load(bytes: u64, ty: OperandType) {
    with_context(|cx| cx.record_load(bytes, ty));
}

#[inline]
pub fn record_store(bytes: u64, ty: OperandType) {
    with_context(|cx| cx.record_store(bytes, ty));
}

#[inline]
pub fn record_flops(count: u64, bits: u64) {
    with_context(|cx| cx.record_flops(count, bits));
}

#[inline]
pub fn record_ops(count: u64, bits: u64) {
    with_context(|cx| cx.record_ops(count, bits));
}

pub fn on_basic_block_enter() {
    with_context(ThreadContext::on_basic_block_enter);
}

pub fn on_basic_block_exit() {
    with_context(ThreadContext::on_basic_block_exit);
}

pub fn reset_block() {
    with_context(ThreadContext::reset_block);
}

pub fn on_basic_block_finalize(end: BlockEnd) {
    if let Some(Err(e)) = with_context(|cx| cx.on_basic_block_finalize(end)) {
        warn!(error = %e, "failed to write basic-block sample");
    }
}

pub fn assoc_with_function(name: &str, end: BlockEnd) {
    with_context(|cx| cx.assoc_with_function(name, end));
}

pub fn on_function_enter(name: &str) {
    with_context(|cx| cx.on_function_enter(name));
}

pub fn on_function_exit() {
    with_context(ThreadContext::on_function_exit);
}

pub fn incr_call_tally(name: &str) {
    with_context(|cx| cx.incr_call_tally(name));
}

pub fn discard_tally() {
    with_context(ThreadContext::discard_tally);
}

/// Print the final reports; later calls do nothing
pub fn shutdown() -> Result<()> {
    let engine = ENGINE.get().ok_or(EngineError::NotInitialized)?;
    match with_context(ThreadContext::shutdown) {
        Some(result) => result,
        None => engine.shutdown(),
    }
}

/// Runs [`shutdown`] on drop
#[derive(Debug)]
#[must_use = "the runtime shuts down when the guard is dropped"]
pub struct RuntimeGuard {
    _private: (),
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        if let Err(e) = shutdown() {
            warn!(error = %e, "failed to write final report");
        }
    }
}

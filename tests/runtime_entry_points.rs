//! Process-global entry points
//!
//! The runtime can be initialized once per process, so every test in this
//! file shares one engine and runs serially.

use bytesflops::runtime;
use bytesflops::{BlockEnd, Engine, EngineConfig, EngineError, OperandType, SharedBuffer};
use serial_test::serial;
use std::sync::OnceLock;

fn output() -> &'static SharedBuffer {
    static OUTPUT: OnceLock<SharedBuffer> = OnceLock::new();
    OUTPUT.get_or_init(|| {
        let buffer = SharedBuffer::new();
        let config = EngineConfig {
            per_function: true,
            ..Default::default()
        };
        let guard = runtime::init_with(Engine::builder(config).output(buffer.clone()))
            .expect("first initialization");
        // Shut down explicitly below rather than at the end of this closure.
        std::mem::forget(guard);
        buffer
    })
}

fn engine() -> &'static Engine {
    output();
    runtime::engine().expect("runtime initialized")
}

#[test]
#[serial]
fn test_second_init_is_rejected() {
    output();
    let err = runtime::init(EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyInitialized));
}

#[test]
#[serial]
fn test_entry_points_reach_engine() {
    let engine = engine();
    let before = engine.global_totals();

    runtime::on_function_enter("runtime_kernel");
    runtime::record_load(32, OperandType::Double);
    runtime::record_flops(4, 256);
    runtime::assoc_with_function("runtime_kernel", BlockEnd::Unconditional);
    runtime::on_basic_block_finalize(BlockEnd::Unconditional);
    runtime::incr_call_tally("runtime_helper");
    runtime::on_function_exit();

    let after = engine.global_totals();
    assert_eq!(after.flops - before.flops, 4);
    assert_eq!(after.loads - before.loads, 32);
    assert_eq!(engine.invocations("runtime_kernel"), 1);
    assert_eq!(engine.call_tally("runtime_helper"), 1);
    assert_eq!(engine.function_totals("runtime_kernel").unwrap().flops, 4);
}

#[test]
#[serial]
fn test_nested_blocks_on_worker_thread() {
    let engine = engine();
    let before = engine.global_totals();

    std::thread::spawn(|| {
        runtime::record_flops(1, 64);
        runtime::on_basic_block_finalize(BlockEnd::NotEnd);
        runtime::on_basic_block_enter();
        runtime::record_flops(10, 640);
        runtime::on_basic_block_finalize(BlockEnd::Conditional);
        runtime::on_basic_block_exit();
        runtime::on_basic_block_finalize(BlockEnd::Unconditional);
    })
    .join()
    .unwrap();

    let after = engine.global_totals();
    assert_eq!(after.flops - before.flops, 11);
    assert_eq!(after.basic_blocks - before.basic_blocks, 2);
    assert_eq!(after.cond_brs - before.cond_brs, 1);
}

#[test]
#[serial]
fn test_shutdown_writes_report_once() {
    let output = output();
    runtime::shutdown().unwrap();
    let report = output.contents();
    assert!(report.contains("BYFL_FUNC_HEADER: "));
    assert!(report.contains("BYFL_SUMMARY: "));

    runtime::shutdown().unwrap();
    assert_eq!(output.contents(), report);
    assert!(runtime::engine().unwrap().is_finished());
}

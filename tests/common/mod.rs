//! Common test utilities
#![allow(dead_code)]

use ndexec::runtime::cpu::CpuContext;
use ndexec::runtime::{EngineConfig, ParallelismConfig};

/// Install a fmt subscriber honouring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a CPU context with default configuration for testing
pub fn create_cpu_context() -> CpuContext {
    init_tracing();
    CpuContext::new().expect("cpu context")
}

/// Create a CPU context with an explicit thread count and chunk length
pub fn create_cpu_context_with_threads(threads: usize, min_chunk_len: usize) -> CpuContext {
    init_tracing();
    let config =
        EngineConfig::default().with_parallelism(ParallelismConfig::new(Some(threads), Some(min_chunk_len)));
    CpuContext::with_config(config).expect("cpu context")
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

//! Parallel traversal engine
//!
//! `parallel_for` partitions an index range into contiguous chunks and runs a
//! range closure per chunk on the context's worker pool; `parallel_for_slices`
//! does the same over disjoint mutable windows of an output slice. Both block
//! until every chunk has finished. The first error returned by any chunk
//! aborts the call: chunks that have not started yet are skipped.

use super::cpu::CpuContext;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// First error observed across chunks, plus the abort flag chunks poll
struct FirstError {
    aborted: AtomicBool,
    slot: Mutex<Option<Error>>,
}

impl FirstError {
    fn new() -> Self {
        Self {
            aborted: AtomicBool::new(false),
            slot: Mutex::new(None),
        }
    }

    #[inline]
    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    fn record(&self, err: Error) {
        self.aborted.store(true, Ordering::Release);
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn run(&self, chunk: impl FnOnce() -> Result<()>) {
        if self.is_aborted() {
            return;
        }
        if let Err(err) = chunk() {
            self.record(err);
        }
    }

    fn finish(self) -> Result<()> {
        match self.slot.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Number of iterations per chunk for `iterations` total
fn chunk_iterations(ctx: &CpuContext, iterations: usize) -> usize {
    let per_thread = iterations.div_ceil(ctx.num_threads().max(1));
    per_thread.max(ctx.min_chunk_len()).max(1)
}

/// Run `body(sub_start, sub_stop)` over chunks of `[start, stop)`
///
/// Chunk boundaries are aligned to `increment`, so a closure stepping by
/// `increment` from `sub_start` visits exactly the indices
/// `start, start + increment, ...` below `stop`. Chunk order is unspecified.
pub fn parallel_for<F>(
    ctx: &CpuContext,
    start: usize,
    stop: usize,
    increment: usize,
    body: F,
) -> Result<()>
where
    F: Fn(usize, usize) -> Result<()> + Sync,
{
    if increment == 0 {
        return Err(Error::invalid_argument("increment", "must be positive"));
    }
    if stop <= start {
        return Ok(());
    }

    let iterations = (stop - start).div_ceil(increment);
    let per_chunk = chunk_iterations(ctx, iterations);
    let num_chunks = iterations.div_ceil(per_chunk);
    let span = per_chunk * increment;

    tracing::trace!(start, stop, increment, num_chunks, per_chunk, "parallel_for");

    let first_error = FirstError::new();
    let run_chunk = |k: usize| {
        let sub_start = start + k * span;
        let sub_stop = (sub_start + span).min(stop);
        first_error.run(|| body(sub_start, sub_stop));
    };

    if num_chunks == 1 {
        run_chunk(0);
    } else {
        #[cfg(feature = "rayon")]
        ctx.install_parallelism(|| {
            (0..num_chunks).into_par_iter().for_each(run_chunk);
        });

        #[cfg(not(feature = "rayon"))]
        for k in 0..num_chunks {
            if first_error.is_aborted() {
                break;
            }
            run_chunk(k);
        }
    }

    first_error.finish()
}

/// Run `body(first_unit, window)` over disjoint windows of `out`
///
/// `out` is viewed as consecutive units of `unit_len` elements (rows, TADs,
/// string spans); each window holds a whole number of units and
/// `first_unit` is the index of its first unit.
pub fn parallel_for_slices<T, F>(
    ctx: &CpuContext,
    out: &mut [T],
    unit_len: usize,
    body: F,
) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<()> + Sync,
{
    if unit_len == 0 || out.is_empty() {
        return Ok(());
    }
    if out.len() % unit_len != 0 {
        return Err(Error::Internal(format!(
            "output of {} elements is not a whole number of {}-element units",
            out.len(),
            unit_len
        )));
    }

    let units = out.len() / unit_len;
    let per_chunk = chunk_iterations(ctx, out.len()).div_ceil(unit_len).min(units);
    let window = per_chunk * unit_len;

    tracing::trace!(units, unit_len, per_chunk, "parallel_for_slices");

    let first_error = FirstError::new();

    if per_chunk >= units {
        first_error.run(|| body(0, out));
    } else {
        #[cfg(feature = "rayon")]
        ctx.install_parallelism(|| {
            out.par_chunks_mut(window)
                .enumerate()
                .for_each(|(k, chunk)| first_error.run(|| body(k * per_chunk, chunk)));
        });

        #[cfg(not(feature = "rayon"))]
        for (k, chunk) in out.chunks_mut(window).enumerate() {
            if first_error.is_aborted() {
                break;
            }
            first_error.run(|| body(k * per_chunk, chunk));
        }
    }

    first_error.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::runtime::ParallelismConfig;
    use std::sync::atomic::AtomicUsize;

    fn ctx(threads: usize) -> CpuContext {
        CpuContext::new()
            .unwrap()
            .with_parallelism(ParallelismConfig::new(Some(threads), Some(1)))
            .unwrap()
    }

    #[test]
    fn test_every_index_visited_once() {
        let ctx = ctx(4);
        let visits: Vec<AtomicUsize> = (0..103).map(|_| AtomicUsize::new(0)).collect();
        parallel_for(&ctx, 3, 103, 5, |s, e| {
            for i in (s..e).step_by(5) {
                visits[i].fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        })
        .unwrap();

        for (i, v) in visits.iter().enumerate() {
            let expected = usize::from(i >= 3 && (i - 3) % 5 == 0);
            assert_eq!(v.load(Ordering::Relaxed), expected, "index {i}");
        }
    }

    #[test]
    fn test_empty_range_and_bad_increment() {
        let ctx = ctx(2);
        parallel_for(&ctx, 5, 5, 1, |_, _| Err(Error::Internal("ran".into()))).unwrap();
        assert!(parallel_for(&ctx, 0, 5, 0, |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_first_error_is_returned() {
        let ctx = ctx(4);
        let err = parallel_for(&ctx, 0, 64, 1, |s, _| {
            if s >= 32 {
                Err(Error::IndexOutOfRange {
                    op: "test",
                    what: "chunk",
                    value: s as i128,
                    bound: 32,
                })
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn test_slices_are_disjoint_windows() {
        let ctx = ctx(3);
        let mut out = vec![0usize; 30];
        parallel_for_slices(&ctx, &mut out, 3, |first, window| {
            for (u, row) in window.chunks_mut(3).enumerate() {
                row.fill(first + u);
            }
            Ok(())
        })
        .unwrap();
        let expected: Vec<usize> = (0..10).flat_map(|r| [r, r, r]).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_slices_reject_ragged_units() {
        let ctx = ctx(1);
        let mut out = vec![0u8; 7];
        assert!(parallel_for_slices(&ctx, &mut out, 3, |_, _| Ok(())).is_err());
    }
}

//! Matrix multiplication kernels

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuContext;
use crate::runtime::parallel_for_slices;

/// Matrix multiplication: C = A @ B
///
/// # Arguments
/// * `a` - Matrix A (m × k), row-major with leading dimension `lda`
/// * `b` - Matrix B (k × n), row-major with leading dimension `ldb`
/// * `out` - Output matrix C (m × n), dense row-major
///
/// Rows of C are distributed across workers; each row is accumulated in the
/// same (i, k, j) order whatever the thread count, so results are identical
/// for every parallelism setting.
#[allow(clippy::too_many_arguments)]
pub fn matmul_kernel<T: Element>(
    ctx: &CpuContext,
    a: &[T],
    b: &[T],
    out: &mut [T],
    m: usize,
    n: usize,
    k: usize,
    lda: usize,
    ldb: usize,
) -> Result<()> {
    if out.len() != m * n {
        return Err(Error::shape_mismatch(&[m, n], &[out.len()]));
    }
    if m > 0 && k > 0 && a.len() < (m - 1) * lda + k {
        return Err(Error::Internal(format!(
            "matmul lhs holds {} elements, needs {m}x{k} with lda {lda}",
            a.len()
        )));
    }
    if k > 0 && n > 0 && b.len() < (k - 1) * ldb + n {
        return Err(Error::Internal(format!(
            "matmul rhs holds {} elements, needs {k}x{n} with ldb {ldb}",
            b.len()
        )));
    }
    if n == 0 {
        return Ok(());
    }

    parallel_for_slices(ctx, out, n, |first_row, rows| {
        for (r, c_row) in rows.chunks_mut(n).enumerate() {
            let i = first_row + r;
            c_row.fill(T::zero());
            let a_row = &a[i * lda..i * lda + k];
            for (kk, &a_val) in a_row.iter().enumerate() {
                let b_row = &b[kk * ldb..kk * ldb + n];
                for (c, &b_val) in c_row.iter_mut().zip(b_row) {
                    *c = *c + a_val * b_val;
                }
            }
        }
        Ok(())
    })
}

/// Add `bias[j]` to column `j` of every `row_len`-element row of `out`
pub fn add_row_bias_kernel<T: Element>(
    ctx: &CpuContext,
    out: &mut [T],
    bias: &[T],
) -> Result<()> {
    let row_len = bias.len();
    parallel_for_slices(ctx, out, row_len, |_, rows| {
        for row in rows.chunks_mut(row_len) {
            for (v, &b) in row.iter_mut().zip(bias) {
                *v = *v + b;
            }
        }
        Ok(())
    })
}

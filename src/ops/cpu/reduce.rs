//! CPU implementation of reduce operations.

use crate::dispatch_dtype;
use crate::error::Result;
use crate::ops::ReduceOps;
use crate::runtime::cpu::CpuContext;
use crate::runtime::cpu::kernels::{Reduction, reduce_kernel};
use crate::shape::{TadPack, eval_reduce_shape_info};
use crate::tensor::{NDArray, Order};

/// Shared path of every axis reduction
///
/// The input is read in place through its TAD offsets; only the output is
/// allocated.
fn reduce_impl(
    ctx: &CpuContext,
    a: &NDArray,
    axes: &[isize],
    keep_dims: bool,
    op: Reduction,
) -> Result<NDArray> {
    let dtype = a.dtype();
    let out_desc = eval_reduce_shape_info(Order::C, axes, a.descriptor(), keep_dims, false)?;
    let tads = TadPack::new(a.descriptor(), axes)?;
    tracing::debug!(
        op = op.name(),
        shape = ?a.shape(),
        %dtype,
        ?axes,
        keep_dims,
        out = ?out_desc.shape(),
        "reduce"
    );

    let mut out = ctx.alloc(out_desc.shape(), dtype, Order::C)?;
    dispatch_dtype!(dtype, T => {
        reduce_kernel::<T>(ctx, a.data::<T>()?, &tads, op, out.data_mut::<T>()?)?;
    }, op.name());
    Ok(out)
}

impl ReduceOps for CpuContext {
    fn sum(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray> {
        reduce_impl(self, a, axes, keep_dims, Reduction::Sum)
    }

    fn mean(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray> {
        reduce_impl(self, a, axes, keep_dims, Reduction::Mean)
    }

    fn max(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray> {
        reduce_impl(self, a, axes, keep_dims, Reduction::Max)
    }

    fn min(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray> {
        reduce_impl(self, a, axes, keep_dims, Reduction::Min)
    }

    fn prod(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray> {
        reduce_impl(self, a, axes, keep_dims, Reduction::Prod)
    }
}

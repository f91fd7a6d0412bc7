//! CPU implementation of statistical operations.

use crate::dispatch_float_dtype;
use crate::error::Result;
use crate::ops::StatisticalOps;
use crate::runtime::cpu::CpuContext;
use crate::runtime::cpu::kernels::{moments_kernel, variance_kernel};
use crate::runtime::helpers::read_int_list;
use crate::shape::{TadPack, eval_reduce_shape_info};
use crate::tensor::{NDArray, Order};

fn variance_impl(
    ctx: &CpuContext,
    a: &NDArray,
    axes: &[isize],
    keep_dims: bool,
    correction: usize,
    take_sqrt: bool,
) -> Result<NDArray> {
    let op = if take_sqrt { "std" } else { "var" };
    let dtype = a.dtype();
    let out_desc = eval_reduce_shape_info(Order::C, axes, a.descriptor(), keep_dims, false)?;
    let tads = TadPack::new(a.descriptor(), axes)?;
    tracing::debug!(op, shape = ?a.shape(), %dtype, ?axes, keep_dims, correction, "variance");

    let mut out = ctx.alloc(out_desc.shape(), dtype, Order::C)?;
    dispatch_float_dtype!(dtype, T => {
        variance_kernel::<T>(ctx, a.data::<T>()?, &tads, correction, take_sqrt, out.data_mut::<T>()?)?;
    }, op);
    Ok(out)
}

impl StatisticalOps for CpuContext {
    fn var(
        &self,
        a: &NDArray,
        axes: &[isize],
        keep_dims: bool,
        correction: usize,
    ) -> Result<NDArray> {
        variance_impl(self, a, axes, keep_dims, correction, false)
    }

    fn std(
        &self,
        a: &NDArray,
        axes: &[isize],
        keep_dims: bool,
        correction: usize,
    ) -> Result<NDArray> {
        variance_impl(self, a, axes, keep_dims, correction, true)
    }

    fn moments(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<(NDArray, NDArray)> {
        let dtype = a.dtype();
        let out_desc = eval_reduce_shape_info(Order::C, axes, a.descriptor(), keep_dims, false)?;
        let tads = TadPack::new(a.descriptor(), axes)?;
        tracing::debug!(shape = ?a.shape(), %dtype, ?axes, keep_dims, "moments");

        let mut mean = self.alloc(out_desc.shape(), dtype, Order::C)?;
        let mut variance = self.alloc(out_desc.shape(), dtype, Order::C)?;
        dispatch_float_dtype!(dtype, T => {
            moments_kernel::<T>(
                self,
                a.data::<T>()?,
                &tads,
                mean.data_mut::<T>()?,
                variance.data_mut::<T>()?,
            )?;
        }, "moments");
        Ok((mean, variance))
    }

    fn moments_dynamic(
        &self,
        a: &NDArray,
        axes: &NDArray,
        keep_dims: bool,
    ) -> Result<(NDArray, NDArray)> {
        let axes = read_int_list(axes, "axes")?;
        self.moments(a, &axes, keep_dims)
    }
}

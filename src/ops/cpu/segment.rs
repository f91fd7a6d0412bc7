//! CPU implementation of unsorted segment operations.
//!
//! Kernels are selected by the `(data dtype, index dtype)` pair from tables
//! built once per process.

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::ops::SegmentOps;
use crate::ops::dispatch::DispatchTable;
use crate::register_dtype_pairs;
use crate::runtime::cpu::CpuContext;
use crate::runtime::cpu::kernels::{
    Reduction, unsorted_segment_extremum_bp_kernel, unsorted_segment_kernel, validate_segment_ids,
};
use crate::runtime::helpers::ensure_contiguous;
use crate::shape::segment_output_shape;
use crate::tensor::{NDArray, Order};
use std::sync::OnceLock;

type SegmentFn =
    fn(&CpuContext, &NDArray, &NDArray, usize, Reduction, &mut NDArray) -> Result<()>;

type SegmentBpFn =
    fn(&CpuContext, &NDArray, &NDArray, &NDArray, usize, Reduction, &mut NDArray) -> Result<()>;

const fn segment_op_name(op: Reduction) -> &'static str {
    match op {
        Reduction::Min => "unsorted_segment_min",
        Reduction::Max => "unsorted_segment_max",
        Reduction::Sum => "unsorted_segment_sum",
        Reduction::Prod => "unsorted_segment_prod",
        Reduction::Mean => "unsorted_segment_mean",
    }
}

fn row_len(data: &NDArray) -> usize {
    data.shape().iter().skip(1).product()
}

fn segment_typed<T: Element, I: Element>(
    ctx: &CpuContext,
    data: &NDArray,
    ids: &NDArray,
    num_classes: usize,
    op: Reduction,
    out: &mut NDArray,
) -> Result<()> {
    let class_ids = validate_segment_ids(ctx, ids.data::<I>()?, num_classes, segment_op_name(op))?;
    unsorted_segment_kernel(
        ctx,
        data.data::<T>()?,
        &class_ids,
        num_classes,
        row_len(data),
        op,
        out.data_mut::<T>()?,
    )
}

fn segment_bp_typed<T: Element, I: Element>(
    ctx: &CpuContext,
    data: &NDArray,
    ids: &NDArray,
    grad: &NDArray,
    num_classes: usize,
    op: Reduction,
    grad_in: &mut NDArray,
) -> Result<()> {
    let class_ids = validate_segment_ids(ctx, ids.data::<I>()?, num_classes, segment_op_name(op))?;
    unsorted_segment_extremum_bp_kernel(
        ctx,
        data.data::<T>()?,
        &class_ids,
        grad.data::<T>()?,
        num_classes,
        row_len(data),
        op,
        grad_in.data_mut::<T>()?,
    )
}

macro_rules! register_segment_kernels {
    ($table:expr, $kernel:ident) => {{
        register_dtype_pairs!(
            $table,
            $kernel,
            [f64, f32, i64, i32, i16, i8, u64, u32, u16, u8],
            [i64, i32, i16, i8, u64, u32, u16, u8]
        );
        #[cfg(feature = "f16")]
        register_dtype_pairs!(
            $table,
            $kernel,
            [half::f16, half::bf16],
            [i64, i32, i16, i8, u64, u32, u16, u8]
        );
    }};
}

fn forward_table() -> &'static DispatchTable<SegmentFn> {
    static TABLE: OnceLock<DispatchTable<SegmentFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: DispatchTable<SegmentFn> = DispatchTable::new("unsorted_segment");
        register_segment_kernels!(table, segment_typed);
        table
    })
}

fn backprop_table() -> &'static DispatchTable<SegmentBpFn> {
    static TABLE: OnceLock<DispatchTable<SegmentBpFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: DispatchTable<SegmentBpFn> = DispatchTable::new("unsorted_segment_bp");
        register_segment_kernels!(table, segment_bp_typed);
        table
    })
}

fn check_index_dtype(ids: DType, op: &'static str) -> Result<()> {
    if ids.is_int() {
        Ok(())
    } else {
        Err(Error::unsupported_dtype(ids, op))
    }
}

fn segment_impl(
    ctx: &CpuContext,
    data: &NDArray,
    ids: &NDArray,
    num_classes: usize,
    op: Reduction,
) -> Result<NDArray> {
    let name = segment_op_name(op);
    check_index_dtype(ids.dtype(), name)?;
    let out_shape = segment_output_shape(data.shape(), ids.shape(), num_classes)?;
    let kernel = forward_table().get(data.dtype(), ids.dtype())?;
    tracing::debug!(
        op = name,
        data = ?data.shape(),
        ids = ?ids.shape(),
        dtype = %data.dtype(),
        num_classes,
        "segment reduction"
    );

    let data = ensure_contiguous(ctx, data)?;
    let ids = ensure_contiguous(ctx, ids)?;
    let mut out = ctx.alloc(&out_shape, data.dtype(), Order::C)?;
    kernel(ctx, &data, &ids, num_classes, op, &mut out)?;
    Ok(out)
}

fn segment_bp_impl(
    ctx: &CpuContext,
    data: &NDArray,
    ids: &NDArray,
    grad: &NDArray,
    num_classes: usize,
    op: Reduction,
) -> Result<(NDArray, NDArray)> {
    let name = segment_op_name(op);
    check_index_dtype(ids.dtype(), name)?;
    let out_shape = segment_output_shape(data.shape(), ids.shape(), num_classes)?;
    if grad.shape() != out_shape.as_slice() {
        return Err(Error::shape_mismatch(&out_shape, grad.shape()));
    }
    if grad.dtype() != data.dtype() {
        return Err(Error::DTypeMismatch {
            lhs: data.dtype(),
            rhs: grad.dtype(),
        });
    }
    let kernel = backprop_table().get(data.dtype(), ids.dtype())?;
    tracing::debug!(
        op = name,
        data = ?data.shape(),
        ids = ?ids.shape(),
        num_classes,
        "segment backprop"
    );

    let data = ensure_contiguous(ctx, data)?;
    let ids = ensure_contiguous(ctx, ids)?;
    let grad = ensure_contiguous(ctx, grad)?;
    let mut grad_in = ctx.alloc(data.shape(), data.dtype(), Order::C)?;
    kernel(ctx, &data, &ids, &grad, num_classes, op, &mut grad_in)?;
    let grad_ids = ctx.alloc(ids.shape(), ids.dtype(), Order::C)?;
    Ok((grad_in, grad_ids))
}

macro_rules! segment_forward {
    ($($name:ident => $op:ident),* $(,)?) => {
        paste::paste! {
            $(
                fn [<unsorted_segment_ $name>](
                    &self,
                    data: &NDArray,
                    ids: &NDArray,
                    num_classes: usize,
                ) -> Result<NDArray> {
                    segment_impl(self, data, ids, num_classes, Reduction::$op)
                }
            )*
        }
    };
}

impl SegmentOps for CpuContext {
    segment_forward! {
        min => Min,
        max => Max,
        sum => Sum,
        prod => Prod,
        mean => Mean,
    }

    fn unsorted_segment_min_bp(
        &self,
        data: &NDArray,
        ids: &NDArray,
        grad: &NDArray,
        num_classes: usize,
    ) -> Result<(NDArray, NDArray)> {
        segment_bp_impl(self, data, ids, grad, num_classes, Reduction::Min)
    }

    fn unsorted_segment_max_bp(
        &self,
        data: &NDArray,
        ids: &NDArray,
        grad: &NDArray,
        num_classes: usize,
    ) -> Result<(NDArray, NDArray)> {
        segment_bp_impl(self, data, ids, grad, num_classes, Reduction::Max)
    }
}

//! Declarable operations
//!
//! A declarable op is invoked by name with a list of input arrays and three
//! attribute lists (integers, floats, booleans). Dynamic parameters such as
//! a segment class count or a reduction axis list may arrive either as
//! attributes or as extra integer tensor inputs.
//!
//! Every op exposes a shape function that [`OpRegistry::execute`] calls
//! before anything is allocated, so shape and range errors surface without
//! touching the workspace.
//!
//! # Attribute conventions
//!
//! | op | inputs | ints | bools |
//! |----|--------|------|-------|
//! | `reduce_{sum,mean,max,min,prod}` | x, \[axes\] | axes | keep_dims |
//! | `reduce_variance`, `reduce_stdev` | x, \[axes\] | axes | keep_dims, bias_corrected |
//! | `moments` | x, \[axes\] | axes | keep_dims |
//! | `unsorted_segment_*` | data, ids, \[num_classes\] | num_classes | |
//! | `unsorted_segment_{min,max}_bp` | data, ids, grad, \[num_classes\] | num_classes | |
//! | `tile` | x, \[reps\] | reps | |
//! | `tile_bp` | x, grad or x, reps, grad | reps | |
//! | `conv2d`, `depthwise_conv2d` | x, w, \[bias\] | kH, kW, sH, sW, pH, pW, dH, dW, same, data_format, weight_format | |
//! | `sconv2d` | x, w_depth, \[w_point\], \[bias\] | as conv2d | |
//! | `extract_image_patches` | images (NHWC) | kH, kW, sH, sW, rH, rW | same |
//! | `matmul` | a, b | | |
//!
//! Axis attributes take precedence over an axis tensor. Kernel extents of 0
//! in the convolution attributes are taken from the weights.
//!
//! # Example
//!
//! ```
//! use ndexec::prelude::*;
//! let ctx = CpuContext::new().unwrap();
//! let data = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 0.0, 5.0, 5.0], &[3, 2]).unwrap();
//! let ids = NDArray::from_slice(&[0i32, 1, 0], &[3]).unwrap();
//! let out = OpRegistry::global()
//!     .execute(&ctx, "unsorted_segment_min", &[&data, &ids], &OpArgs::new().with_ints([2]))
//!     .unwrap();
//! assert_eq!(out[0].to_vec::<f32>().unwrap(), vec![1.0, 0.0, 3.0, 0.0]);
//! ```

use crate::error::{Error, Result};
use crate::ops::conv_common::{
    Conv2dOptions, Conv2dParams, DataFormat, WeightFormat, conv2d_output_shape,
    depthwise_output_shape, validate_rank,
};
use crate::ops::{ConvOps, MatmulOps, ReduceOps, SegmentOps, StatisticalOps, TileOps};
use crate::runtime::cpu::CpuContext;
use crate::runtime::helpers::read_int_list;
use crate::shape::{PaddingMode, eval_reduce_shape_info, segment_output_shape, tile_shape};
use crate::tensor::{NDArray, Order, ShapeDescriptor};
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::{Arc, OnceLock};

/// Attribute lists of one op invocation
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpArgs {
    /// Integer attributes
    pub ints: Vec<i64>,
    /// Floating-point attributes
    pub floats: Vec<f64>,
    /// Boolean attributes
    pub bools: Vec<bool>,
}

impl OpArgs {
    /// Empty attribute lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the integer attributes
    pub fn with_ints(mut self, ints: impl Into<Vec<i64>>) -> Self {
        self.ints = ints.into();
        self
    }

    /// Set the floating-point attributes
    pub fn with_floats(mut self, floats: impl Into<Vec<f64>>) -> Self {
        self.floats = floats.into();
        self
    }

    /// Set the boolean attributes
    pub fn with_bools(mut self, bools: impl Into<Vec<bool>>) -> Self {
        self.bools = bools.into();
        self
    }

    /// Integer attribute `i`, or `default` when absent
    pub fn int_or(&self, i: usize, default: i64) -> i64 {
        self.ints.get(i).copied().unwrap_or(default)
    }

    /// Boolean attribute `i`, or `default` when absent
    pub fn bool_or(&self, i: usize, default: bool) -> bool {
        self.bools.get(i).copied().unwrap_or(default)
    }
}

/// An operation invocable by name
pub trait DeclarableOp: Send + Sync {
    /// Registered name
    fn name(&self) -> &'static str;

    /// Accepted number of tensor inputs
    fn num_inputs(&self) -> RangeInclusive<usize>;

    /// Output descriptors for the given inputs and attributes
    ///
    /// Reads input descriptors, plus the values of inputs that carry dynamic
    /// parameters (class counts, axis lists, repetitions). Never allocates
    /// output storage.
    fn calculate_output_shape(
        &self,
        inputs: &[&NDArray],
        args: &OpArgs,
    ) -> Result<Vec<ShapeDescriptor>>;

    /// Run the operation
    fn execute(&self, ctx: &CpuContext, inputs: &[&NDArray], args: &OpArgs)
    -> Result<Vec<NDArray>>;
}

type ShapeFn = fn(&[&NDArray], &OpArgs) -> Result<Vec<ShapeDescriptor>>;
type ExecFn = fn(&CpuContext, &[&NDArray], &OpArgs) -> Result<Vec<NDArray>>;

/// Op backed by a pair of plain functions
struct BuiltinOp {
    name: &'static str,
    inputs: RangeInclusive<usize>,
    shape: ShapeFn,
    exec: ExecFn,
}

impl DeclarableOp for BuiltinOp {
    fn name(&self) -> &'static str {
        self.name
    }

    fn num_inputs(&self) -> RangeInclusive<usize> {
        self.inputs.clone()
    }

    fn calculate_output_shape(
        &self,
        inputs: &[&NDArray],
        args: &OpArgs,
    ) -> Result<Vec<ShapeDescriptor>> {
        (self.shape)(inputs, args)
    }

    fn execute(
        &self,
        ctx: &CpuContext,
        inputs: &[&NDArray],
        args: &OpArgs,
    ) -> Result<Vec<NDArray>> {
        (self.exec)(ctx, inputs, args)
    }
}

/// Name-keyed collection of declarable ops
#[derive(Clone, Default)]
pub struct OpRegistry {
    ops: HashMap<&'static str, Arc<dyn DeclarableOp>>,
}

impl OpRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in op
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for op in builtin_ops() {
            registry.ops.insert(op.name, Arc::new(op));
        }
        registry
    }

    /// Process-wide registry of built-in ops
    pub fn global() -> &'static OpRegistry {
        static REGISTRY: OnceLock<OpRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::with_builtins)
    }

    /// Register an op, replacing any op of the same name
    pub fn register<T: DeclarableOp + 'static>(&mut self, op: T) {
        self.ops.insert(op.name(), Arc::new(op));
    }

    /// Find an op by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn DeclarableOp>> {
        self.ops
            .get(name)
            .cloned()
            .ok_or_else(|| Error::invalid_argument("op", format!("no op named '{name}'")))
    }

    /// Check whether an op is registered
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.ops.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Output descriptors of op `name` without running it
    pub fn calculate_output_shape(
        &self,
        name: &str,
        inputs: &[&NDArray],
        args: &OpArgs,
    ) -> Result<Vec<ShapeDescriptor>> {
        let op = self.get(name)?;
        check_arity(op.as_ref(), inputs.len())?;
        op.calculate_output_shape(inputs, args)
    }

    /// Validate, infer output shapes, then run op `name`
    pub fn execute(
        &self,
        ctx: &CpuContext,
        name: &str,
        inputs: &[&NDArray],
        args: &OpArgs,
    ) -> Result<Vec<NDArray>> {
        let op = self.get(name)?;
        check_arity(op.as_ref(), inputs.len())?;
        let expected = op.calculate_output_shape(inputs, args)?;
        tracing::debug!(
            op = op.name(),
            inputs = inputs.len(),
            ints = ?args.ints,
            bools = ?args.bools,
            outputs = ?expected.iter().map(|d| d.shape().to_vec()).collect::<Vec<_>>(),
            "execute declarable op"
        );

        let outputs = op.execute(ctx, inputs, args)?;
        if outputs.len() != expected.len()
            || outputs
                .iter()
                .zip(&expected)
                .any(|(out, desc)| out.shape() != desc.shape())
        {
            return Err(Error::Internal(format!(
                "op '{}' produced shapes {:?}, shape function gave {:?}",
                op.name(),
                outputs.iter().map(|o| o.shape().to_vec()).collect::<Vec<_>>(),
                expected.iter().map(|d| d.shape().to_vec()).collect::<Vec<_>>()
            )));
        }
        Ok(outputs)
    }
}

impl fmt::Debug for OpRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpRegistry")
            .field("ops", &self.names())
            .finish()
    }
}

fn check_arity(op: &dyn DeclarableOp, got: usize) -> Result<()> {
    let accepted = op.num_inputs();
    if accepted.contains(&got) {
        return Ok(());
    }
    Err(Error::invalid_argument(
        "inputs",
        format!(
            "op '{}' takes {}..={} inputs, got {got}",
            op.name(),
            accepted.start(),
            accepted.end()
        ),
    ))
}

// ============================================================================
// Argument decoding
// ============================================================================

fn input<'a>(inputs: &[&'a NDArray], i: usize, what: &'static str) -> Result<&'a NDArray> {
    inputs
        .get(i)
        .copied()
        .ok_or_else(|| Error::invalid_argument(what, format!("missing input {i}")))
}

fn to_usize(value: i64, what: &'static str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::invalid_argument(what, format!("must be non-negative, got {value}")))
}

fn usize_list(values: &[i64], what: &'static str) -> Result<Vec<usize>> {
    values.iter().map(|&v| to_usize(v, what)).collect()
}

/// Axes from the int attributes, else from tensor input `i`, else all axes
fn axes_arg(inputs: &[&NDArray], i: usize, args: &OpArgs) -> Result<Vec<isize>> {
    if !args.ints.is_empty() {
        return Ok(args.ints.iter().map(|&a| a as isize).collect());
    }
    match inputs.get(i) {
        Some(axes) => read_int_list(axes, "axes"),
        None => Ok(Vec::new()),
    }
}

/// Class count from scalar tensor input `i`, else int attribute 0
fn num_classes_arg(inputs: &[&NDArray], i: usize, args: &OpArgs) -> Result<usize> {
    let value = match inputs.get(i) {
        Some(tensor) => {
            let values = read_int_list(tensor, "num_classes")?;
            match values.as_slice() {
                [n] => *n as i64,
                _ => {
                    return Err(Error::invalid_argument(
                        "num_classes",
                        format!("expected a single value, got {}", values.len()),
                    ));
                }
            }
        }
        None => *args
            .ints
            .first()
            .ok_or_else(|| Error::invalid_argument("num_classes", "not supplied"))?,
    };
    to_usize(value, "num_classes")
}

/// Repetitions from tensor input `i` when present, else the int attributes
fn reps_arg(inputs: &[&NDArray], i: Option<usize>, args: &OpArgs) -> Result<Vec<usize>> {
    match i.and_then(|i| inputs.get(i)) {
        Some(reps) => {
            let reps: Vec<i64> = read_int_list(reps, "reps")?.into_iter().map(|r| r as i64).collect();
            usize_list(&reps, "reps")
        }
        None => usize_list(&args.ints, "reps"),
    }
}

fn conv_options(args: &OpArgs, weight: &NDArray) -> Result<Conv2dOptions> {
    let weight_format = WeightFormat::from_code(args.int_or(10, 0))?;
    let data_format = match args.int_or(9, 0) {
        0 => DataFormat::Nchw,
        1 => DataFormat::Nhwc,
        other => {
            return Err(Error::invalid_argument(
                "data_format",
                format!("expected 0 (NCHW) or 1 (NHWC), got {other}"),
            ));
        }
    };
    let padding = PaddingMode::from_flag(
        args.int_or(8, 0) != 0,
        to_usize(args.int_or(4, 0), "pad_h")?,
        to_usize(args.int_or(5, 0), "pad_w")?,
    );

    validate_rank(weight.shape(), 4, "weight", "conv2d")?;
    let (kh, kw, _, _) = weight_format.kernel_dims(weight.shape());
    let declared = (
        to_usize(args.int_or(0, 0), "kernel_h")?,
        to_usize(args.int_or(1, 0), "kernel_w")?,
    );
    if (declared.0 != 0 && declared.0 != kh) || (declared.1 != 0 && declared.1 != kw) {
        return Err(Error::shape_mismatch(&[declared.0, declared.1], &[kh, kw]));
    }

    Ok(Conv2dOptions {
        stride: (
            to_usize(args.int_or(2, 1), "stride_h")?,
            to_usize(args.int_or(3, 1), "stride_w")?,
        ),
        dilation: (
            to_usize(args.int_or(6, 1), "dilation_h")?,
            to_usize(args.int_or(7, 1), "dilation_w")?,
        ),
        padding,
        data_format,
        weight_format,
    })
}

/// Split sconv2d's optional inputs into (pointwise weights, bias)
fn sconv2d_operands<'a>(inputs: &[&'a NDArray]) -> (Option<&'a NDArray>, Option<&'a NDArray>) {
    match inputs {
        [_, _, point, bias, ..] => (Some(*point), Some(*bias)),
        [_, _, third] if third.rank() == 4 => (Some(*third), None),
        [_, _, bias] => (None, Some(*bias)),
        _ => (None, None),
    }
}

struct PatchArgs {
    kernel: (usize, usize),
    strides: (usize, usize),
    rates: (usize, usize),
    padding: PaddingMode,
}

fn patch_args(args: &OpArgs) -> Result<PatchArgs> {
    let int = |i: usize, what: &'static str| to_usize(args.int_or(i, 1), what);
    Ok(PatchArgs {
        kernel: (int(0, "kernel_h")?, int(1, "kernel_w")?),
        strides: (int(2, "stride_h")?, int(3, "stride_w")?),
        rates: (int(4, "rate_h")?, int(5, "rate_w")?),
        padding: if args.bool_or(0, false) {
            PaddingMode::Same
        } else {
            PaddingMode::Valid
        },
    })
}

fn same_dtype_desc(shape: &[usize], like: &NDArray) -> ShapeDescriptor {
    ShapeDescriptor::contiguous(shape, Order::C, like.dtype())
}

// ============================================================================
// Shape functions
// ============================================================================

fn reduce_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let x = input(inputs, 0, "input")?;
    let axes = axes_arg(inputs, 1, args)?;
    let desc = eval_reduce_shape_info(Order::C, &axes, x.descriptor(), args.bool_or(0, false), false)?;
    Ok(vec![desc])
}

fn moments_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let desc = reduce_shape(inputs, args)?;
    Ok(vec![desc[0].clone(), desc[0].clone()])
}

fn segment_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let data = input(inputs, 0, "data")?;
    let ids = input(inputs, 1, "ids")?;
    let num_classes = num_classes_arg(inputs, 2, args)?;
    let shape = segment_output_shape(data.shape(), ids.shape(), num_classes)?;
    Ok(vec![same_dtype_desc(&shape, data)])
}

fn segment_bp_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let data = input(inputs, 0, "data")?;
    let ids = input(inputs, 1, "ids")?;
    let num_classes = num_classes_arg(inputs, 3, args)?;
    segment_output_shape(data.shape(), ids.shape(), num_classes)?;
    Ok(vec![
        same_dtype_desc(data.shape(), data),
        same_dtype_desc(ids.shape(), ids),
    ])
}

fn tile_shape_fn(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let x = input(inputs, 0, "input")?;
    let reps = reps_arg(inputs, Some(1), args)?;
    Ok(vec![same_dtype_desc(&tile_shape(x.shape(), &reps)?, x)])
}

/// (input, reps, grad) of a tile_bp invocation
fn tile_bp_operands<'a>(
    inputs: &[&'a NDArray],
    args: &OpArgs,
) -> Result<(&'a NDArray, Vec<usize>, &'a NDArray)> {
    let x = input(inputs, 0, "input")?;
    if inputs.len() == 3 {
        Ok((x, reps_arg(inputs, Some(1), args)?, input(inputs, 2, "grad")?))
    } else {
        Ok((x, reps_arg(inputs, None, args)?, input(inputs, 1, "grad")?))
    }
}

fn tile_bp_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let (x, reps, grad) = tile_bp_operands(inputs, args)?;
    let tiled = tile_shape(x.shape(), &reps)?;
    if grad.shape() != tiled.as_slice() {
        return Err(Error::shape_mismatch(&tiled, grad.shape()));
    }
    Ok(vec![same_dtype_desc(x.shape(), x)])
}

fn conv2d_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let x = input(inputs, 0, "input")?;
    let w = input(inputs, 1, "weight")?;
    let options = conv_options(args, w)?;
    let bias = inputs.get(2).map(|b| b.shape());
    let (_, shape) = conv2d_output_shape(x.shape(), w.shape(), bias, &options)?;
    Ok(vec![same_dtype_desc(&shape, x)])
}

fn depthwise_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let x = input(inputs, 0, "input")?;
    let w = input(inputs, 1, "weight")?;
    let options = conv_options(args, w)?;
    let bias = inputs.get(2).map(|b| b.shape());
    let (_, _, shape) = depthwise_output_shape(x.shape(), w.shape(), bias, &options)?;
    Ok(vec![same_dtype_desc(&shape, x)])
}

fn sconv2d_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let x = input(inputs, 0, "input")?;
    let w = input(inputs, 1, "weight_depth")?;
    let options = conv_options(args, w)?;
    let (point, bias) = sconv2d_operands(inputs);
    let Some(point) = point else {
        let (_, _, shape) =
            depthwise_output_shape(x.shape(), w.shape(), bias.map(|b| b.shape()), &options)?;
        return Ok(vec![same_dtype_desc(&shape, x)]);
    };

    let (_, _, depth) = depthwise_output_shape(x.shape(), w.shape(), None, &options)?;
    let pointwise = options
        .with_stride((1, 1))
        .with_dilation((1, 1))
        .with_padding(PaddingMode::Valid);
    let (_, shape) =
        conv2d_output_shape(&depth, point.shape(), bias.map(|b| b.shape()), &pointwise)?;
    Ok(vec![same_dtype_desc(&shape, x)])
}

fn patches_shape(inputs: &[&NDArray], args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let x = input(inputs, 0, "images")?;
    validate_rank(x.shape(), 4, "images", "extract_image_patches")?;
    let p = patch_args(args)?;
    let dims = [x.shape()[0], x.shape()[1], x.shape()[2], x.shape()[3]];
    let params = Conv2dParams::new(dims, p.kernel, p.strides, p.rates, p.padding)?;
    let shape = [params.batch, params.out_h, params.out_w, params.patch_len()];
    Ok(vec![same_dtype_desc(&shape, x)])
}

fn matmul_shape(inputs: &[&NDArray], _args: &OpArgs) -> Result<Vec<ShapeDescriptor>> {
    let a = input(inputs, 0, "lhs")?;
    let b = input(inputs, 1, "rhs")?;
    validate_rank(a.shape(), 2, "lhs", "matmul")?;
    validate_rank(b.shape(), 2, "rhs", "matmul")?;
    if a.shape()[1] != b.shape()[0] {
        return Err(Error::shape_mismatch(&[a.shape()[1], b.shape()[1]], b.shape()));
    }
    Ok(vec![same_dtype_desc(&[a.shape()[0], b.shape()[1]], a)])
}

// ============================================================================
// Builtins
// ============================================================================

macro_rules! reduce_op {
    ($name:literal, $method:ident) => {
        BuiltinOp {
            name: $name,
            inputs: 1..=2,
            shape: reduce_shape,
            exec: |ctx, inputs, args| {
                let axes = axes_arg(inputs, 1, args)?;
                Ok(vec![ctx.$method(inputs[0], &axes, args.bool_or(0, false))?])
            },
        }
    };
}

macro_rules! segment_op {
    ($name:literal, $method:ident) => {
        BuiltinOp {
            name: $name,
            inputs: 2..=3,
            shape: segment_shape,
            exec: |ctx, inputs, args| {
                let n = num_classes_arg(inputs, 2, args)?;
                Ok(vec![ctx.$method(inputs[0], inputs[1], n)?])
            },
        }
    };
}

macro_rules! segment_bp_op {
    ($name:literal, $method:ident) => {
        BuiltinOp {
            name: $name,
            inputs: 3..=4,
            shape: segment_bp_shape,
            exec: |ctx, inputs, args| {
                let n = num_classes_arg(inputs, 3, args)?;
                let (grad_data, grad_ids) = ctx.$method(inputs[0], inputs[1], inputs[2], n)?;
                Ok(vec![grad_data, grad_ids])
            },
        }
    };
}

fn builtin_ops() -> Vec<BuiltinOp> {
    vec![
        reduce_op!("reduce_sum", sum),
        reduce_op!("reduce_mean", mean),
        reduce_op!("reduce_max", max),
        reduce_op!("reduce_min", min),
        reduce_op!("reduce_prod", prod),
        BuiltinOp {
            name: "reduce_variance",
            inputs: 1..=2,
            shape: reduce_shape,
            exec: |ctx, inputs, args| {
                let axes = axes_arg(inputs, 1, args)?;
                let correction = usize::from(args.bool_or(1, false));
                Ok(vec![ctx.var(inputs[0], &axes, args.bool_or(0, false), correction)?])
            },
        },
        BuiltinOp {
            name: "reduce_stdev",
            inputs: 1..=2,
            shape: reduce_shape,
            exec: |ctx, inputs, args| {
                let axes = axes_arg(inputs, 1, args)?;
                let correction = usize::from(args.bool_or(1, false));
                Ok(vec![ctx.std(inputs[0], &axes, args.bool_or(0, false), correction)?])
            },
        },
        BuiltinOp {
            name: "moments",
            inputs: 1..=2,
            shape: moments_shape,
            exec: |ctx, inputs, args| {
                let axes = axes_arg(inputs, 1, args)?;
                let (mean, variance) = ctx.moments(inputs[0], &axes, args.bool_or(0, false))?;
                Ok(vec![mean, variance])
            },
        },
        segment_op!("unsorted_segment_min", unsorted_segment_min),
        segment_op!("unsorted_segment_max", unsorted_segment_max),
        segment_op!("unsorted_segment_sum", unsorted_segment_sum),
        segment_op!("unsorted_segment_prod", unsorted_segment_prod),
        segment_op!("unsorted_segment_mean", unsorted_segment_mean),
        segment_bp_op!("unsorted_segment_min_bp", unsorted_segment_min_bp),
        segment_bp_op!("unsorted_segment_max_bp", unsorted_segment_max_bp),
        BuiltinOp {
            name: "tile",
            inputs: 1..=2,
            shape: tile_shape_fn,
            exec: |ctx, inputs, args| {
                let reps = reps_arg(inputs, Some(1), args)?;
                Ok(vec![ctx.tile(inputs[0], &reps)?])
            },
        },
        BuiltinOp {
            name: "tile_bp",
            inputs: 2..=3,
            shape: tile_bp_shape,
            exec: |ctx, inputs, args| {
                let (x, reps, grad) = tile_bp_operands(inputs, args)?;
                Ok(vec![ctx.tile_bp(x, grad, &reps)?])
            },
        },
        BuiltinOp {
            name: "conv2d",
            inputs: 2..=3,
            shape: conv2d_shape,
            exec: |ctx, inputs, args| {
                let options = conv_options(args, inputs[1])?;
                Ok(vec![ctx.conv2d(inputs[0], inputs[1], inputs.get(2).copied(), &options)?])
            },
        },
        BuiltinOp {
            name: "depthwise_conv2d",
            inputs: 2..=3,
            shape: depthwise_shape,
            exec: |ctx, inputs, args| {
                let options = conv_options(args, inputs[1])?;
                Ok(vec![ctx.depthwise_conv2d(
                    inputs[0],
                    inputs[1],
                    inputs.get(2).copied(),
                    &options,
                )?])
            },
        },
        BuiltinOp {
            name: "sconv2d",
            inputs: 2..=4,
            shape: sconv2d_shape,
            exec: |ctx, inputs, args| {
                let options = conv_options(args, inputs[1])?;
                let (point, bias) = sconv2d_operands(inputs);
                Ok(vec![ctx.sconv2d(inputs[0], inputs[1], point, bias, &options)?])
            },
        },
        BuiltinOp {
            name: "extract_image_patches",
            inputs: 1..=1,
            shape: patches_shape,
            exec: |ctx, inputs, args| {
                let p = patch_args(args)?;
                Ok(vec![ctx.extract_image_patches(
                    inputs[0], p.kernel, p.strides, p.rates, p.padding,
                )?])
            },
        },
        BuiltinOp {
            name: "matmul",
            inputs: 2..=2,
            shape: matmul_shape,
            exec: |ctx, inputs, _| Ok(vec![ctx.matmul(inputs[0], inputs[1])?]),
        },
    ]
}

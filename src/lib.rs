//! # ndexec
//!
//! **Strided N-dimensional array operation execution layer.**
//!
//! ndexec executes dense and strided NDArray operations (reductions,
//! unsorted segment aggregation, tiling, convolutions, string re-encoding)
//! against arbitrary shape, stride, ordering and dtype combinations on the
//! CPU. Given an array's shape metadata and an operation it computes the
//! output shape, selects a dtype-specialized kernel and drives the element
//! traversal across a worker pool.
//!
//! ## Features
//!
//! - **Arrays**: 'c' and 'f' ordering, views over shared reference-counted
//!   buffers (permute, reshape, broadcast), element-wise-stride detection
//! - **Shape algebra**: reductions, broadcasting, convolution extents and
//!   padding, tensor-along-dimension decomposition
//! - **Strings**: UTF-8/16/32 arrays in an offset-table layout, parallel
//!   re-encoding and broadcast assignment
//! - **Operations**: sum/mean/min/max/prod, variance and moments, unsorted
//!   segment reductions and their gradients, tile and its gradient, conv2d,
//!   depthwise and separable conv2d, image patch extraction, matmul
//! - **Declarable ops**: name-keyed registry with attribute lists and shape
//!   inference ahead of allocation
//!
//! ## Quick Start
//!
//! ```
//! use ndexec::prelude::*;
//!
//! let ctx = CpuContext::new().unwrap();
//! let a = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
//! let sums = ctx.sum(&a, &[1], false).unwrap();
//! assert_eq!(sums.to_vec::<f32>().unwrap(), vec![6.0, 15.0]);
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded kernels
//! - `f16`: half-precision floats (F16, BF16)
//! - `serde`: serialization of options, attributes and node metadata

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod introspect;
pub mod ops;
pub mod runtime;
pub mod shape;
pub mod string;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::introspect::NodeMeta;
    pub use crate::ops::{
        Conv2dOptions, ConvOps, DataFormat, DeclarableOp, MatmulOps, OpArgs, OpRegistry,
        ReduceOps, SegmentOps, StatisticalOps, TileOps, WeightFormat,
    };
    pub use crate::runtime::cpu::CpuContext;
    pub use crate::runtime::{EngineConfig, ParallelismConfig};
    pub use crate::shape::PaddingMode;
    pub use crate::string::Encoding;
    pub use crate::tensor::{NDArray, Order, ShapeDescriptor};
}

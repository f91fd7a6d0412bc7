//! Tensor operations
//!
//! Operations are defined as traits implemented by
//! [`CpuContext`](crate::runtime::cpu::CpuContext). The context gives every
//! operation access to the workspace its outputs are charged to and to the
//! worker pool its kernels run on.
//!
//! ```text
//! CpuContext
//!   ├── ReduceOps       sum, mean, max, min, prod
//!   ├── StatisticalOps  var, std, moments
//!   ├── SegmentOps      unsorted_segment_{min,max,sum,prod,mean}, *_bp
//!   ├── TileOps         tile, tile_bp
//!   ├── ConvOps         conv2d, depthwise_conv2d, sconv2d, extract_image_patches
//!   └── MatmulOps       matmul
//! ```
//!
//! [`declarable`] wraps the same operations behind a name-keyed registry
//! with integer/float/boolean attribute lists and a shape function that runs
//! before any allocation.

pub mod conv_common;
mod cpu;
pub mod declarable;
pub mod dispatch;
mod traits;

pub use conv_common::{Conv2dOptions, DataFormat, WeightFormat};
pub use declarable::{DeclarableOp, OpArgs, OpRegistry};
pub use dispatch::DispatchTable;
pub use traits::*;

//! CPU kernel implementations
//!
//! Kernels are safe functions over dense slices (or TAD offset tables),
//! generic over `T: Element`. They write their output through
//! [`parallel_for_slices`](crate::runtime::parallel_for_slices) so every
//! worker owns a disjoint window.

pub mod conv;
pub mod matmul;
pub mod reduce;
pub mod segment;
pub mod tile;

pub use conv::{depthwise_conv2d_kernel, im2col_kernel};
pub use matmul::{add_row_bias_kernel, matmul_kernel};
pub use reduce::{Reduction, moments_kernel, reduce_kernel, variance_kernel};
pub use segment::{
    unsorted_segment_extremum_bp_kernel, unsorted_segment_kernel, validate_segment_ids,
};
pub use tile::{tile_bp_kernel, tile_kernel};

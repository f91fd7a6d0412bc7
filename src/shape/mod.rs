//! Shape algebra
//!
//! Pure functions computing output descriptors for reductions, convolutions,
//! broadcasts and tiling, plus tensor-along-dimension decomposition. Nothing
//! here touches array data.

mod conv;
mod index;
mod reduce;
mod tad;

pub use crate::tensor::layout::{broadcast_shapes, compute_strides};
pub use conv::{PaddingMode, calc_out_dim, compute_same_padding, resolve_padding_2d};
pub use index::{segment_output_shape, sub_array_index, tile_shape};
pub use reduce::{eval_reduce_shape_info, normalize_axes, reduced_shape};
pub use tad::TadPack;

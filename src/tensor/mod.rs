//! Array types
//!
//! This module provides the `NDArray` view type, the `ShapeDescriptor` that
//! maps logical indices onto storage, and the reference-counted `DataBuffer`.

mod core;
pub(crate) mod layout;
mod storage;

pub use core::NDArray;
pub use layout::{Ews, OffsetIter, Order, Shape, ShapeDescriptor, Strides};
pub use storage::{DataBuffer, STRING_OFFSET_BYTES};

//! Operation traits.
//!
//! Each trait groups one family of operations. [`CpuContext`](crate::runtime::cpu::CpuContext)
//! implements all of them in `ops::cpu`.

mod conv;
mod matmul;
mod reduce;
mod segment;
mod statistics;
mod tile;

pub use conv::ConvOps;
pub use matmul::MatmulOps;
pub use reduce::ReduceOps;
pub use segment::SegmentOps;
pub use statistics::StatisticalOps;
pub use tile::TileOps;

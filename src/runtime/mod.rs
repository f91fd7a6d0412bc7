//! Execution runtime
//!
//! ```text
//! CpuContext (one per caller)
//! ├── EngineConfig      parallelism + workspace limit
//! ├── Workspace         byte accounting for every buffer the context allocates
//! └── rayon::ThreadPool workers driving parallel_for / parallel_for_slices
//! ```
//!
//! There is no global workspace or pool; every allocating operation takes
//! the context explicitly.

mod allocator;
pub mod config;
pub mod cpu;
pub(crate) mod helpers;
pub mod parallel;

pub use allocator::{Allocator, Workspace};
pub use config::{EngineConfig, ParallelismConfig};
pub use parallel::{parallel_for, parallel_for_slices};

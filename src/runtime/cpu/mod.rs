//! CPU execution back-end

mod client;
pub mod kernels;

pub use client::CpuContext;

//! CPU implementation of the operation traits.
//!
//! Each operation family has its own module. Implementations validate and
//! compute output shapes before allocating, bring inputs into dense 'c'
//! order where a kernel needs it, and allocate outputs through the context
//! workspace.

mod conv;
mod matmul;
mod reduce;
mod segment;
mod statistics;
mod tile;

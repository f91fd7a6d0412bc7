use crate::error::Result;
use crate::tensor::NDArray;

/// Reduction operations
///
/// `axes` may be negative (counted from the last dimension); an empty list
/// reduces over every axis. Without `keep_dims` reduced axes are dropped; a
/// full reduction of a rank-1 array yields shape `[1]`, of any other rank a
/// scalar. Outputs are dense in 'c' order.
pub trait ReduceOps {
    /// Sum along axes
    fn sum(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray>;

    /// Mean along axes
    fn mean(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray>;

    /// Maximum along axes
    fn max(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray>;

    /// Minimum along axes
    fn min(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray>;

    /// Product along axes
    fn prod(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<NDArray>;
}

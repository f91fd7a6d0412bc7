use crate::error::Result;
use crate::tensor::NDArray;

/// Statistical operations
pub trait StatisticalOps {
    /// Variance along axes
    ///
    /// `correction` is subtracted from the element count in the denominator
    /// (0 = biased, 1 = sample variance). Floating-point dtypes only.
    fn var(&self, a: &NDArray, axes: &[isize], keep_dims: bool, correction: usize)
    -> Result<NDArray>;

    /// Standard deviation along axes
    fn std(&self, a: &NDArray, axes: &[isize], keep_dims: bool, correction: usize)
    -> Result<NDArray>;

    /// Mean and biased variance along axes, computed in a single pass
    ///
    /// # Example
    ///
    /// ```
    /// use ndexec::prelude::*;
    /// let ctx = CpuContext::new().unwrap();
    /// let a = NDArray::from_slice(&[1.0f64, 3.0, 2.0, 6.0], &[2, 2]).unwrap();
    /// let (mean, var) = ctx.moments(&a, &[1], false).unwrap();
    /// assert_eq!(mean.to_vec::<f64>().unwrap(), vec![2.0, 4.0]);
    /// assert_eq!(var.to_vec::<f64>().unwrap(), vec![1.0, 4.0]);
    /// ```
    fn moments(&self, a: &NDArray, axes: &[isize], keep_dims: bool) -> Result<(NDArray, NDArray)>;

    /// [`moments`](Self::moments) with the axes supplied as an integer tensor
    fn moments_dynamic(
        &self,
        a: &NDArray,
        axes: &NDArray,
        keep_dims: bool,
    ) -> Result<(NDArray, NDArray)>;
}

use crate::error::Result;
use crate::tensor::NDArray;

/// Matrix multiplication
pub trait MatmulOps {
    /// `[m, k] @ [k, n] -> [m, n]` for numeric dtypes
    fn matmul(&self, a: &NDArray, b: &NDArray) -> Result<NDArray>;
}

use crate::error::Result;
use crate::tensor::NDArray;

/// Tiling operations
pub trait TileOps {
    /// Repeat `a` `reps[d]` times along every dimension `d`
    fn tile(&self, a: &NDArray, reps: &[usize]) -> Result<NDArray>;

    /// Gradient of [`tile`](Self::tile)
    ///
    /// `grad` has the tiled shape; the result has the shape of `input` and
    /// holds, for every element, the sum of the gradients of all its replicas.
    fn tile_bp(&self, input: &NDArray, grad: &NDArray, reps: &[usize]) -> Result<NDArray>;
}

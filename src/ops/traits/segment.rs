use crate::error::Result;
use crate::tensor::NDArray;

/// Unsorted segment reductions
///
/// Row `i` of `data` (its first dimension) is reduced into output row
/// `ids[i]`. `ids` is an integer tensor that is flattened to a vector; it
/// must hold one id per row, each in `[0, num_classes)`, otherwise the call
/// fails with a range error naming the offending id and the bound. The
/// output shape is `[num_classes, data.shape[1..]]`. Classes that receive no
/// row hold the identity of the reduction.
pub trait SegmentOps {
    /// Element-wise minimum per class
    fn unsorted_segment_min(&self, data: &NDArray, ids: &NDArray, num_classes: usize)
    -> Result<NDArray>;

    /// Element-wise maximum per class
    fn unsorted_segment_max(&self, data: &NDArray, ids: &NDArray, num_classes: usize)
    -> Result<NDArray>;

    /// Sum per class
    fn unsorted_segment_sum(&self, data: &NDArray, ids: &NDArray, num_classes: usize)
    -> Result<NDArray>;

    /// Product per class
    fn unsorted_segment_prod(
        &self,
        data: &NDArray,
        ids: &NDArray,
        num_classes: usize,
    ) -> Result<NDArray>;

    /// Mean per class
    fn unsorted_segment_mean(
        &self,
        data: &NDArray,
        ids: &NDArray,
        num_classes: usize,
    ) -> Result<NDArray>;

    /// Gradient of [`unsorted_segment_min`](Self::unsorted_segment_min)
    ///
    /// Returns the gradient for `data` and a zero gradient shaped like `ids`.
    /// The gradient of each class and column goes to the first row (in row
    /// order) that holds the minimum.
    fn unsorted_segment_min_bp(
        &self,
        data: &NDArray,
        ids: &NDArray,
        grad: &NDArray,
        num_classes: usize,
    ) -> Result<(NDArray, NDArray)>;

    /// Gradient of [`unsorted_segment_max`](Self::unsorted_segment_max)
    fn unsorted_segment_max_bp(
        &self,
        data: &NDArray,
        ids: &NDArray,
        grad: &NDArray,
        num_classes: usize,
    ) -> Result<(NDArray, NDArray)>;
}

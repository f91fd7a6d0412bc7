//! Convolution operations for neural network layers.

use crate::error::Result;
use crate::ops::conv_common::Conv2dOptions;
use crate::shape::PaddingMode;
use crate::tensor::NDArray;

/// Convolution operations.
///
/// # Memory Layout
///
/// - **Input**: `[N, C_in, H, W]` (NCHW) or `[N, H, W, C_in]` (NHWC), chosen by
///   [`Conv2dOptions::data_format`]
/// - **Weight**: `[kH, kW, C_in, C_out]`, `[C_out, C_in, kH, kW]` or
///   `[C_out, kH, kW, C_in]`, chosen by [`Conv2dOptions::weight_format`]
/// - **Bias**: `[C_out]`
/// - **Output**: same layout as the input
///
/// All operations require floating-point dtypes.
pub trait ConvOps {
    /// 2D convolution via im2col and matrix multiplication.
    ///
    /// Output spatial extents follow [`calc_out_dim`](crate::shape::calc_out_dim)
    /// with padding resolved from [`Conv2dOptions::padding`].
    ///
    /// # Errors
    ///
    /// - `InvalidRank` if input or weight is not 4D
    /// - `ShapeMismatch` if weight input channels or bias length disagree
    /// - `UnsupportedDType` if the dtype is not floating point
    fn conv2d(
        &self,
        input: &NDArray,
        weight: &NDArray,
        bias: Option<&NDArray>,
        options: &Conv2dOptions,
    ) -> Result<NDArray>;

    /// Depthwise 2D convolution with a channel multiplier.
    ///
    /// Weights are read as `(kH, kW, C_in, mC)` in the configured weight
    /// format; the output has `C_in * mC` channels, channel `c * mC + m`
    /// being input channel `c` convolved with filter `m`.
    fn depthwise_conv2d(
        &self,
        input: &NDArray,
        weight: &NDArray,
        bias: Option<&NDArray>,
        options: &Conv2dOptions,
    ) -> Result<NDArray>;

    /// Separable 2D convolution.
    ///
    /// Runs the depthwise stage, then (when `weight_point` is given) a 1×1
    /// pointwise conv2d with weights `(1, 1, C_in * mC, C_out)`. Without
    /// pointwise weights the depthwise output is the result and `bias`
    /// applies to it.
    fn sconv2d(
        &self,
        input: &NDArray,
        weight_depth: &NDArray,
        weight_point: Option<&NDArray>,
        bias: Option<&NDArray>,
        options: &Conv2dOptions,
    ) -> Result<NDArray>;

    /// Extract sliding patches from NHWC images.
    ///
    /// Output is `[N, oH, oW, kH * kW * C]` with every patch laid out as
    /// `(kh, kw, c)`. `rates` are the dilations.
    fn extract_image_patches(
        &self,
        input: &NDArray,
        kernel: (usize, usize),
        strides: (usize, usize),
        rates: (usize, usize),
        padding: PaddingMode,
    ) -> Result<NDArray>;
}

//! Shared validation and geometry for convolution operations.
//!
//! Kernels run on dense NHWC images and `[kH, kW, iC, oC]` weights; this
//! module resolves user-facing layouts and padding into that canonical form.

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::shape::{PaddingMode, calc_out_dim, resolve_padding_2d};

/// Memory layout of a 4D image batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataFormat {
    /// `[batch, channels, height, width]`
    #[default]
    Nchw,
    /// `[batch, height, width, channels]`
    Nhwc,
}

impl DataFormat {
    /// Split an image shape into `[batch, height, width, channels]`
    pub fn image_dims(self, shape: &[usize]) -> [usize; 4] {
        match self {
            Self::Nchw => [shape[0], shape[2], shape[3], shape[1]],
            Self::Nhwc => [shape[0], shape[1], shape[2], shape[3]],
        }
    }

    /// Build an image shape from `[batch, height, width, channels]`
    pub fn image_shape(self, [b, h, w, c]: [usize; 4]) -> [usize; 4] {
        match self {
            Self::Nchw => [b, c, h, w],
            Self::Nhwc => [b, h, w, c],
        }
    }

    /// Permutation taking this layout to NHWC
    pub fn to_nhwc(self) -> [usize; 4] {
        match self {
            Self::Nchw => [0, 2, 3, 1],
            Self::Nhwc => [0, 1, 2, 3],
        }
    }

    /// Permutation taking NHWC to this layout
    pub fn from_nhwc(self) -> [usize; 4] {
        match self {
            Self::Nchw => [0, 3, 1, 2],
            Self::Nhwc => [0, 1, 2, 3],
        }
    }
}

/// Layout of a convolution weight tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightFormat {
    /// 0: `[kH, kW, iC, oC]`
    #[default]
    HwIo,
    /// 1: `[oC, iC, kH, kW]`
    OiHw,
    /// 2: `[oC, kH, kW, iC]`
    OHwI,
}

impl WeightFormat {
    /// Decode the integer weight-format attribute
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::HwIo),
            1 => Ok(Self::OiHw),
            2 => Ok(Self::OHwI),
            other => Err(Error::invalid_argument(
                "weight_format",
                format!("expected 0, 1 or 2, got {other}"),
            )),
        }
    }

    /// Integer code of this format
    pub const fn code(self) -> i64 {
        match self {
            Self::HwIo => 0,
            Self::OiHw => 1,
            Self::OHwI => 2,
        }
    }

    /// `(kH, kW, iC, oC)` of a weight shape in this format
    pub fn kernel_dims(self, shape: &[usize]) -> (usize, usize, usize, usize) {
        match self {
            Self::HwIo => (shape[0], shape[1], shape[2], shape[3]),
            Self::OiHw => (shape[2], shape[3], shape[1], shape[0]),
            Self::OHwI => (shape[1], shape[2], shape[3], shape[0]),
        }
    }

    /// Permutation taking this format to `[kH, kW, iC, oC]`
    pub fn to_canonical(self) -> [usize; 4] {
        match self {
            Self::HwIo => [0, 1, 2, 3],
            Self::OiHw => [2, 3, 1, 0],
            Self::OHwI => [1, 2, 3, 0],
        }
    }

    /// Weight shape in this format for `(kH, kW, iC, oC)`
    pub fn shape_for(self, kh: usize, kw: usize, ic: usize, oc: usize) -> [usize; 4] {
        match self {
            Self::HwIo => [kh, kw, ic, oc],
            Self::OiHw => [oc, ic, kh, kw],
            Self::OHwI => [oc, kh, kw, ic],
        }
    }
}

/// Window hyper-parameters shared by the 2D convolution family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Conv2dOptions {
    /// (stride_h, stride_w)
    pub stride: (usize, usize),
    /// (dilation_h, dilation_w)
    pub dilation: (usize, usize),
    /// Padding policy
    pub padding: PaddingMode,
    /// Image layout of input and output
    pub data_format: DataFormat,
    /// Weight layout
    pub weight_format: WeightFormat,
}

impl Default for Conv2dOptions {
    fn default() -> Self {
        Self {
            stride: (1, 1),
            dilation: (1, 1),
            padding: PaddingMode::Valid,
            data_format: DataFormat::Nchw,
            weight_format: WeightFormat::HwIo,
        }
    }
}

impl Conv2dOptions {
    /// Set the strides
    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    /// Set the dilations
    pub fn with_dilation(mut self, dilation: (usize, usize)) -> Self {
        self.dilation = dilation;
        self
    }

    /// Set the padding policy
    pub fn with_padding(mut self, padding: PaddingMode) -> Self {
        self.padding = padding;
        self
    }

    /// Set the image layout
    pub fn with_data_format(mut self, data_format: DataFormat) -> Self {
        self.data_format = data_format;
        self
    }

    /// Set the weight layout
    pub fn with_weight_format(mut self, weight_format: WeightFormat) -> Self {
        self.weight_format = weight_format;
        self
    }
}

/// Resolved geometry of one 2D window pass over an NHWC batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dParams {
    /// Images in the batch
    pub batch: usize,
    /// Input channels
    pub c_in: usize,
    /// Input height
    pub height: usize,
    /// Input width
    pub width: usize,
    /// Kernel height
    pub kernel_h: usize,
    /// Kernel width
    pub kernel_w: usize,
    /// Vertical stride
    pub stride_h: usize,
    /// Horizontal stride
    pub stride_w: usize,
    /// Vertical dilation
    pub dilation_h: usize,
    /// Horizontal dilation
    pub dilation_w: usize,
    /// Zero rows above the image
    pub pad_top: usize,
    /// Zero rows below the image
    pub pad_bottom: usize,
    /// Zero columns left of the image
    pub pad_left: usize,
    /// Zero columns right of the image
    pub pad_right: usize,
    /// Output height
    pub out_h: usize,
    /// Output width
    pub out_w: usize,
}

impl Conv2dParams {
    /// Resolve padding and output extents for `[batch, h, w, c]` images
    pub fn new(
        [batch, height, width, c_in]: [usize; 4],
        (kernel_h, kernel_w): (usize, usize),
        stride: (usize, usize),
        dilation: (usize, usize),
        padding: PaddingMode,
    ) -> Result<Self> {
        validate_positive(kernel_h, "kernel_h")?;
        validate_positive(kernel_w, "kernel_w")?;
        validate_positive(stride.0, "stride_h")?;
        validate_positive(stride.1, "stride_w")?;
        validate_positive(dilation.0, "dilation_h")?;
        validate_positive(dilation.1, "dilation_w")?;

        let (pad_top, pad_bottom, pad_left, pad_right) =
            resolve_padding_2d(padding, height, width, kernel_h, kernel_w, stride, dilation);
        let out_h = calc_out_dim(height, kernel_h, stride.0, dilation.0, pad_top, pad_bottom);
        let out_w = calc_out_dim(width, kernel_w, stride.1, dilation.1, pad_left, pad_right);

        Ok(Self {
            batch,
            c_in,
            height,
            width,
            kernel_h,
            kernel_w,
            stride_h: stride.0,
            stride_w: stride.1,
            dilation_h: dilation.0,
            dilation_w: dilation.1,
            pad_top,
            pad_bottom,
            pad_left,
            pad_right,
            out_h,
            out_w,
        })
    }

    /// Elements in one unfolded patch (`kH * kW * iC`)
    #[inline]
    pub fn patch_len(&self) -> usize {
        self.kernel_h * self.kernel_w * self.c_in
    }

    /// Output pixels over the whole batch (`batch * oH * oW`)
    #[inline]
    pub fn out_pixels(&self) -> usize {
        self.batch * self.out_h * self.out_w
    }

    /// Output shape in `format` with `channels` output channels
    pub fn output_shape(&self, format: DataFormat, channels: usize) -> [usize; 4] {
        format.image_shape([self.batch, self.out_h, self.out_w, channels])
    }
}

/// Validates the rank of an argument.
#[inline]
pub fn validate_rank(
    shape: &[usize],
    expected: usize,
    arg: &'static str,
    op: &'static str,
) -> Result<()> {
    if shape.len() != expected {
        return Err(Error::InvalidRank {
            op,
            arg,
            expected,
            got: shape.len(),
        });
    }
    Ok(())
}

/// Validates that a dtype is a floating-point type.
#[inline]
pub fn validate_float_dtype(dtype: DType, op: &'static str) -> Result<()> {
    if !dtype.is_float() {
        return Err(Error::UnsupportedDType { dtype, op });
    }
    Ok(())
}

/// Validates that two operands share a dtype.
#[inline]
pub fn validate_same_dtype(lhs: DType, rhs: DType) -> Result<()> {
    if lhs != rhs {
        return Err(Error::DTypeMismatch { lhs, rhs });
    }
    Ok(())
}

/// Validates that a window hyper-parameter is non-zero.
#[inline]
pub fn validate_positive(value: usize, name: &'static str) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid_argument(name, "must be positive, got 0"));
    }
    Ok(())
}

/// Validates a per-channel bias.
#[inline]
pub fn validate_bias(bias_shape: &[usize], channels: usize, op: &'static str) -> Result<()> {
    validate_rank(bias_shape, 1, "bias", op)?;
    if bias_shape[0] != channels {
        return Err(Error::shape_mismatch(&[channels], bias_shape));
    }
    Ok(())
}

/// Output shape of conv2d, validated before any allocation
pub fn conv2d_output_shape(
    input_shape: &[usize],
    weight_shape: &[usize],
    bias_shape: Option<&[usize]>,
    options: &Conv2dOptions,
) -> Result<(Conv2dParams, [usize; 4])> {
    const OP: &str = "conv2d";
    validate_rank(input_shape, 4, "input", OP)?;
    validate_rank(weight_shape, 4, "weight", OP)?;

    let image = options.data_format.image_dims(input_shape);
    let (kh, kw, ic, oc) = options.weight_format.kernel_dims(weight_shape);
    if ic != image[3] {
        return Err(Error::shape_mismatch(
            &options.weight_format.shape_for(kh, kw, image[3], oc),
            weight_shape,
        ));
    }
    if let Some(bias) = bias_shape {
        validate_bias(bias, oc, OP)?;
    }

    let params = Conv2dParams::new(image, (kh, kw), options.stride, options.dilation, options.padding)?;
    let shape = params.output_shape(options.data_format, oc);
    Ok((params, shape))
}

/// Output shape of depthwise conv2d; weights carry `(kH, kW, iC, mC)`
pub fn depthwise_output_shape(
    input_shape: &[usize],
    weight_shape: &[usize],
    bias_shape: Option<&[usize]>,
    options: &Conv2dOptions,
) -> Result<(Conv2dParams, usize, [usize; 4])> {
    const OP: &str = "depthwise_conv2d";
    validate_rank(input_shape, 4, "input", OP)?;
    validate_rank(weight_shape, 4, "weight", OP)?;

    let image = options.data_format.image_dims(input_shape);
    let (kh, kw, ic, multiplier) = options.weight_format.kernel_dims(weight_shape);
    if ic != image[3] {
        return Err(Error::shape_mismatch(
            &options.weight_format.shape_for(kh, kw, image[3], multiplier),
            weight_shape,
        ));
    }
    if let Some(bias) = bias_shape {
        validate_bias(bias, ic * multiplier, OP)?;
    }

    let params = Conv2dParams::new(image, (kh, kw), options.stride, options.dilation, options.padding)?;
    let shape = params.output_shape(options.data_format, ic * multiplier);
    Ok((params, multiplier, shape))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_formats_agree() {
        for format in [WeightFormat::HwIo, WeightFormat::OiHw, WeightFormat::OHwI] {
            let shape = format.shape_for(3, 5, 2, 7);
            assert_eq!(format.kernel_dims(&shape), (3, 5, 2, 7));
            let perm = format.to_canonical();
            let canonical: Vec<usize> = perm.iter().map(|&p| shape[p]).collect();
            assert_eq!(canonical, vec![3, 5, 2, 7]);
            assert_eq!(WeightFormat::from_code(format.code()).unwrap(), format);
        }
        assert!(WeightFormat::from_code(3).is_err());
    }

    #[test]
    fn test_conv2d_shapes() {
        let options = Conv2dOptions::default()
            .with_stride((2, 2))
            .with_padding(PaddingMode::Same);
        let (_, shape) = conv2d_output_shape(&[1, 3, 10, 10], &[3, 3, 3, 8], None, &options).unwrap();
        assert_eq!(shape, [1, 8, 5, 5]);

        let valid = options.with_padding(PaddingMode::Valid);
        let (_, shape) = conv2d_output_shape(&[1, 3, 10, 10], &[3, 3, 3, 8], None, &valid).unwrap();
        assert_eq!(shape, [1, 8, 4, 4]);
    }

    #[test]
    fn test_conv2d_channel_mismatch() {
        let options = Conv2dOptions::default().with_data_format(DataFormat::Nhwc);
        assert!(conv2d_output_shape(&[1, 4, 4, 2], &[3, 3, 3, 8], None, &options).is_err());
        assert!(conv2d_output_shape(&[1, 4, 4, 3], &[3, 3, 3, 8], Some(&[4]), &options).is_err());
    }
}

//! CPU implementation of convolution operations.
//!
//! Every path works on NHWC images: inputs are permuted into NHWC (a view
//! when already there), weights into `[kH, kW, iC, oC]`, and the result is
//! permuted back into the caller's data format.

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::ConvOps;
use crate::ops::conv_common::{
    Conv2dOptions, Conv2dParams, conv2d_output_shape, depthwise_output_shape, validate_float_dtype,
    validate_positive, validate_rank, validate_same_dtype,
};
use crate::runtime::cpu::CpuContext;
use crate::runtime::cpu::kernels::{
    add_row_bias_kernel, depthwise_conv2d_kernel, im2col_kernel, matmul_kernel,
};
use crate::runtime::helpers::{ensure_contiguous, permute_contiguous};
use crate::shape::PaddingMode;
use crate::tensor::{NDArray, Order};
use crate::{dispatch_dtype, dispatch_float_dtype};

fn check_operand_dtypes(
    input: &NDArray,
    weight: &NDArray,
    bias: Option<&NDArray>,
    op: &'static str,
) -> Result<DType> {
    let dtype = input.dtype();
    validate_float_dtype(dtype, op)?;
    validate_same_dtype(dtype, weight.dtype())?;
    if let Some(bias) = bias {
        validate_same_dtype(dtype, bias.dtype())?;
    }
    Ok(dtype)
}

impl ConvOps for CpuContext {
    fn conv2d(
        &self,
        input: &NDArray,
        weight: &NDArray,
        bias: Option<&NDArray>,
        options: &Conv2dOptions,
    ) -> Result<NDArray> {
        const OP: &str = "conv2d";
        let dtype = check_operand_dtypes(input, weight, bias, OP)?;
        let (params, out_shape) =
            conv2d_output_shape(input.shape(), weight.shape(), bias.map(|b| b.shape()), options)?;
        let c_out = options.weight_format.kernel_dims(weight.shape()).3;
        tracing::debug!(
            input = ?input.shape(),
            weight = ?weight.shape(),
            out = ?out_shape,
            format = ?options.data_format,
            padding = options.padding.name(),
            %dtype,
            "conv2d"
        );

        let image = permute_contiguous(self, input, &options.data_format.to_nhwc())?;
        let weight = permute_contiguous(self, weight, &options.weight_format.to_canonical())?;
        let bias = bias.map(|b| ensure_contiguous(self, b)).transpose()?;

        let rows = params.out_pixels();
        let patch = params.patch_len();
        let mut cols = self.alloc(&[rows, patch], dtype, Order::C)?;
        let mut out = self.alloc(&[params.batch, params.out_h, params.out_w, c_out], dtype, Order::C)?;
        dispatch_float_dtype!(dtype, T => {
            im2col_kernel::<T>(self, image.data::<T>()?, &params, cols.data_mut::<T>()?)?;
            let dst = out.data_mut::<T>()?;
            matmul_kernel::<T>(self, cols.data::<T>()?, weight.data::<T>()?, dst, rows, c_out, patch, patch, c_out)?;
            if let Some(bias) = &bias {
                add_row_bias_kernel::<T>(self, dst, bias.data::<T>()?)?;
            }
        }, OP);
        drop(cols);

        permute_contiguous(self, &out, &options.data_format.from_nhwc())
    }

    fn depthwise_conv2d(
        &self,
        input: &NDArray,
        weight: &NDArray,
        bias: Option<&NDArray>,
        options: &Conv2dOptions,
    ) -> Result<NDArray> {
        const OP: &str = "depthwise_conv2d";
        let dtype = check_operand_dtypes(input, weight, bias, OP)?;
        let (params, multiplier, out_shape) =
            depthwise_output_shape(input.shape(), weight.shape(), bias.map(|b| b.shape()), options)?;
        tracing::debug!(
            input = ?input.shape(),
            weight = ?weight.shape(),
            out = ?out_shape,
            multiplier,
            %dtype,
            "depthwise_conv2d"
        );

        let image = permute_contiguous(self, input, &options.data_format.to_nhwc())?;
        let weight = permute_contiguous(self, weight, &options.weight_format.to_canonical())?;
        let bias = bias.map(|b| ensure_contiguous(self, b)).transpose()?;

        let c_out = params.c_in * multiplier;
        let mut out = self.alloc(&[params.batch, params.out_h, params.out_w, c_out], dtype, Order::C)?;
        dispatch_float_dtype!(dtype, T => {
            let bias = match &bias {
                Some(b) => Some(b.data::<T>()?),
                None => None,
            };
            depthwise_conv2d_kernel::<T>(
                self,
                image.data::<T>()?,
                weight.data::<T>()?,
                bias,
                &params,
                multiplier,
                out.data_mut::<T>()?,
            )?;
        }, OP);

        permute_contiguous(self, &out, &options.data_format.from_nhwc())
    }

    fn sconv2d(
        &self,
        input: &NDArray,
        weight_depth: &NDArray,
        weight_point: Option<&NDArray>,
        bias: Option<&NDArray>,
        options: &Conv2dOptions,
    ) -> Result<NDArray> {
        let Some(weight_point) = weight_point else {
            return self.depthwise_conv2d(input, weight_depth, bias, options);
        };

        validate_rank(weight_point.shape(), 4, "weight_point", "sconv2d")?;
        let (kh, kw, ic, oc) = options.weight_format.kernel_dims(weight_point.shape());
        if (kh, kw) != (1, 1) {
            return Err(Error::shape_mismatch(
                &options.weight_format.shape_for(1, 1, ic, oc),
                weight_point.shape(),
            ));
        }
        tracing::debug!(point = ?weight_point.shape(), "sconv2d pointwise stage");

        let depth = self.depthwise_conv2d(input, weight_depth, None, options)?;
        let pointwise = options
            .with_stride((1, 1))
            .with_dilation((1, 1))
            .with_padding(PaddingMode::Valid);
        self.conv2d(&depth, weight_point, bias, &pointwise)
    }

    fn extract_image_patches(
        &self,
        input: &NDArray,
        kernel: (usize, usize),
        strides: (usize, usize),
        rates: (usize, usize),
        padding: PaddingMode,
    ) -> Result<NDArray> {
        const OP: &str = "extract_image_patches";
        validate_rank(input.shape(), 4, "input", OP)?;
        validate_positive(rates.0, "rate_h")?;
        validate_positive(rates.1, "rate_w")?;
        let dims = [input.shape()[0], input.shape()[1], input.shape()[2], input.shape()[3]];
        let params = Conv2dParams::new(dims, kernel, strides, rates, padding)?;
        let dtype = input.dtype();
        tracing::debug!(input = ?input.shape(), ?kernel, ?strides, ?rates, padding = padding.name(), "extract_image_patches");

        let image = ensure_contiguous(self, input)?;
        let mut out = self.alloc(
            &[params.batch, params.out_h, params.out_w, params.patch_len()],
            dtype,
            Order::C,
        )?;
        dispatch_dtype!(dtype, T => {
            im2col_kernel::<T>(self, image.data::<T>()?, &params, out.data_mut::<T>()?)?;
        }, OP);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::conv_common::{DataFormat, WeightFormat};

    fn ctx() -> CpuContext {
        CpuContext::new().unwrap()
    }

    #[test]
    fn test_conv2d_nchw_valid() {
        let ctx = ctx();
        let input: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let input = NDArray::from_slice(&input, &[1, 1, 3, 3]).unwrap();
        let weight = NDArray::from_slice(&[1.0f32; 4], &[2, 2, 1, 1]).unwrap();
        let bias = NDArray::from_slice(&[0.5f32], &[1]).unwrap();
        let out = ctx
            .conv2d(&input, &weight, Some(&bias), &Conv2dOptions::default())
            .unwrap();
        assert_eq!(out.shape(), &[1, 1, 2, 2]);
        assert_eq!(out.to_vec::<f32>().unwrap(), vec![12.5, 16.5, 24.5, 28.5]);
    }

    #[test]
    fn test_conv2d_weight_formats_agree() {
        let ctx = ctx();
        let input: Vec<f64> = (0..2 * 4 * 4).map(|v| v as f64 * 0.25).collect();
        let input = NDArray::from_slice(&input, &[1, 4, 4, 2]).unwrap();
        let hwio: Vec<f64> = (0..3 * 3 * 2 * 2).map(|v| (v % 5) as f64 - 2.0).collect();
        let hwio = NDArray::from_slice(&hwio, &[3, 3, 2, 2]).unwrap();
        let base = Conv2dOptions::default()
            .with_data_format(DataFormat::Nhwc)
            .with_padding(PaddingMode::Same);
        let expected = ctx.conv2d(&input, &hwio, None, &base).unwrap();
        assert_eq!(expected.shape(), &[1, 4, 4, 2]);

        let oihw = hwio.permute(&[3, 2, 0, 1]).unwrap();
        let out = ctx
            .conv2d(&input, &oihw, None, &base.with_weight_format(WeightFormat::OiHw))
            .unwrap();
        assert_eq!(out.to_vec::<f64>().unwrap(), expected.to_vec::<f64>().unwrap());
    }

    #[test]
    fn test_sconv2d_without_pointwise_is_depthwise() {
        let ctx = ctx();
        let input = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 2, 1, 2]).unwrap();
        let depth = NDArray::from_slice(&[2.0f32, 3.0], &[1, 1, 2, 1]).unwrap();
        let options = Conv2dOptions::default();
        let out = ctx.sconv2d(&input, &depth, None, None, &options).unwrap();
        assert_eq!(out.to_vec::<f32>().unwrap(), vec![2.0, 4.0, 9.0, 12.0]);

        let point = NDArray::from_slice(&[1.0f32, 1.0], &[1, 1, 2, 1]).unwrap();
        let out = ctx.sconv2d(&input, &depth, Some(&point), None, &options).unwrap();
        assert_eq!(out.shape(), &[1, 1, 1, 2]);
        assert_eq!(out.to_vec::<f32>().unwrap(), vec![11.0, 16.0]);
    }

    #[test]
    fn test_extract_image_patches_same() {
        let ctx = ctx();
        let input = NDArray::from_slice(&[1i32, 2, 3, 4], &[1, 2, 2, 1]).unwrap();
        let out = ctx
            .extract_image_patches(&input, (2, 2), (2, 2), (1, 1), PaddingMode::Same)
            .unwrap();
        assert_eq!(out.shape(), &[1, 1, 1, 4]);
        assert_eq!(out.to_vec::<i32>().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_conv2d_rejects_integer_input() {
        let ctx = ctx();
        let input = NDArray::from_slice(&[1i32; 4], &[1, 1, 2, 2]).unwrap();
        let weight = NDArray::from_slice(&[1i32], &[1, 1, 1, 1]).unwrap();
        assert!(ctx.conv2d(&input, &weight, None, &Conv2dOptions::default()).is_err());
    }
}

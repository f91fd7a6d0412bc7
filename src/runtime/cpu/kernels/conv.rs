//! CPU convolution kernels.
//!
//! All kernels take dense NHWC images. Out-of-image taps read zero.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::conv_common::Conv2dParams;
use crate::runtime::cpu::CpuContext;
use crate::runtime::parallel_for_slices;

/// Input coordinate of output position `o` and kernel tap `k`, if inside
#[inline]
fn source_index(o: usize, k: usize, stride: usize, dilation: usize, pad: usize, extent: usize) -> Option<usize> {
    let i = (o * stride + k * dilation) as isize - pad as isize;
    (i >= 0 && (i as usize) < extent).then_some(i as usize)
}

fn check_input<T>(input: &[T], p: &Conv2dParams) -> Result<()> {
    let expected = p.batch * p.height * p.width * p.c_in;
    if input.len() != expected {
        return Err(Error::shape_mismatch(
            &[p.batch, p.height, p.width, p.c_in],
            &[input.len()],
        ));
    }
    Ok(())
}

/// Unfold image patches into rows (im2col).
///
/// `cols` is `[batch * out_h * out_w, kernel_h * kernel_w * c_in]`; within a
/// row the taps are ordered `(kh, kw, ic)`, matching a `[kH, kW, iC, oC]`
/// weight tensor reshaped to `[kH * kW * iC, oC]`.
pub fn im2col_kernel<T: Element>(
    ctx: &CpuContext,
    input: &[T],
    p: &Conv2dParams,
    cols: &mut [T],
) -> Result<()> {
    check_input(input, p)?;
    let patch = p.patch_len();
    if cols.len() != p.out_pixels() * patch {
        return Err(Error::shape_mismatch(&[p.out_pixels(), patch], &[cols.len()]));
    }

    parallel_for_slices(ctx, cols, patch, |first_row, window| {
        for (k, row) in window.chunks_mut(patch).enumerate() {
            let r = first_row + k;
            let ow = r % p.out_w;
            let oh = (r / p.out_w) % p.out_h;
            let b = r / (p.out_w * p.out_h);

            for kh in 0..p.kernel_h {
                let ih = source_index(oh, kh, p.stride_h, p.dilation_h, p.pad_top, p.height);
                for kw in 0..p.kernel_w {
                    let dst = &mut row[(kh * p.kernel_w + kw) * p.c_in..][..p.c_in];
                    let iw = source_index(ow, kw, p.stride_w, p.dilation_w, p.pad_left, p.width);
                    match (ih, iw) {
                        (Some(ih), Some(iw)) => {
                            let src = ((b * p.height + ih) * p.width + iw) * p.c_in;
                            dst.copy_from_slice(&input[src..src + p.c_in]);
                        }
                        _ => dst.fill(T::zero()),
                    }
                }
            }
        }
        Ok(())
    })
}

/// Depthwise 2D convolution with a channel multiplier.
///
/// `weights` is `[kH, kW, iC, mC]`; output channel `ic * mC + m` convolves
/// input channel `ic` with filter `m`. `out` is
/// `[batch, out_h, out_w, iC * mC]`.
pub fn depthwise_conv2d_kernel<T: Element>(
    ctx: &CpuContext,
    input: &[T],
    weights: &[T],
    bias: Option<&[T]>,
    p: &Conv2dParams,
    multiplier: usize,
    out: &mut [T],
) -> Result<()> {
    check_input(input, p)?;
    let c_out = p.c_in * multiplier;
    if weights.len() != p.kernel_h * p.kernel_w * c_out {
        return Err(Error::shape_mismatch(
            &[p.kernel_h, p.kernel_w, p.c_in, multiplier],
            &[weights.len()],
        ));
    }
    if let Some(bias) = bias.filter(|b| b.len() != c_out) {
        return Err(Error::shape_mismatch(&[c_out], &[bias.len()]));
    }
    if out.len() != p.out_pixels() * c_out {
        return Err(Error::shape_mismatch(&[p.out_pixels(), c_out], &[out.len()]));
    }

    parallel_for_slices(ctx, out, c_out, |first_pixel, window| {
        for (k, pixel) in window.chunks_mut(c_out).enumerate() {
            let r = first_pixel + k;
            let ow = r % p.out_w;
            let oh = (r / p.out_w) % p.out_h;
            let b = r / (p.out_w * p.out_h);

            match bias {
                Some(bias) => pixel.copy_from_slice(bias),
                None => pixel.fill(T::zero()),
            }
            for kh in 0..p.kernel_h {
                let Some(ih) = source_index(oh, kh, p.stride_h, p.dilation_h, p.pad_top, p.height)
                else {
                    continue;
                };
                for kw in 0..p.kernel_w {
                    let Some(iw) =
                        source_index(ow, kw, p.stride_w, p.dilation_w, p.pad_left, p.width)
                    else {
                        continue;
                    };
                    let src = &input[((b * p.height + ih) * p.width + iw) * p.c_in..][..p.c_in];
                    let taps = &weights[(kh * p.kernel_w + kw) * c_out..][..c_out];
                    for (ic, &x) in src.iter().enumerate() {
                        let lanes = ic * multiplier..(ic + 1) * multiplier;
                        for (o, &w) in pixel[lanes.clone()].iter_mut().zip(&taps[lanes]) {
                            *o = *o + x * w;
                        }
                    }
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::PaddingMode;

    fn params(h: usize, w: usize, c: usize, k: usize, padding: PaddingMode) -> Conv2dParams {
        Conv2dParams::new([1, h, w, c], (k, k), (1, 1), (1, 1), padding).unwrap()
    }

    #[test]
    fn test_im2col_valid() {
        let ctx = CpuContext::new().unwrap();
        let input: Vec<f32> = (1..=9).map(|v| v as f32).collect();
        let p = params(3, 3, 1, 2, PaddingMode::Valid);
        let mut cols = vec![0.0f32; p.out_pixels() * p.patch_len()];
        im2col_kernel(&ctx, &input, &p, &mut cols).unwrap();
        assert_eq!(
            cols,
            vec![
                1.0, 2.0, 4.0, 5.0, //
                2.0, 3.0, 5.0, 6.0, //
                4.0, 5.0, 7.0, 8.0, //
                5.0, 6.0, 8.0, 9.0,
            ]
        );
    }

    #[test]
    fn test_im2col_pads_with_zero() {
        let ctx = CpuContext::new().unwrap();
        let p = params(1, 1, 2, 3, PaddingMode::Same);
        assert_eq!((p.out_h, p.out_w), (1, 1));
        let mut cols = vec![9.0f64; p.patch_len()];
        im2col_kernel(&ctx, &[1.0, 2.0], &p, &mut cols).unwrap();
        let mut expected = vec![0.0; 18];
        expected[8] = 1.0;
        expected[9] = 2.0;
        assert_eq!(cols, expected);
    }

    #[test]
    fn test_depthwise_multiplier() {
        let ctx = CpuContext::new().unwrap();
        // 1x1 image, 2 channels, 1x1 kernel, multiplier 2
        let p = params(1, 1, 2, 1, PaddingMode::Valid);
        let weights = [1.0f32, 10.0, 2.0, 20.0];
        let mut out = [0.0f32; 4];
        depthwise_conv2d_kernel(&ctx, &[3.0, 5.0], &weights, Some(&[0.5; 4]), &p, 2, &mut out)
            .unwrap();
        assert_eq!(out, [3.5, 30.5, 10.5, 100.5]);
    }
}

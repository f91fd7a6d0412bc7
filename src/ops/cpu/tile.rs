//! CPU implementation of tile operations.

use crate::dispatch_dtype;
use crate::error::{Error, Result};
use crate::ops::TileOps;
use crate::runtime::cpu::CpuContext;
use crate::runtime::cpu::kernels::{tile_bp_kernel, tile_kernel};
use crate::runtime::helpers::ensure_contiguous;
use crate::shape::tile_shape;
use crate::tensor::{NDArray, Order};

impl TileOps for CpuContext {
    fn tile(&self, a: &NDArray, reps: &[usize]) -> Result<NDArray> {
        let dtype = a.dtype();
        let out_shape = tile_shape(a.shape(), reps)?;
        tracing::debug!(shape = ?a.shape(), ?reps, %dtype, "tile");

        let a = ensure_contiguous(self, a)?;
        let mut out = self.alloc(&out_shape, dtype, Order::C)?;
        dispatch_dtype!(dtype, T => {
            tile_kernel::<T>(self, a.data::<T>()?, a.shape(), out.data_mut::<T>()?, &out_shape)?;
        }, "tile");
        Ok(out)
    }

    fn tile_bp(&self, input: &NDArray, grad: &NDArray, reps: &[usize]) -> Result<NDArray> {
        let dtype = input.dtype();
        let tiled = tile_shape(input.shape(), reps)?;
        if grad.shape() != tiled.as_slice() {
            return Err(Error::shape_mismatch(&tiled, grad.shape()));
        }
        if grad.dtype() != dtype {
            return Err(Error::DTypeMismatch {
                lhs: dtype,
                rhs: grad.dtype(),
            });
        }
        tracing::debug!(shape = ?input.shape(), ?reps, %dtype, "tile_bp");

        let grad = ensure_contiguous(self, grad)?;
        let mut grad_in = self.alloc(input.shape(), dtype, Order::C)?;
        dispatch_dtype!(dtype, T => {
            tile_bp_kernel::<T>(
                self,
                grad.data::<T>()?,
                grad.shape(),
                grad_in.data_mut::<T>()?,
                input.shape(),
            )?;
        }, "tile_bp");
        Ok(grad_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_tile_of_f_order_input() {
        let ctx = CpuContext::new().unwrap();
        let a = NDArray::from_slice_with_order(&[1u16, 2, 3, 4], &[2, 2], Order::F, None).unwrap();
        let out = ctx.tile(&a, &[1, 2]).unwrap();
        assert_eq!(out.shape(), &[2, 4]);
        assert_eq!(out.to_vec::<u16>().unwrap(), vec![1, 2, 1, 2, 3, 4, 3, 4]);
    }

    #[test]
    fn test_tile_bp_collects_replicas() {
        let ctx = CpuContext::new().unwrap();
        let input = NDArray::from_slice(&[0.0f32; 2], &[2]).unwrap();
        let grad = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[6]).unwrap();
        let out = ctx.tile_bp(&input, &grad, &[3]).unwrap();
        assert_eq!(out.to_vec::<f32>().unwrap(), vec![9.0, 12.0]);
    }

    #[test]
    fn test_tile_bp_shape_checked() {
        let ctx = CpuContext::new().unwrap();
        let input = NDArray::from_slice(&[0.0f32; 4], &[2, 2]).unwrap();
        let grad = NDArray::from_slice(&[1.0f32; 8], &[4, 2]).unwrap();
        assert_eq!(ctx.tile_bp(&input, &grad, &[3, 1]).unwrap_err().kind(), ErrorKind::Shape);
        assert_eq!(ctx.tile(&input, &[3]).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}

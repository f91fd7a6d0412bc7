//! CPU implementation of matrix multiplication.

use crate::dispatch_dtype;
use crate::error::{Error, Result};
use crate::ops::MatmulOps;
use crate::ops::conv_common::{validate_rank, validate_same_dtype};
use crate::runtime::cpu::CpuContext;
use crate::runtime::cpu::kernels::matmul_kernel;
use crate::runtime::helpers::ensure_contiguous;
use crate::tensor::{NDArray, Order};

impl MatmulOps for CpuContext {
    fn matmul(&self, a: &NDArray, b: &NDArray) -> Result<NDArray> {
        validate_rank(a.shape(), 2, "lhs", "matmul")?;
        validate_rank(b.shape(), 2, "rhs", "matmul")?;
        validate_same_dtype(a.dtype(), b.dtype())?;
        let (m, k) = (a.shape()[0], a.shape()[1]);
        let n = b.shape()[1];
        if b.shape()[0] != k {
            return Err(Error::shape_mismatch(&[k, n], b.shape()));
        }
        let dtype = a.dtype();
        tracing::debug!(m, n, k, %dtype, "matmul");

        let a = ensure_contiguous(self, a)?;
        let b = ensure_contiguous(self, b)?;
        let mut out = self.alloc(&[m, n], dtype, Order::C)?;
        dispatch_dtype!(dtype, T => {
            matmul_kernel::<T>(self, a.data::<T>()?, b.data::<T>()?, out.data_mut::<T>()?, m, n, k, k, n)?;
        }, "matmul");
        Ok(out)
    }
}

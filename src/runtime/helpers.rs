//! Helpers shared by operation implementations

use super::cpu::CpuContext;
use crate::error::{Error, Result};
use crate::tensor::{NDArray, Order};

/// Dense 'c'-ordered array with the same logical values
///
/// Returns a view of `array` when it already is dense in 'c' order,
/// otherwise a copy charged to the context workspace.
pub fn ensure_contiguous(ctx: &CpuContext, array: &NDArray) -> Result<NDArray> {
    let dense_c = array.order() == Order::C
        && array.is_contiguous()
        && array.descriptor().offset() == 0
        && array.buffer().len() == array.length();
    if dense_c {
        Ok(array.clone())
    } else {
        array.contiguous_in(Order::C, Some(ctx.workspace()))
    }
}

/// Dense 'c'-ordered copy of `array` permuted by `dims`
pub fn permute_contiguous(ctx: &CpuContext, array: &NDArray, dims: &[usize]) -> Result<NDArray> {
    ensure_contiguous(ctx, &array.permute(dims)?)
}

/// Read an integer tensor of axes (or a count) as `isize` values
pub fn read_int_list(array: &NDArray, what: &'static str) -> Result<Vec<isize>> {
    if !array.dtype().is_int() {
        return Err(Error::invalid_argument(
            what,
            format!("expected an integer tensor, got {}", array.dtype()),
        ));
    }
    Ok(array.to_i64_vec()?.into_iter().map(|v| v as isize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_contiguous_views_dense_input() {
        let ctx = CpuContext::new().unwrap();
        let a = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert!(ensure_contiguous(&ctx, &a).unwrap().shares_buffer_with(&a));

        let t = permute_contiguous(&ctx, &a, &[1, 0]).unwrap();
        assert!(!t.shares_buffer_with(&a));
        assert_eq!(t.data::<f32>().unwrap(), &[1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn test_read_int_list() {
        let axes = NDArray::from_slice(&[-1i32, 0], &[2]).unwrap();
        assert_eq!(read_int_list(&axes, "axes").unwrap(), vec![-1, 0]);
        let floats = NDArray::from_slice(&[1.0f32], &[1]).unwrap();
        assert!(read_int_list(&floats, "axes").is_err());
    }
}

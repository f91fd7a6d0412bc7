//! Output shapes of reductions along axes

use crate::error::{Error, Result};
use crate::tensor::{Order, Shape, ShapeDescriptor};
use smallvec::SmallVec;

/// Normalize an axis list against `rank`
///
/// Negative axes count from the end. Duplicate or out-of-range axes are
/// rejected. An empty list selects every axis. The result is sorted.
pub fn normalize_axes(axes: &[isize], rank: usize) -> Result<SmallVec<[usize; 4]>> {
    if axes.is_empty() {
        return Ok((0..rank).collect());
    }

    let mut out: SmallVec<[usize; 4]> = SmallVec::with_capacity(axes.len());
    for &axis in axes {
        let normalized = if axis < 0 { axis + rank as isize } else { axis };
        if normalized < 0 || normalized >= rank as isize {
            return Err(Error::InvalidDimension { dim: axis, ndim: rank });
        }
        let normalized = normalized as usize;
        if out.contains(&normalized) {
            return Err(Error::DuplicateAxis {
                axis: normalized,
                axes: axes.to_vec(),
            });
        }
        out.push(normalized);
    }
    out.sort_unstable();
    Ok(out)
}

/// Shape left after reducing `axes` (already normalized) out of `shape`
///
/// Full reductions without `keep_dims` give `[1]` for rank-1 inputs, `[1, 1]`
/// under `legacy_vector_shape`, and a rank-0 shape otherwise.
pub fn reduced_shape(
    shape: &[usize],
    axes: &[usize],
    keep_dims: bool,
    legacy_vector_shape: bool,
) -> Shape {
    if keep_dims {
        return shape
            .iter()
            .enumerate()
            .map(|(d, &extent)| if axes.contains(&d) { 1 } else { extent })
            .collect();
    }

    let kept: Shape = shape
        .iter()
        .enumerate()
        .filter(|(d, _)| !axes.contains(d))
        .map(|(_, &extent)| extent)
        .collect();

    if kept.is_empty() && !shape.is_empty() {
        if shape.len() == 1 {
            return SmallVec::from_slice(&[1]);
        }
        if legacy_vector_shape {
            return SmallVec::from_slice(&[1, 1]);
        }
    }
    kept
}

/// Descriptor of the result of reducing `input` along `axes`
///
/// Output strides are computed from scratch for `order`; input strides are
/// never reused.
///
/// # Example
/// ```
/// use ndexec::dtype::DType;
/// use ndexec::shape::eval_reduce_shape_info;
/// use ndexec::tensor::{Order, ShapeDescriptor};
/// let input = ShapeDescriptor::contiguous(&[2, 3, 4], Order::C, DType::F32);
/// let out = eval_reduce_shape_info(Order::C, &[1], &input, true, false).unwrap();
/// assert_eq!(out.shape(), &[2, 1, 4]);
/// let out = eval_reduce_shape_info(Order::C, &[-1, 0], &input, false, false).unwrap();
/// assert_eq!(out.shape(), &[3]);
/// ```
pub fn eval_reduce_shape_info(
    order: Order,
    axes: &[isize],
    input: &ShapeDescriptor,
    keep_dims: bool,
    legacy_vector_shape: bool,
) -> Result<ShapeDescriptor> {
    let axes = normalize_axes(axes, input.rank())?;
    let shape = reduced_shape(input.shape(), &axes, keep_dims, legacy_vector_shape);
    Ok(ShapeDescriptor::contiguous(&shape, order, input.dtype()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use crate::error::ErrorKind;

    fn desc(shape: &[usize]) -> ShapeDescriptor {
        ShapeDescriptor::contiguous(shape, Order::C, DType::F64)
    }

    #[test]
    fn test_keep_dims_preserves_rank() {
        let out = eval_reduce_shape_info(Order::C, &[0, 2], &desc(&[2, 3, 4]), true, false).unwrap();
        assert_eq!(out.shape(), &[1, 3, 1]);
        assert_eq!(out.strides(), &[3, 1, 1]);
    }

    #[test]
    fn test_full_reduction_boundaries() {
        let vector = eval_reduce_shape_info(Order::C, &[], &desc(&[5]), false, false).unwrap();
        assert_eq!(vector.shape(), &[1]);

        let scalar = eval_reduce_shape_info(Order::C, &[], &desc(&[2, 3]), false, false).unwrap();
        assert!(scalar.is_scalar());

        let legacy = eval_reduce_shape_info(Order::C, &[], &desc(&[2, 3]), false, true).unwrap();
        assert_eq!(legacy.shape(), &[1, 1]);
    }

    #[test]
    fn test_output_strides_follow_requested_order() {
        let input = desc(&[2, 3, 4]).transpose(0, 2).unwrap();
        let out = eval_reduce_shape_info(Order::F, &[1], &input, false, false).unwrap();
        assert_eq!(out.shape(), &[4, 2]);
        assert_eq!(out.strides(), &[1, 4]);
        assert_eq!(out.order(), Order::F);
    }

    #[test]
    fn test_bad_axes() {
        let err = normalize_axes(&[0, -3], 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        let err = normalize_axes(&[3], 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert_eq!(normalize_axes(&[-1, 0], 3).unwrap().as_slice(), &[0, 2]);
    }
}

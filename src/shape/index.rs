//! Index mapping between a tiled shape and its source shape

use crate::error::{Error, Result};
use crate::tensor::Shape;

/// Shape produced by tiling `shape` with `reps`
pub fn tile_shape(shape: &[usize], reps: &[usize]) -> Result<Shape> {
    if reps.len() != shape.len() {
        return Err(Error::InvalidArgument {
            arg: "reps",
            reason: format!(
                "expected {} repetition counts for a rank-{} array, got {}",
                shape.len(),
                shape.len(),
                reps.len()
            ),
        });
    }
    Ok(shape.iter().zip(reps).map(|(&d, &r)| d * r).collect())
}

/// Output shape of an unsorted segment reduction
///
/// `ids` is flattened and must hold one class id per row of `data`. The
/// output is `[num_classes, data[1..]]`.
pub fn segment_output_shape(data: &[usize], ids: &[usize], num_classes: usize) -> Result<Shape> {
    let Some((&rows, rest)) = data.split_first() else {
        return Err(Error::InvalidRank {
            op: "unsorted_segment",
            arg: "input",
            expected: 1,
            got: 0,
        });
    };
    let id_len: usize = ids.iter().product();
    if id_len != rows {
        return Err(Error::shape_mismatch(&[rows], ids));
    }
    let mut out = Shape::with_capacity(data.len());
    out.push(num_classes);
    out.extend_from_slice(rest);
    Ok(out)
}

/// Map a row-major index of `big` onto the row-major index in `small`
///
/// Shapes are right-aligned; each coordinate of `big` is reduced modulo the
/// matching extent of `small`. This is how every replica produced by tiling
/// finds its source element.
///
/// # Example
/// ```
/// use ndexec::shape::sub_array_index;
/// // [4, 4] tiled from [2, 2]: element (3, 2) comes from (1, 0)
/// assert_eq!(sub_array_index(3 * 4 + 2, &[4, 4], &[2, 2]), 2);
/// ```
pub fn sub_array_index(index: usize, big: &[usize], small: &[usize]) -> usize {
    let mut rem = index;
    let mut out = 0;
    let mut scale = 1;
    let pad = big.len().saturating_sub(small.len());

    for d in (0..big.len()).rev() {
        let extent = big[d];
        if extent == 0 {
            return 0;
        }
        let coord = rem % extent;
        rem /= extent;

        if d >= pad {
            let small_extent = small[d - pad];
            out += (coord % small_extent) * scale;
            scale *= small_extent;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_output_shape() {
        assert_eq!(segment_output_shape(&[3, 2], &[3], 2).unwrap().as_slice(), &[2, 2]);
        assert_eq!(segment_output_shape(&[4], &[2, 2], 5).unwrap().as_slice(), &[5]);
        assert!(segment_output_shape(&[3, 2], &[2], 2).is_err());
        assert!(segment_output_shape(&[], &[1], 2).is_err());
    }

    #[test]
    fn test_tile_shape() {
        assert_eq!(tile_shape(&[2, 2], &[3, 1]).unwrap().as_slice(), &[6, 2]);
        assert!(tile_shape(&[2, 2], &[3]).is_err());
    }

    #[test]
    fn test_sub_array_index_wraps_each_axis() {
        let big = [6, 2];
        let small = [2, 2];
        let mapped: Vec<usize> = (0..12).map(|i| sub_array_index(i, &big, &small)).collect();
        assert_eq!(mapped, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_sub_array_index_lower_rank_source() {
        // [2, 3] broadcast from [3]
        let mapped: Vec<usize> = (0..6).map(|i| sub_array_index(i, &[2, 3], &[3])).collect();
        assert_eq!(mapped, vec![0, 1, 2, 0, 1, 2]);
    }
}

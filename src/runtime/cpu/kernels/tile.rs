//! Tile and tile-gradient kernels
//!
//! Both work on dense row-major buffers: `small` is the input shape and
//! `big` the tiled shape (`big[d] == small[d] * reps[d]`).

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuContext;
use crate::runtime::parallel_for_slices;
use crate::shape::sub_array_index;

fn check_lengths(small: &[usize], big: &[usize], small_len: usize, big_len: usize) -> Result<()> {
    if small.iter().product::<usize>() != small_len {
        return Err(Error::shape_mismatch(small, &[small_len]));
    }
    if big.iter().product::<usize>() != big_len {
        return Err(Error::shape_mismatch(big, &[big_len]));
    }
    Ok(())
}

/// Repeat `input` (shape `small`) into `out` (shape `big`)
pub fn tile_kernel<T: Element>(
    ctx: &CpuContext,
    input: &[T],
    small: &[usize],
    out: &mut [T],
    big: &[usize],
) -> Result<()> {
    check_lengths(small, big, input.len(), out.len())?;
    parallel_for_slices(ctx, out, 1, |first, window| {
        for (k, v) in window.iter_mut().enumerate() {
            *v = input[sub_array_index(first + k, big, small)];
        }
        Ok(())
    })
}

/// Sum every replica of `grad_out` (shape `big`) back onto `grad_in`
/// (shape `small`)
///
/// `grad_in` is overwritten. Each gradient element is accumulated by one
/// worker over its replicas in increasing row-major order of `big`, which is
/// the order a sequential walk of `grad_out` would add them in.
pub fn tile_bp_kernel<T: Element>(
    ctx: &CpuContext,
    grad_out: &[T],
    big: &[usize],
    grad_in: &mut [T],
    small: &[usize],
) -> Result<()> {
    check_lengths(small, big, grad_in.len(), grad_out.len())?;
    if big.len() < small.len() {
        return Err(Error::shape_mismatch(small, big));
    }

    let pad = big.len() - small.len();
    // extent of `small` aligned to every dimension of `big`
    let aligned: Vec<usize> = (0..big.len())
        .map(|d| if d < pad { 1 } else { small[d - pad] })
        .collect();
    let reps: Vec<usize> = big
        .iter()
        .zip(&aligned)
        .map(|(&b, &s)| if s == 0 { 0 } else { b / s })
        .collect();
    if big.iter().zip(&aligned).zip(&reps).any(|((&b, &s), &r)| s * r != b) {
        return Err(Error::invalid_argument(
            "reps",
            format!("tiled shape {big:?} is not a whole multiple of {small:?}"),
        ));
    }
    let num_reps: usize = reps.iter().product();

    parallel_for_slices(ctx, grad_in, 1, |first, window| {
        let mut small_coords = vec![0usize; big.len()];
        let mut rep_coords = vec![0usize; big.len()];
        for (k, g) in window.iter_mut().enumerate() {
            // coordinates of this gradient element in the aligned small shape
            let mut rem = first + k;
            for d in (0..big.len()).rev() {
                small_coords[d] = rem % aligned[d];
                rem /= aligned[d];
            }

            let mut acc = T::zero();
            rep_coords.fill(0);
            for _ in 0..num_reps {
                let mut linear = 0;
                for d in 0..big.len() {
                    linear = linear * big[d] + rep_coords[d] * aligned[d] + small_coords[d];
                }
                acc = acc + grad_out[linear];

                for d in (0..big.len()).rev() {
                    rep_coords[d] += 1;
                    if rep_coords[d] < reps[d] {
                        break;
                    }
                    rep_coords[d] = 0;
                }
            }
            *g = acc;
        }
        Ok(())
    })
}

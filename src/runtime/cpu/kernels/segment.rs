//! Unsorted segment reduction kernels
//!
//! Input rows are dense: row `r` of a `[rows, row_len]` view lives at
//! `data[r * row_len..(r + 1) * row_len]`. Class ids must already be
//! validated with [`validate_segment_ids`].

use super::reduce::Reduction;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuContext;
use crate::runtime::{parallel_for, parallel_for_slices};

/// Check every id lies in `[0, num_classes)` and convert to `usize`
///
/// Ids are checked in parallel; the first violation observed is reported
/// as a range error naming the value and the bound.
pub fn validate_segment_ids<I: Element>(
    ctx: &CpuContext,
    ids: &[I],
    num_classes: usize,
    op: &'static str,
) -> Result<Vec<usize>> {
    parallel_for(ctx, 0, ids.len(), 1, |start, stop| {
        for &id in &ids[start..stop] {
            let value = id.to_i128();
            if value < 0 || value >= num_classes as i128 {
                return Err(Error::IndexOutOfRange {
                    op,
                    what: "segment index",
                    value,
                    bound: num_classes as i64,
                });
            }
        }
        Ok(())
    })?;
    Ok(ids.iter().map(|id| id.to_i128() as usize).collect())
}

/// Rows belonging to every class, in row order
fn bucket_rows(class_ids: &[usize], num_classes: usize) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); num_classes];
    for (row, &class) in class_ids.iter().enumerate() {
        buckets[class].push(row);
    }
    buckets
}

fn check_rows<T>(data: &[T], class_ids: &[usize], row_len: usize) -> Result<()> {
    if data.len() != class_ids.len() * row_len {
        return Err(Error::Internal(format!(
            "segment input holds {} elements, expected {} rows of {row_len}",
            data.len(),
            class_ids.len()
        )));
    }
    Ok(())
}

/// Reduce the rows of each class into one output row
///
/// `out` is `[num_classes, row_len]`. Classes without rows keep the identity
/// of `op`: the type maximum (or +inf) for min, the type minimum (or -inf)
/// for max, 0 for sum and mean, 1 for prod. Each output row is produced by a
/// single worker walking its rows in order.
pub fn unsorted_segment_kernel<T: Element>(
    ctx: &CpuContext,
    data: &[T],
    class_ids: &[usize],
    num_classes: usize,
    row_len: usize,
    op: Reduction,
    out: &mut [T],
) -> Result<()> {
    check_rows(data, class_ids, row_len)?;
    if out.len() != num_classes * row_len {
        return Err(Error::shape_mismatch(&[num_classes, row_len], &[out.len()]));
    }
    let buckets = bucket_rows(class_ids, num_classes);
    let row = |r: usize| &data[r * row_len..(r + 1) * row_len];

    parallel_for_slices(ctx, out, row_len, |first_class, window| {
        for (c, out_row) in window.chunks_mut(row_len).enumerate() {
            let rows = &buckets[first_class + c];
            match op {
                Reduction::Min => {
                    out_row.fill(T::max_bound());
                    for &r in rows {
                        for (o, &v) in out_row.iter_mut().zip(row(r)) {
                            if v < *o {
                                *o = v;
                            }
                        }
                    }
                }
                Reduction::Max => {
                    out_row.fill(T::min_bound());
                    for &r in rows {
                        for (o, &v) in out_row.iter_mut().zip(row(r)) {
                            if v > *o {
                                *o = v;
                            }
                        }
                    }
                }
                Reduction::Sum | Reduction::Mean | Reduction::Prod => {
                    let prod = op == Reduction::Prod;
                    let step: fn(T::Accumulator, T) -> T::Accumulator =
                        if prod { T::acc_mul } else { T::acc_add };
                    let mut acc = vec![if prod { T::acc_one() } else { T::acc_zero() }; row_len];
                    for &r in rows {
                        for (a, &v) in acc.iter_mut().zip(row(r)) {
                            *a = step(*a, v);
                        }
                    }
                    for (o, a) in out_row.iter_mut().zip(acc) {
                        *o = match op {
                            Reduction::Mean if !rows.is_empty() => T::acc_mean(a, rows.len()),
                            _ => T::from_acc(a),
                        };
                    }
                }
            }
        }
        Ok(())
    })
}

/// Gradient of segment min or max with respect to its input
///
/// For every class and column the incoming gradient goes to the one input
/// row holding the extremum; on ties the first such row in row order wins.
/// All other input positions receive zero.
#[allow(clippy::too_many_arguments)]
pub fn unsorted_segment_extremum_bp_kernel<T: Element>(
    ctx: &CpuContext,
    data: &[T],
    class_ids: &[usize],
    grad_out: &[T],
    num_classes: usize,
    row_len: usize,
    op: Reduction,
    grad_in: &mut [T],
) -> Result<()> {
    let prefer: fn(T, T) -> bool = match op {
        Reduction::Min => |candidate: T, best: T| candidate < best,
        Reduction::Max => |candidate: T, best: T| candidate > best,
        other => {
            return Err(Error::invalid_argument(
                "op",
                format!("segment backprop supports min and max, got {}", other.name()),
            ));
        }
    };
    check_rows(data, class_ids, row_len)?;
    if grad_out.len() != num_classes * row_len {
        return Err(Error::shape_mismatch(&[num_classes, row_len], &[grad_out.len()]));
    }
    if grad_in.len() != data.len() {
        return Err(Error::shape_mismatch(&[data.len()], &[grad_in.len()]));
    }

    let buckets = bucket_rows(class_ids, num_classes);
    let mut winners = vec![usize::MAX; num_classes * row_len];
    parallel_for_slices(ctx, &mut winners, row_len, |first_class, window| {
        for (c, win_row) in window.chunks_mut(row_len).enumerate() {
            let rows = &buckets[first_class + c];
            for (j, winner) in win_row.iter_mut().enumerate() {
                let mut best: Option<T> = None;
                for &r in rows {
                    let v = data[r * row_len + j];
                    if best.is_none_or(|b| prefer(v, b)) {
                        best = Some(v);
                        *winner = r;
                    }
                }
            }
        }
        Ok(())
    })?;

    parallel_for_slices(ctx, grad_in, row_len, |first_row, window| {
        for (k, g_row) in window.chunks_mut(row_len).enumerate() {
            let r = first_row + k;
            let class = class_ids[r];
            for (j, g) in g_row.iter_mut().enumerate() {
                let idx = class * row_len + j;
                *g = if winners[idx] == r {
                    grad_out[idx]
                } else {
                    T::zero()
                };
            }
        }
        Ok(())
    })
}

//! Reduction kernels over tensor-along-dimension sub-arrays
//!
//! Every kernel reduces each TAD of a [`TadPack`] to one output element.
//! TADs are read through their storage offsets, so strided and permuted
//! inputs need no compaction. One worker reduces a whole TAD sequentially,
//! which keeps results independent of the thread count.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuContext;
use crate::runtime::parallel_for_slices;
use crate::shape::TadPack;

/// Reduction operation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reduction {
    /// Sum of elements
    Sum,
    /// Arithmetic mean
    Mean,
    /// Minimum element
    Min,
    /// Maximum element
    Max,
    /// Product of elements
    Prod,
}

impl Reduction {
    /// Operation name used in errors and logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Prod => "prod",
        }
    }
}

fn check_output(tads: &TadPack, out_len: usize) -> Result<()> {
    if tads.num_tads() != out_len {
        return Err(Error::Internal(format!(
            "reduction output holds {out_len} elements for {} sub-arrays",
            tads.num_tads()
        )));
    }
    Ok(())
}

/// Reduce every TAD of `data` with `op`
///
/// Floats accumulate sums, products and means in f64. Integers accumulate
/// exactly and wrap on overflow like native integer arithmetic. An empty
/// TAD yields the identity of `op` (NaN for a float mean, 0 for an integer
/// mean).
pub fn reduce_kernel<T: Element>(
    ctx: &CpuContext,
    data: &[T],
    tads: &TadPack,
    op: Reduction,
    out: &mut [T],
) -> Result<()> {
    check_output(tads, out.len())?;

    parallel_for_slices(ctx, out, 1, |first, window| {
        for (k, slot) in window.iter_mut().enumerate() {
            let values = tads.tad_offsets(first + k).map(|o| data[o]);
            *slot = match op {
                Reduction::Sum => T::from_acc(values.fold(T::acc_zero(), T::acc_add)),
                Reduction::Prod => T::from_acc(values.fold(T::acc_one(), T::acc_mul)),
                Reduction::Mean => {
                    T::acc_mean(values.fold(T::acc_zero(), T::acc_add), tads.tad_length())
                }
                Reduction::Min => {
                    values.fold(T::max_bound(), |acc, v| if v < acc { v } else { acc })
                }
                Reduction::Max => {
                    values.fold(T::min_bound(), |acc, v| if v > acc { v } else { acc })
                }
            };
        }
        Ok(())
    })
}

/// Running count, mean and sum of squared deviations (Welford)
#[derive(Copy, Clone, Debug, Default)]
struct Welford {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn variance(&self, correction: usize) -> f64 {
        if self.count <= correction {
            f64::NAN
        } else {
            self.m2 / (self.count - correction) as f64
        }
    }
}

fn welford_tad<T: Element>(data: &[T], tads: &TadPack, t: usize) -> Welford {
    let mut acc = Welford::default();
    for o in tads.tad_offsets(t) {
        acc.push(data[o].to_f64());
    }
    acc
}

/// Variance (or standard deviation) of every TAD
///
/// `correction` is subtracted from the element count in the denominator:
/// 0 gives the biased variance, 1 the sample variance.
pub fn variance_kernel<T: Element>(
    ctx: &CpuContext,
    data: &[T],
    tads: &TadPack,
    correction: usize,
    take_sqrt: bool,
    out: &mut [T],
) -> Result<()> {
    check_output(tads, out.len())?;

    parallel_for_slices(ctx, out, 1, |first, window| {
        for (k, slot) in window.iter_mut().enumerate() {
            let var = welford_tad(data, tads, first + k).variance(correction);
            *slot = T::from_f64(if take_sqrt { var.sqrt() } else { var });
        }
        Ok(())
    })
}

/// Mean and biased variance of every TAD in a single pass
pub fn moments_kernel<T: Element>(
    ctx: &CpuContext,
    data: &[T],
    tads: &TadPack,
    mean_out: &mut [T],
    variance_out: &mut [T],
) -> Result<()> {
    check_output(tads, mean_out.len())?;
    check_output(tads, variance_out.len())?;

    let mut stats = vec![Welford::default(); tads.num_tads()];
    parallel_for_slices(ctx, &mut stats, 1, |first, window| {
        for (k, slot) in window.iter_mut().enumerate() {
            *slot = welford_tad(data, tads, first + k);
        }
        Ok(())
    })?;

    for ((stat, mean), var) in stats.iter().zip(mean_out).zip(variance_out) {
        *mean = T::from_f64(if stat.count == 0 { f64::NAN } else { stat.mean });
        *var = T::from_f64(stat.variance(0));
    }
    Ok(())
}

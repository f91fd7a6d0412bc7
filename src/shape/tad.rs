//! Tensor-along-dimension (TAD) decomposition

use super::reduce::normalize_axes;
use crate::error::Result;
use crate::tensor::{Shape, ShapeDescriptor};
use smallvec::SmallVec;

/// Sub-arrays of a descriptor spanning a set of axes
///
/// Every TAD covers the `axes` dimensions at one fixed coordinate of the
/// remaining dimensions. TAD `t` (row-major over the remaining dimensions)
/// starts at `base_offsets()[t]`; its `j`-th element (row-major over `axes`)
/// lives at `base_offsets()[t] + inner_offsets()[j]`.
#[derive(Clone, Debug)]
pub struct TadPack {
    axes: SmallVec<[usize; 4]>,
    tad_shape: Shape,
    outer_shape: Shape,
    base_offsets: Vec<usize>,
    inner_offsets: Vec<isize>,
}

impl TadPack {
    /// Decompose `desc` into TADs along `axes` (empty list = whole array)
    pub fn new(desc: &ShapeDescriptor, axes: &[isize]) -> Result<Self> {
        let axes = normalize_axes(axes, desc.rank())?;
        let shape = desc.shape();
        let strides = desc.strides();

        let outer_dims: SmallVec<[usize; 4]> =
            (0..desc.rank()).filter(|d| !axes.contains(d)).collect();
        let outer_shape: Shape = outer_dims.iter().map(|&d| shape[d]).collect();
        let outer_strides: SmallVec<[isize; 4]> = outer_dims.iter().map(|&d| strides[d]).collect();
        let tad_shape: Shape = axes.iter().map(|&d| shape[d]).collect();
        let tad_strides: SmallVec<[isize; 4]> = axes.iter().map(|&d| strides[d]).collect();

        let base_offsets = strided_offsets(&outer_shape, &outer_strides)
            .into_iter()
            .map(|o| (desc.offset() as isize + o) as usize)
            .collect();
        let inner_offsets = strided_offsets(&tad_shape, &tad_strides);

        Ok(Self {
            axes,
            tad_shape,
            outer_shape,
            base_offsets,
            inner_offsets,
        })
    }

    /// Normalized axes each TAD spans
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    /// Shape of one TAD
    pub fn tad_shape(&self) -> &[usize] {
        &self.tad_shape
    }

    /// Shape of the grid of TADs
    pub fn outer_shape(&self) -> &[usize] {
        &self.outer_shape
    }

    /// Number of TADs
    pub fn num_tads(&self) -> usize {
        self.base_offsets.len()
    }

    /// Number of elements in each TAD
    pub fn tad_length(&self) -> usize {
        self.inner_offsets.len()
    }

    /// Storage offset of the first element of every TAD
    pub fn base_offsets(&self) -> &[usize] {
        &self.base_offsets
    }

    /// Offsets of TAD elements relative to the TAD base
    pub fn inner_offsets(&self) -> &[isize] {
        &self.inner_offsets
    }

    /// Storage offsets of the elements of TAD `t`
    pub fn tad_offsets(&self, t: usize) -> impl Iterator<Item = usize> + '_ {
        let base = self.base_offsets[t] as isize;
        self.inner_offsets.iter().map(move |&o| (base + o) as usize)
    }
}

/// Row-major offsets of every coordinate of `shape` under `strides`
fn strided_offsets(shape: &[usize], strides: &[isize]) -> Vec<isize> {
    let count: usize = shape.iter().product();
    let mut out = Vec::with_capacity(count);
    if count == 0 {
        return out;
    }

    let mut coords: SmallVec<[usize; 4]> = SmallVec::from_elem(0, shape.len());
    let mut current = 0isize;
    for _ in 0..count {
        out.push(current);
        for d in (0..shape.len()).rev() {
            coords[d] += 1;
            current += strides[d];
            if coords[d] < shape[d] {
                break;
            }
            current -= strides[d] * shape[d] as isize;
            coords[d] = 0;
        }
    }
    out
}

//! Shape descriptor: shape, strides, offset, ordering and dtype of an array view

use crate::dtype::DType;
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// Stack allocation threshold for dimensions
/// Most arrays have 4 or fewer dimensions, so we stack-allocate up to 4
const STACK_DIMS: usize = 4;

/// Shape type: dimensions of an array
pub type Shape = SmallVec<[usize; STACK_DIMS]>;

/// Strides type: element offsets between consecutive elements along each dimension
/// Signed to support negative strides. Strides are in ELEMENTS, not bytes.
pub type Strides = SmallVec<[isize; STACK_DIMS]>;

/// Memory ordering of a dense array
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    /// Row-major: the last dimension varies fastest
    #[default]
    C,
    /// Column-major: the first dimension varies fastest
    F,
}

impl Order {
    /// Parse the conventional 'c' / 'f' tag
    pub fn from_char(tag: char) -> Result<Self> {
        match tag {
            'c' | 'C' => Ok(Self::C),
            'f' | 'F' => Ok(Self::F),
            other => Err(Error::invalid_argument(
                "order",
                format!("expected 'c' or 'f', got '{other}'"),
            )),
        }
    }

    /// The conventional single-character tag
    pub const fn as_char(self) -> char {
        match self {
            Self::C => 'c',
            Self::F => 'f',
        }
    }
}

/// Element-wise stride of a descriptor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ews {
    /// Every element is `k` storage elements after its logical predecessor
    /// in the declared ordering
    Stride(isize),
    /// Strides do not collapse to a single value
    Irregular,
}

/// Describes how an array view maps onto its buffer
///
/// Address of element at indices [i0, i1, ..., in]:
///   offset + i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
///
/// Linear element indices are always row-major over `shape`; `order` only
/// records which physical layout the strides were derived from.
#[derive(Clone, PartialEq, Eq)]
pub struct ShapeDescriptor {
    shape: Shape,
    strides: Strides,
    offset: usize,
    order: Order,
    dtype: DType,
}

impl ShapeDescriptor {
    /// Create a dense layout in the given order
    ///
    /// # Example
    /// ```
    /// use ndexec::dtype::DType;
    /// use ndexec::tensor::{Order, ShapeDescriptor};
    /// let desc = ShapeDescriptor::contiguous(&[2, 3, 4], Order::C, DType::F32);
    /// assert_eq!(desc.strides(), &[12, 4, 1]);
    /// let desc = ShapeDescriptor::contiguous(&[2, 3, 4], Order::F, DType::F32);
    /// assert_eq!(desc.strides(), &[1, 2, 6]);
    /// ```
    pub fn contiguous(shape: &[usize], order: Order, dtype: DType) -> Self {
        let shape: Shape = shape.iter().copied().collect();
        let strides = compute_strides(&shape, order);
        Self {
            shape,
            strides,
            offset: 0,
            order,
            dtype,
        }
    }

    /// Create a descriptor with explicit strides and offset
    pub fn new(shape: Shape, strides: Strides, offset: usize, order: Order, dtype: DType) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            offset,
            order,
            dtype,
        }
    }

    /// Create a scalar (0-dimensional) descriptor
    pub fn scalar(dtype: DType) -> Self {
        Self {
            shape: SmallVec::new(),
            strides: SmallVec::new(),
            offset: 0,
            order: Order::C,
            dtype,
        }
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Get the offset
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get the declared ordering
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn length(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check if this is a scalar (0 dimensions)
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Check if at most one dimension has extent greater than one
    pub fn is_vector(&self) -> bool {
        self.rank() >= 1 && self.shape.iter().filter(|&&d| d != 1).count() <= 1
    }

    /// Same descriptor with a different dtype tag
    pub fn with_dtype(&self, dtype: DType) -> Self {
        Self {
            dtype,
            ..self.clone()
        }
    }

    /// Check if memory is dense in the declared ordering
    ///
    /// Dimensions of extent one never affect addressing and are ignored.
    pub fn is_contiguous(&self) -> bool {
        let expected = compute_strides(&self.shape, self.order);
        self.shape
            .iter()
            .zip(self.strides.iter().zip(expected.iter()))
            .all(|(&dim, (&actual, &dense))| dim == 1 || actual == dense)
    }

    /// Element-wise stride
    ///
    /// Returns `Stride(1)` for dense arrays, `Stride(k)` when every stride is
    /// `k` times the dense stride, and `Irregular` otherwise.
    pub fn ews(&self) -> Ews {
        if self.length() <= 1 {
            return Ews::Stride(1);
        }

        let dense = compute_strides(&self.shape, self.order);
        let dims: Vec<usize> = (0..self.rank()).filter(|&d| self.shape[d] != 1).collect();
        let fastest = match self.order {
            Order::C => dims.last().copied(),
            Order::F => dims.first().copied(),
        };
        let Some(fastest) = fastest else {
            return Ews::Stride(1);
        };

        let k = self.strides[fastest];
        if k == 0 {
            return Ews::Irregular;
        }
        if dims.iter().all(|&d| self.strides[d] == k * dense[d]) {
            Ews::Stride(k)
        } else {
            Ews::Irregular
        }
    }

    /// Normalize a dimension index (handle negative indices)
    pub fn normalize_dim(&self, d: isize) -> Option<usize> {
        let ndim = self.rank() as isize;
        let idx = if d < 0 { ndim + d } else { d };
        if idx >= 0 && idx < ndim {
            Some(idx as usize)
        } else {
            None
        }
    }

    /// Storage offset of the element at the given coordinates
    pub fn offset_at(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.rank() {
            return None;
        }

        let mut linear = self.offset as isize;
        for ((&c, &dim), &stride) in coords.iter().zip(&self.shape).zip(&self.strides) {
            if c >= dim {
                return None;
            }
            linear += c as isize * stride;
        }

        Some(linear as usize)
    }

    /// Coordinates of the element with row-major linear index `index`
    pub fn coords_of(&self, index: usize) -> Shape {
        linear_to_coords(index, &self.shape)
    }

    /// Storage offset of the element with row-major linear index `index`
    pub fn index_offset(&self, index: usize) -> usize {
        let mut rem = index;
        let mut linear = self.offset as isize;
        for (&dim, &stride) in self.shape.iter().zip(&self.strides).rev() {
            if dim == 0 {
                return self.offset;
            }
            linear += (rem % dim) as isize * stride;
            rem /= dim;
        }
        linear as usize
    }

    /// Storage offsets of every element in row-major logical order
    pub fn offsets(&self) -> OffsetIter<'_> {
        OffsetIter::new(self)
    }

    /// Swap two dimensions (zero-copy)
    pub fn transpose(&self, dim0: isize, dim1: isize) -> Result<Self> {
        let ndim = self.rank();
        let d0 = self.normalize_dim(dim0).ok_or(Error::InvalidDimension { dim: dim0, ndim })?;
        let d1 = self.normalize_dim(dim1).ok_or(Error::InvalidDimension { dim: dim1, ndim })?;

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.swap(d0, d1);
        strides.swap(d0, d1);

        Ok(Self {
            shape,
            strides,
            ..self.clone()
        })
    }

    /// Reorder dimensions (zero-copy)
    ///
    /// `dims[i]` names the source dimension that becomes dimension `i`.
    pub fn permute(&self, dims: &[usize]) -> Result<Self> {
        let ndim = self.rank();
        if dims.len() != ndim {
            return Err(Error::invalid_argument(
                "dims",
                format!("permutation of length {} for rank {}", dims.len(), ndim),
            ));
        }

        let mut seen: SmallVec<[bool; STACK_DIMS]> = smallvec::smallvec![false; ndim];
        for &d in dims {
            if d >= ndim {
                return Err(Error::InvalidDimension {
                    dim: d as isize,
                    ndim,
                });
            }
            if seen[d] {
                return Err(Error::DuplicateAxis {
                    axis: d,
                    axes: dims.iter().map(|&x| x as isize).collect(),
                });
            }
            seen[d] = true;
        }

        let shape: Shape = dims.iter().map(|&d| self.shape[d]).collect();
        let strides: Strides = dims.iter().map(|&d| self.strides[d]).collect();
        Ok(Self {
            shape,
            strides,
            ..self.clone()
        })
    }

    /// Reinterpret the element sequence under a new shape (zero-copy)
    ///
    /// Only possible when the view is dense in `order`; elements are read in
    /// that order from storage. Returns `None` when a copy would be required.
    pub fn reshape(&self, new_shape: &[usize], order: Order) -> Result<Option<Self>> {
        let new_count: usize = new_shape.iter().product();
        if new_count != self.length() {
            return Err(Error::shape_mismatch(new_shape, self.shape()));
        }

        let dense_in_order = Self {
            order,
            ..self.clone()
        }
        .is_contiguous();
        if !dense_in_order {
            return Ok(None);
        }

        let mut desc = Self::contiguous(new_shape, order, self.dtype);
        desc.offset = self.offset;
        Ok(Some(desc))
    }

    /// Broadcast to a target shape (zero-copy, broadcast dims get stride 0)
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Self> {
        if target.len() < self.rank() {
            return Err(Error::broadcast(self.shape(), target));
        }

        let mut shape = Shape::new();
        let mut strides = Strides::new();

        let pad = target.len() - self.rank();
        for &t in &target[..pad] {
            shape.push(t);
            strides.push(0);
        }

        for ((&s, &st), &t) in self.shape.iter().zip(&self.strides).zip(&target[pad..]) {
            if s == t {
                shape.push(t);
                strides.push(st);
            } else if s == 1 {
                shape.push(t);
                strides.push(0);
            } else {
                return Err(Error::broadcast(self.shape(), target));
            }
        }

        Ok(Self {
            shape,
            strides,
            ..self.clone()
        })
    }

    /// Check whether this shape can be broadcast to `target`
    pub fn is_broadcastable_to(&self, target: &[usize]) -> bool {
        self.broadcast_to(target).is_ok()
    }
}

impl fmt::Debug for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ShapeDescriptor {{ shape: {:?}, strides: {:?}, offset: {}, order: '{}', dtype: {} }}",
            self.shape.as_slice(),
            self.strides.as_slice(),
            self.offset,
            self.order.as_char(),
            self.dtype
        )
    }
}

impl fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.shape.as_slice())
    }
}

/// Dense strides for a shape in the given order
pub fn compute_strides(shape: &[usize], order: Order) -> Strides {
    let mut strides: Strides = SmallVec::from_elem(0, shape.len());
    let mut stride = 1isize;
    match order {
        Order::C => {
            for (i, &dim) in shape.iter().enumerate().rev() {
                strides[i] = stride;
                stride *= dim.max(1) as isize;
            }
        }
        Order::F => {
            for (i, &dim) in shape.iter().enumerate() {
                strides[i] = stride;
                stride *= dim.max(1) as isize;
            }
        }
    }
    strides
}

/// Row-major coordinates of a linear index
pub fn linear_to_coords(mut index: usize, shape: &[usize]) -> Shape {
    let mut coords: Shape = SmallVec::from_elem(0, shape.len());
    for (i, &dim) in shape.iter().enumerate().rev() {
        if dim == 0 {
            break;
        }
        coords[i] = index % dim;
        index /= dim;
    }
    coords
}

/// Row-major linear index of coordinates
pub fn coords_to_linear(coords: &[usize], shape: &[usize]) -> usize {
    coords
        .iter()
        .zip(shape)
        .fold(0, |acc, (&c, &dim)| acc * dim + c)
}

/// Odometer over the storage offsets of a descriptor in row-major order
pub struct OffsetIter<'a> {
    desc: &'a ShapeDescriptor,
    coords: Shape,
    current: isize,
    remaining: usize,
}

impl<'a> OffsetIter<'a> {
    fn new(desc: &'a ShapeDescriptor) -> Self {
        Self {
            desc,
            coords: SmallVec::from_elem(0, desc.rank()),
            current: desc.offset as isize,
            remaining: desc.length(),
        }
    }
}

impl Iterator for OffsetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let out = self.current as usize;
        self.remaining -= 1;

        for d in (0..self.coords.len()).rev() {
            self.coords[d] += 1;
            self.current += self.desc.strides[d];
            if self.coords[d] < self.desc.shape[d] {
                break;
            }
            self.current -= self.desc.strides[d] * self.desc.shape[d] as isize;
            self.coords[d] = 0;
        }

        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for OffsetIter<'_> {}

/// Compute the broadcast shape of two shapes
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Shape> {
    let max_ndim = a.len().max(b.len());
    let mut result = Shape::with_capacity(max_ndim);

    for i in 0..max_ndim {
        let a_dim = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let b_dim = if i < b.len() { b[b.len() - 1 - i] } else { 1 };

        if a_dim == b_dim {
            result.push(a_dim);
        } else if a_dim == 1 {
            result.push(b_dim);
        } else if b_dim == 1 {
            result.push(a_dim);
        } else {
            return None;
        }
    }

    result.reverse();
    Some(result)
}

//! Core NDArray type

use super::layout::{Order, Shape, ShapeDescriptor, linear_to_coords};
use super::{DataBuffer, Ews};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Workspace;
use std::fmt;

/// N-dimensional array view over a shared data buffer
///
/// `NDArray` consists of:
/// - **DataBuffer**: reference-counted host memory
/// - **ShapeDescriptor**: shape, strides, offset, ordering and dtype defining
///   the view into the buffer
///
/// # Zero-Copy Views
///
/// `permute`, `transpose`, `reshape` (when dense) and `broadcast_to` create
/// new arrays that share the underlying buffer and differ only in their
/// descriptor.
///
/// # Example
///
/// ```
/// use ndexec::tensor::NDArray;
/// let a = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let b = a.transpose(-1, -2).unwrap();
/// assert!(a.shares_buffer_with(&b));
/// assert_eq!(b.to_vec::<f32>().unwrap(), vec![1.0, 3.0, 2.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct NDArray {
    buffer: DataBuffer,
    desc: ShapeDescriptor,
}

impl NDArray {
    /// Create an array from a buffer and descriptor
    pub fn from_parts(buffer: DataBuffer, desc: ShapeDescriptor) -> Result<Self> {
        if buffer.dtype() != desc.dtype() {
            return Err(Error::DTypeMismatch {
                lhs: buffer.dtype(),
                rhs: desc.dtype(),
            });
        }
        Ok(Self { buffer, desc })
    }

    /// Create a 'c'-ordered array from row-major data
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_slice_with_order(data, shape, Order::C, None)
    }

    /// Create an array from row-major data, stored in the given ordering
    pub fn from_slice_with_order<T: Element>(
        data: &[T],
        shape: &[usize],
        order: Order,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }

        let desc = ShapeDescriptor::contiguous(shape, order, T::DTYPE);
        let buffer = match order {
            Order::C => DataBuffer::from_slice(data, T::DTYPE, workspace)?,
            Order::F => {
                let mut buffer = DataBuffer::new(data.len(), T::DTYPE, workspace)?;
                let dst = buffer.as_mut_slice::<T>()?;
                for (&value, offset) in data.iter().zip(desc.offsets()) {
                    dst[offset] = value;
                }
                buffer
            }
        };

        Ok(Self { buffer, desc })
    }

    /// Create a zero-filled array
    ///
    /// String dtypes produce arrays of empty strings.
    pub fn zeros(
        shape: &[usize],
        dtype: DType,
        order: Order,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        let len: usize = shape.iter().product();
        let buffer = DataBuffer::new(len, dtype, workspace)?;
        Ok(Self {
            buffer,
            desc: ShapeDescriptor::contiguous(shape, order, dtype),
        })
    }

    /// Create an array filled with `value`
    pub fn full<T: Element>(
        shape: &[usize],
        value: T,
        order: Order,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        let mut out = Self::zeros(shape, T::DTYPE, order, workspace)?;
        out.data_mut::<T>()?.fill(value);
        Ok(out)
    }

    /// Create a rank-0 array
    pub fn scalar<T: Element>(value: T) -> Result<Self> {
        Self::from_slice(&[value], &[])
    }

    // ===== Accessors =====

    /// Get the descriptor
    #[inline]
    pub fn descriptor(&self) -> &ShapeDescriptor {
        &self.desc
    }

    /// Get the backing buffer
    #[inline]
    pub fn buffer(&self) -> &DataBuffer {
        &self.buffer
    }

    #[inline]
    pub(crate) fn buffer_mut(&mut self) -> Result<&mut DataBuffer> {
        if self.buffer.is_unique() {
            Ok(&mut self.buffer)
        } else {
            Err(Error::invalid_argument(
                "array",
                "cannot write through a buffer shared with another view",
            ))
        }
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.desc.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.desc.strides()
    }

    /// Number of dimensions
    #[inline]
    pub fn rank(&self) -> usize {
        self.desc.rank()
    }

    /// Total number of elements
    #[inline]
    pub fn length(&self) -> usize {
        self.desc.length()
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.desc.dtype()
    }

    /// Get the declared ordering
    #[inline]
    pub fn order(&self) -> Order {
        self.desc.order()
    }

    /// Element-wise stride
    #[inline]
    pub fn ews(&self) -> Ews {
        self.desc.ews()
    }

    /// Check if this is a rank-0 array
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.desc.is_scalar()
    }

    /// Check if the array holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Check if memory is dense in the declared ordering
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.desc.is_contiguous()
    }

    /// Check whether two arrays view the same buffer
    #[inline]
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        self.buffer.ptr_eq(&other.buffer)
    }

    // ===== Element Access =====

    fn check_element<T: Element>(&self) -> Result<()> {
        if T::DTYPE == self.dtype() {
            Ok(())
        } else {
            Err(Error::DTypeMismatch {
                lhs: T::DTYPE,
                rhs: self.dtype(),
            })
        }
    }

    /// Typed view of the whole backing buffer (storage order)
    pub fn data<T: Element>(&self) -> Result<&[T]> {
        self.check_element::<T>()?;
        self.buffer.as_slice()
    }

    /// Mutable typed view of the whole backing buffer
    ///
    /// Fails when the buffer is shared with another view.
    pub fn data_mut<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check_element::<T>()?;
        self.buffer.as_mut_slice()
    }

    /// Copy the logical elements into a Vec in row-major order
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let data = self.data::<T>()?;
        Ok(self.desc.offsets().map(|offset| data[offset]).collect())
    }

    /// Element at a row-major linear index
    pub fn get<T: Element>(&self, index: usize) -> Result<T> {
        if index >= self.length() {
            return Err(Error::IndexOutOfRange {
                op: "get",
                what: "element index",
                value: index as i128,
                bound: self.length() as i64,
            });
        }
        let data = self.data::<T>()?;
        Ok(data[self.desc.index_offset(index)])
    }

    /// The single element of a one-element array
    pub fn item<T: Element>(&self) -> Result<T> {
        if self.length() != 1 {
            return Err(Error::shape_mismatch(&[1], self.shape()));
        }
        self.get(0)
    }

    /// Read an integer-valued array as i64 regardless of its integer width
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        let dtype = self.dtype();
        if !dtype.is_int() {
            return Err(Error::unsupported_dtype(dtype, "integer read"));
        }
        crate::dispatch_dtype!(dtype, T => {
            self.to_vec::<T>()?
                .into_iter()
                .map(|v| {
                    i64::try_from(v.to_i128()).map_err(|_| {
                        Error::invalid_argument("values", format!("{v:?} does not fit in i64"))
                    })
                })
                .collect()
        }, "integer read")
    }

    // ===== View Operations (Zero-Copy) =====

    fn with_descriptor(&self, desc: ShapeDescriptor) -> Self {
        Self {
            buffer: self.buffer.clone(),
            desc,
        }
    }

    /// Transpose two dimensions (zero-copy)
    pub fn transpose(&self, dim0: isize, dim1: isize) -> Result<Self> {
        Ok(self.with_descriptor(self.desc.transpose(dim0, dim1)?))
    }

    /// Permute dimensions (zero-copy)
    ///
    /// `dims[i]` names the source dimension that becomes dimension `i`.
    pub fn permute(&self, dims: &[usize]) -> Result<Self> {
        Ok(self.with_descriptor(self.desc.permute(dims)?))
    }

    /// Broadcast to a target shape (zero-copy)
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        Ok(self.with_descriptor(self.desc.broadcast_to(shape)?))
    }

    /// Reshape in 'c' order, copying only when the view is not dense
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        self.reshape_with_order(shape, Order::C)
    }

    /// Reshape reading elements in the given order
    ///
    /// Zero-copy when the view is dense in `order`; otherwise the elements are
    /// first materialized densely in that order.
    pub fn reshape_with_order(&self, shape: &[usize], order: Order) -> Result<Self> {
        if let Some(desc) = self.desc.reshape(shape, order)? {
            return Ok(self.with_descriptor(desc));
        }
        let dense = self.contiguous_in(order, self.buffer.workspace())?;
        match dense.desc.reshape(shape, order)? {
            Some(desc) => Ok(dense.with_descriptor(desc)),
            None => Err(Error::Internal(
                "dense copy is not reshapeable".to_string(),
            )),
        }
    }

    /// Dense copy in the array's own ordering (view when already dense)
    pub fn contiguous(&self) -> Result<Self> {
        if self.is_contiguous() && self.desc.offset() == 0 {
            return Ok(self.clone());
        }
        self.contiguous_in(self.order(), self.buffer.workspace())
    }

    /// Dense copy in `order`, charged to `workspace`
    pub fn contiguous_in(&self, order: Order, workspace: Option<&Workspace>) -> Result<Self> {
        if self.dtype().is_string() {
            return self.compact_strings(order, workspace);
        }

        let elem = self.dtype().size_in_bytes();
        let mut buffer = DataBuffer::new(self.length(), self.dtype(), workspace)?;
        let desc = ShapeDescriptor::contiguous(self.shape(), order, self.dtype());
        {
            let src = self.buffer.bytes();
            let dst = buffer.bytes_mut()?;
            for (src_off, dst_off) in self.desc.offsets().zip(desc.offsets()) {
                dst[dst_off * elem..(dst_off + 1) * elem]
                    .copy_from_slice(&src[src_off * elem..(src_off + 1) * elem]);
            }
        }
        Ok(Self { buffer, desc })
    }

    /// Coordinates of a row-major linear index in this array's shape
    pub fn coords_of(&self, index: usize) -> Shape {
        linear_to_coords(index, self.shape())
    }
}

impl fmt::Debug for NDArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NDArray")
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("order", &self.order().as_char())
            .field("dtype", &self.dtype())
            .field("buffer", &self.buffer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Allocator;

    #[test]
    fn test_from_slice_shape_check() {
        assert!(NDArray::from_slice(&[1.0f32, 2.0, 3.0], &[2, 2]).is_err());
        let a = NDArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(a.length(), 4);
        assert_eq!(a.ews(), Ews::Stride(1));
    }

    #[test]
    fn test_f_order_has_same_logical_values() {
        let data = [1i32, 2, 3, 4, 5, 6];
        let c = NDArray::from_slice(&data, &[2, 3]).unwrap();
        let f = NDArray::from_slice_with_order(&data, &[2, 3], Order::F, None).unwrap();
        assert_eq!(f.data::<i32>().unwrap(), &[1, 4, 2, 5, 3, 6]);
        assert_eq!(c.to_vec::<i32>().unwrap(), f.to_vec::<i32>().unwrap());
    }

    #[test]
    fn test_dtype_checked_access() {
        let a = NDArray::from_slice(&[1.0f64], &[1]).unwrap();
        assert!(a.data::<f32>().is_err());
        assert_eq!(a.item::<f64>().unwrap(), 1.0);
    }

    #[test]
    fn test_reshape_copies_when_needed() {
        let a = NDArray::from_slice(&[1i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        let t = a.transpose(0, 1).unwrap();
        let r = t.reshape(&[6]).unwrap();
        assert!(!r.shares_buffer_with(&a));
        assert_eq!(r.to_vec::<i64>().unwrap(), vec![1, 4, 2, 5, 3, 6]);

        let v = a.reshape(&[3, 2]).unwrap();
        assert!(v.shares_buffer_with(&a));
    }

    #[test]
    fn test_broadcast_view() {
        let a = NDArray::from_slice(&[1u8, 2], &[2, 1]).unwrap();
        let b = a.broadcast_to(&[2, 3]).unwrap();
        assert_eq!(b.to_vec::<u8>().unwrap(), vec![1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_full_and_workspace_accounting() {
        let ws = Workspace::unbounded();
        let a = NDArray::full(&[2, 2], 3.5f32, Order::C, Some(&ws)).unwrap();
        assert_eq!(ws.allocated_bytes(), 16);
        assert_eq!(a.to_vec::<f32>().unwrap(), vec![3.5; 4]);
        drop(a);
        assert_eq!(ws.allocated_bytes(), 0);
    }

    #[test]
    fn test_integer_widening_read() {
        let ids = NDArray::from_slice(&[0u8, 3, 1], &[3]).unwrap();
        assert_eq!(ids.to_i64_vec().unwrap(), vec![0, 3, 1]);
        let floats = NDArray::from_slice(&[0.5f32], &[1]).unwrap();
        assert!(floats.to_i64_vec().is_err());
    }
}

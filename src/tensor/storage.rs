//! DataBuffer: aligned host memory with Arc-based sharing

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::runtime::{Allocator, Workspace};
use bytemuck::Pod;
use std::sync::Arc;

/// Byte width of one string offset-table entry
pub const STRING_OFFSET_BYTES: usize = std::mem::size_of::<i64>();

/// Reference-counted byte region backing one or more arrays
///
/// DataBuffer wraps 8-byte-aligned host memory with reference counting,
/// enabling zero-copy views (permute, reshape, broadcast) that share the
/// underlying bytes. When the last handle drops, the bytes are returned to
/// the accounting of the workspace that allocated them.
///
/// For string dtypes, `len` counts string elements and the bytes hold the
/// `(len + 1)` offset header followed by the payload.
pub struct DataBuffer {
    inner: Arc<BufferInner>,
}

struct BufferInner {
    /// Backing words (u64 keeps every element type aligned)
    words: Vec<u64>,
    /// Number of valid bytes in `words`
    len_bytes: usize,
    /// Number of elements
    len: usize,
    /// Element type
    dtype: DType,
    /// Workspace charged for `len_bytes`
    workspace: Option<Workspace>,
}

impl DataBuffer {
    /// Allocate a zero-filled buffer of `len` numeric elements
    pub fn new(len: usize, dtype: DType, workspace: Option<&Workspace>) -> Result<Self> {
        if dtype.is_string() {
            return Self::new_string(len, 0, dtype, workspace);
        }
        let len_bytes = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        Self::allocate(len, len_bytes, dtype, workspace)
    }

    /// Allocate a zero-filled string buffer with room for `payload_bytes`
    ///
    /// A zeroed header describes `len` empty strings.
    pub fn new_string(
        len: usize,
        payload_bytes: usize,
        dtype: DType,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        debug_assert!(dtype.is_string());
        let len_bytes = (len + 1)
            .checked_mul(STRING_OFFSET_BYTES)
            .and_then(|header| header.checked_add(payload_bytes))
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        Self::allocate(len, len_bytes, dtype, workspace)
    }

    /// Create a numeric buffer holding a copy of `data`
    pub fn from_slice<T: Pod>(
        data: &[T],
        dtype: DType,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        let mut buffer = Self::new(data.len(), dtype, workspace)?;
        buffer
            .bytes_mut()?
            .copy_from_slice(bytemuck::cast_slice(data));
        Ok(buffer)
    }

    fn allocate(
        len: usize,
        len_bytes: usize,
        dtype: DType,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        if let Some(ws) = workspace {
            ws.reserve(len_bytes)?;
        }

        let n_words = len_bytes.div_ceil(8);
        let mut words = Vec::new();
        if words.try_reserve_exact(n_words).is_err() {
            if let Some(ws) = workspace {
                ws.release(len_bytes);
            }
            return Err(Error::OutOfMemory { size: len_bytes });
        }
        words.resize(n_words, 0u64);

        tracing::trace!(len, len_bytes, %dtype, "allocated data buffer");

        Ok(Self {
            inner: Arc::new(BufferInner {
                words,
                len_bytes,
                len,
                dtype,
                workspace: workspace.cloned(),
            }),
        })
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if the buffer holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len_bytes
    }

    /// Workspace this buffer is charged to
    pub fn workspace(&self) -> Option<&Workspace> {
        self.inner.workspace.as_ref()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Check if this is the only reference
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Check whether two handles share the same bytes
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Raw bytes
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        let all: &[u8] = bytemuck::cast_slice(&self.inner.words);
        &all[..self.inner.len_bytes]
    }

    /// Mutable raw bytes
    ///
    /// Fails when another handle shares this buffer.
    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let inner = Arc::get_mut(&mut self.inner).ok_or_else(|| {
            Error::invalid_argument("buffer", "cannot write to a buffer shared by other views")
        })?;
        let all: &mut [u8] = bytemuck::cast_slice_mut(&mut inner.words);
        Ok(&mut all[..inner.len_bytes])
    }

    /// Typed view of a numeric buffer
    pub fn as_slice<T: Pod>(&self) -> Result<&[T]> {
        bytemuck::try_cast_slice(self.bytes())
            .map_err(|e| Error::Internal(format!("typed view of {} buffer: {e}", self.dtype())))
    }

    /// Mutable typed view of a numeric buffer
    pub fn as_mut_slice<T: Pod>(&mut self) -> Result<&mut [T]> {
        let dtype = self.dtype();
        bytemuck::try_cast_slice_mut(self.bytes_mut()?)
            .map_err(|e| Error::Internal(format!("typed view of {dtype} buffer: {e}")))
    }

    /// Offset header of a string buffer (`len + 1` entries)
    pub fn string_offsets(&self) -> Result<&[i64]> {
        self.ensure_string()?;
        let header = (self.len() + 1) * STRING_OFFSET_BYTES;
        bytemuck::try_cast_slice(&self.bytes()[..header])
            .map_err(|e| Error::Internal(format!("string header view: {e}")))
    }

    /// Payload bytes of a string buffer
    pub fn string_payload(&self) -> Result<&[u8]> {
        self.ensure_string()?;
        let header = (self.len() + 1) * STRING_OFFSET_BYTES;
        Ok(&self.bytes()[header..])
    }

    /// Mutable header and payload of a string buffer
    pub fn string_parts_mut(&mut self) -> Result<(&mut [i64], &mut [u8])> {
        self.ensure_string()?;
        let header = (self.len() + 1) * STRING_OFFSET_BYTES;
        let (head, payload) = self.bytes_mut()?.split_at_mut(header);
        let offsets = bytemuck::try_cast_slice_mut(head)
            .map_err(|e| Error::Internal(format!("string header view: {e}")))?;
        Ok((offsets, payload))
    }

    fn ensure_string(&self) -> Result<()> {
        if self.dtype().is_string() {
            Ok(())
        } else {
            Err(Error::unsupported_dtype(self.dtype(), "string buffer access"))
        }
    }
}

impl Clone for DataBuffer {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        if let Some(ws) = &self.workspace {
            ws.release(self.len_bytes);
        }
    }
}

impl std::fmt::Debug for DataBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBuffer")
            .field("len", &self.inner.len)
            .field("len_bytes", &self.inner.len_bytes)
            .field("dtype", &self.inner.dtype)
            .field("workspace", &self.inner.workspace.as_ref().map(Workspace::id))
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}

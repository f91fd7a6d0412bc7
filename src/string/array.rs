//! String element access on NDArray

use super::unicode::{self, Encoding};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::runtime::Workspace;
use crate::runtime::cpu::CpuContext;
use crate::runtime::parallel::parallel_for_slices;
use crate::tensor::{DataBuffer, NDArray, Order, ShapeDescriptor};

/// Run `body` over `out` in parallel when a context is available
pub(crate) fn for_each_slot<T, F>(ctx: Option<&CpuContext>, out: &mut [T], body: F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<()> + Sync,
{
    match ctx {
        Some(ctx) => parallel_for_slices(ctx, out, 1, body),
        None => body(0, out),
    }
}

/// Build a dense string array from per-slot source spans
///
/// `source(slot)` yields the bytes (and their encoding) of the element
/// stored at storage slot `slot` of `target`. Elements are transcoded into
/// the encoding of `target`'s dtype.
pub(crate) fn pack_strings<'a, F>(
    ctx: Option<&CpuContext>,
    target: ShapeDescriptor,
    source: F,
    workspace: Option<&Workspace>,
) -> Result<NDArray>
where
    F: Fn(usize) -> Result<(&'a [u8], Encoding)> + Sync,
{
    let to = Encoding::try_from(target.dtype())?;
    let n = target.length();

    let mut lengths = vec![0usize; n];
    for_each_slot(ctx, &mut lengths, |first, window| {
        for (k, len) in window.iter_mut().enumerate() {
            let (bytes, from) = source(first + k)?;
            *len = unicode::transcoded_len(bytes, from, to);
        }
        Ok(())
    })?;

    let offsets = super::codec::offsets_with_total(&lengths);
    let total = offsets[n] as usize;

    let mut buffer = DataBuffer::new_string(n, total, target.dtype(), workspace)?;
    {
        let (header, payload) = buffer.string_parts_mut()?;
        header.copy_from_slice(&offsets);
        let mut spans = super::codec::split_spans(payload, &offsets)?;
        for_each_slot(ctx, &mut spans, |first, window| {
            for (k, span) in window.iter_mut().enumerate() {
                let (bytes, from) = source(first + k)?;
                unicode::transcode_into(bytes, from, to, span)?;
            }
            Ok(())
        })?;
    }

    NDArray::from_parts(buffer, target)
}

/// For each storage slot of a dense `target`, the row-major logical index
/// of the element it holds
pub(crate) fn slot_to_logical(target: &ShapeDescriptor) -> Vec<usize> {
    let mut map = vec![0usize; target.length()];
    for (logical, slot) in target.offsets().enumerate() {
        map[slot] = logical;
    }
    map
}

impl NDArray {
    /// Create a 'c'-ordered string array from row-major values
    ///
    /// # Example
    /// ```
    /// use ndexec::dtype::DType;
    /// use ndexec::tensor::NDArray;
    /// let a = NDArray::from_strings(&["alpha", "β"], &[2], DType::Utf16).unwrap();
    /// assert_eq!(a.string_at(1).unwrap(), "β");
    /// ```
    pub fn from_strings<S: AsRef<str> + Sync>(
        values: &[S],
        shape: &[usize],
        dtype: DType,
    ) -> Result<Self> {
        Self::from_strings_with_order(values, shape, dtype, Order::C, None)
    }

    /// Create a string array stored in the given ordering
    pub fn from_strings_with_order<S: AsRef<str> + Sync>(
        values: &[S],
        shape: &[usize],
        dtype: DType,
        order: Order,
        workspace: Option<&Workspace>,
    ) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if values.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![values.len()],
            });
        }
        Encoding::try_from(dtype)?;

        let target = ShapeDescriptor::contiguous(shape, order, dtype);
        let logical = slot_to_logical(&target);
        pack_strings(
            None,
            target,
            move |slot| Ok((values[logical[slot]].as_ref().as_bytes(), Encoding::Utf8)),
            workspace,
        )
    }

    /// Encoding of a string array
    pub fn encoding(&self) -> Result<Encoding> {
        Encoding::try_from(self.dtype())
    }

    /// Number of string elements held by the backing buffer
    pub fn string_count(&self) -> Result<usize> {
        self.encoding()?;
        Ok(self.buffer().len())
    }

    /// Raw encoded bytes of the string at storage slot `slot`
    pub(crate) fn string_slot_bytes(&self, slot: usize) -> Result<&[u8]> {
        let offsets = self.buffer().string_offsets()?;
        let payload = self.buffer().string_payload()?;
        if slot + 1 >= offsets.len() {
            return Err(Error::IndexOutOfRange {
                op: "string access",
                what: "string slot",
                value: slot as i128,
                bound: (offsets.len() - 1) as i64,
            });
        }
        let (start, stop) = (offsets[slot], offsets[slot + 1]);
        if start < 0 || stop < start || stop as usize > payload.len() {
            return Err(Error::Internal(format!(
                "corrupt string header: span [{start}, {stop}) over {} payload bytes",
                payload.len()
            )));
        }
        Ok(&payload[start as usize..stop as usize])
    }

    /// Raw encoded bytes of the string at row-major logical `index`
    pub fn string_bytes(&self, index: usize) -> Result<&[u8]> {
        self.encoding()?;
        if index >= self.length() {
            return Err(Error::IndexOutOfRange {
                op: "string access",
                what: "element index",
                value: index as i128,
                bound: self.length() as i64,
            });
        }
        self.string_slot_bytes(self.descriptor().index_offset(index))
    }

    /// Decode the string at row-major logical `index`
    pub fn string_at(&self, index: usize) -> Result<String> {
        let encoding = self.encoding()?;
        Ok(unicode::decode_to_string(self.string_bytes(index)?, encoding))
    }

    /// Decode every string in row-major logical order
    pub fn to_strings(&self) -> Result<Vec<String>> {
        (0..self.length()).map(|i| self.string_at(i)).collect()
    }

    /// Replace the string at row-major logical `index` with encoded `value`
    ///
    /// The array is rebuilt densely in its own ordering; other views of the
    /// previous buffer are unaffected.
    pub fn set_string_bytes(&mut self, index: usize, value: &[u8], from: Encoding) -> Result<()> {
        let to = self.encoding()?;
        if index >= self.length() {
            return Err(Error::IndexOutOfRange {
                op: "string assign",
                what: "element index",
                value: index as i128,
                bound: self.length() as i64,
            });
        }

        let target = ShapeDescriptor::contiguous(self.shape(), self.order(), to.dtype());
        let logical = slot_to_logical(&target);
        let rebuilt = {
            let this = &*self;
            pack_strings(
                None,
                target,
                move |slot| {
                    let j = logical[slot];
                    if j == index {
                        Ok((value, from))
                    } else {
                        Ok((this.string_bytes(j)?, to))
                    }
                },
                this.buffer().workspace(),
            )?
        };
        *self = rebuilt;
        Ok(())
    }

    /// Replace the string at row-major logical `index`
    pub fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        self.set_string_bytes(index, value.as_bytes(), Encoding::Utf8)
    }

    /// Dense copy of a string array in `order`
    pub(crate) fn compact_strings(
        &self,
        order: Order,
        workspace: Option<&Workspace>,
    ) -> Result<NDArray> {
        let encoding = self.encoding()?;
        let target = ShapeDescriptor::contiguous(self.shape(), order, self.dtype());
        let logical = slot_to_logical(&target);
        pack_strings(
            None,
            target,
            move |slot| Ok((self.string_bytes(logical[slot])?, encoding)),
            workspace,
        )
    }
}

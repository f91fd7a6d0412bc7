//! String buffer codec
//!
//! A string buffer of `N` elements is laid out as `(N + 1)` i64 offsets
//! followed by the payload. `offsets[i]` is the number of payload bytes
//! before element `i`; `offsets[N]` is the payload length.

use super::array::for_each_slot;
use super::unicode::{self, Encoding};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuContext;
use crate::tensor::{NDArray, STRING_OFFSET_BYTES, ShapeDescriptor};

/// Byte length of the offset header for `n` elements
#[inline]
pub const fn header_len(n: usize) -> usize {
    (n + 1) * STRING_OFFSET_BYTES
}

/// Element byte lengths of a NUL-separated blob
///
/// Every NUL terminates one element; a trailing unterminated run counts as
/// the last element.
///
/// ```
/// use ndexec::string::determine_lengths;
/// assert_eq!(determine_lengths(b"ab\0\0cde"), vec![2, 0, 3]);
/// assert_eq!(determine_lengths(b"ab\0"), vec![2]);
/// ```
pub fn determine_lengths(blob: &[u8]) -> Vec<usize> {
    let mut lengths: Vec<usize> = blob
        .split(|&b| b == 0)
        .map(<[u8]>::len)
        .collect();
    // `split` yields an empty final piece after a trailing NUL
    if blob.last().is_none_or(|&b| b == 0) {
        lengths.pop();
    }
    lengths
}

/// Exclusive prefix sums of element lengths
pub fn determine_offsets(lengths: &[usize]) -> Vec<usize> {
    let mut offset = 0;
    lengths
        .iter()
        .map(|&len| {
            let start = offset;
            offset += len;
            start
        })
        .collect()
}

/// `N + 1` header offsets for the given element lengths
pub(crate) fn offsets_with_total(lengths: &[usize]) -> Vec<i64> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    let mut offset = 0i64;
    offsets.push(0);
    for &len in lengths {
        offset += len as i64;
        offsets.push(offset);
    }
    offsets
}

/// Split a payload into one mutable span per element
pub(crate) fn split_spans<'a>(mut payload: &'a mut [u8], offsets: &[i64]) -> Result<Vec<&'a mut [u8]>> {
    let mut spans = Vec::with_capacity(offsets.len().saturating_sub(1));
    for pair in offsets.windows(2) {
        let len = pair[1] - pair[0];
        if len < 0 || len as usize > payload.len() {
            return Err(Error::Internal(format!(
                "string offsets {} -> {} do not fit the payload",
                pair[0], pair[1]
            )));
        }
        let (head, tail) = std::mem::take(&mut payload).split_at_mut(len as usize);
        spans.push(head);
        payload = tail;
    }
    Ok(spans)
}

fn ensure_dense(source: &NDArray, op: &'static str) -> Result<()> {
    let dense = source.is_contiguous()
        && source.descriptor().offset() == 0
        && source.buffer().len() == source.length();
    if dense {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            "source",
            format!("{op} needs a dense string array; compact views with contiguous() first"),
        ))
    }
}

/// Target offsets for re-encoding every element of `source` as `target`
///
/// Element `i` spans `[off[i], off[i+1])` of the source payload; its byte
/// length in the target encoding is computed codepoint by codepoint. The
/// returned vector has `N + 1` entries.
pub fn determine_offsets_and_lengths(source: &NDArray, target: DType) -> Result<Vec<i64>> {
    let from = source.encoding()?;
    let to = Encoding::try_from(target)?;
    ensure_dense(source, "determine_offsets_and_lengths")?;

    let count = source.buffer().len();
    let mut lengths = Vec::with_capacity(count);
    for slot in 0..count {
        lengths.push(unicode::transcoded_len(
            source.string_slot_bytes(slot)?,
            from,
            to,
        ));
    }
    Ok(offsets_with_total(&lengths))
}

/// Re-encode every element into its precomputed target span, in parallel
///
/// Element `i` reads `in_payload[in_offsets[i]..in_offsets[i+1]]` and writes
/// only `out_payload[out_offsets[i]..out_offsets[i+1]]`.
pub fn convert_data_for_different_data_type(
    ctx: &CpuContext,
    out_payload: &mut [u8],
    out_offsets: &[i64],
    in_payload: &[u8],
    in_offsets: &[i64],
    in_type: DType,
    out_type: DType,
) -> Result<()> {
    let from = Encoding::try_from(in_type)?;
    let to = Encoding::try_from(out_type)?;
    if in_offsets.len() != out_offsets.len() {
        return Err(Error::invalid_argument(
            "offsets",
            format!(
                "source has {} offsets, target has {}",
                in_offsets.len(),
                out_offsets.len()
            ),
        ));
    }

    let mut spans = split_spans(out_payload, out_offsets)?;
    for_each_slot(Some(ctx), &mut spans, |first, window| {
        for (k, span) in window.iter_mut().enumerate() {
            let i = first + k;
            let (start, stop) = (in_offsets[i], in_offsets[i + 1]);
            if start < 0 || stop < start || stop as usize > in_payload.len() {
                return Err(Error::Internal(format!(
                    "source span [{start}, {stop}) exceeds {} payload bytes",
                    in_payload.len()
                )));
            }
            unicode::transcode_into(&in_payload[start as usize..stop as usize], from, to, span)?;
        }
        Ok(())
    })
}

/// Allocate an empty string array sized for `offsets`
///
/// The result takes `source`'s ordering and shape, except that a two-entry
/// offset table (one element) always yields shape `[1]`.
pub fn create_string_ndarray(
    ctx: &CpuContext,
    source: &NDArray,
    offsets: &[i64],
    dtype: DType,
) -> Result<NDArray> {
    Encoding::try_from(dtype)?;
    let count = offsets.len().checked_sub(1).ok_or_else(|| {
        Error::invalid_argument("offsets", "offset table needs at least one entry")
    })?;
    let shape: Vec<usize> = if offsets.len() == 2 {
        vec![1]
    } else {
        source.shape().to_vec()
    };
    let expected: usize = shape.iter().product();
    if expected != count {
        return Err(Error::shape_mismatch(&shape, &[count]));
    }

    let payload = offsets[count].max(0) as usize;
    let buffer = crate::tensor::DataBuffer::new_string(count, payload, dtype, Some(ctx.workspace()))?;
    NDArray::from_parts(
        buffer,
        ShapeDescriptor::contiguous(&shape, source.order(), dtype),
    )
}

/// Write `offsets` and the re-encoded payload of `src` into `dest`
///
/// `dest` must come from [`create_string_ndarray`] with the same offsets
/// and must not share its buffer with `src`.
pub fn assign_string_data(
    ctx: &CpuContext,
    dest: &mut NDArray,
    src: &NDArray,
    offsets: &[i64],
    dtype: DType,
) -> Result<()> {
    if dest.shares_buffer_with(src) {
        return Err(Error::invalid_argument(
            "dest",
            "destination aliases the source buffer",
        ));
    }
    ensure_dense(src, "assign_string_data")?;
    if dest.dtype() != dtype {
        return Err(Error::DTypeMismatch {
            lhs: dest.dtype(),
            rhs: dtype,
        });
    }

    let src_type = src.dtype();
    let in_offsets = src.buffer().string_offsets()?;
    let in_payload = src.buffer().string_payload()?;

    let (header, payload) = dest.buffer_mut()?.string_parts_mut()?;
    if header.len() != offsets.len() {
        return Err(Error::shape_mismatch(&[header.len()], &[offsets.len()]));
    }
    header.copy_from_slice(offsets);
    convert_data_for_different_data_type(ctx, payload, offsets, in_payload, in_offsets, src_type, dtype)
}

/// Convert a string array to another encoding
///
/// Views are compacted first; the result keeps the shape and ordering.
pub fn convert_strings(ctx: &CpuContext, src: &NDArray, dtype: DType) -> Result<NDArray> {
    tracing::debug!(from = %src.dtype(), to = %dtype, len = src.length(), "convert_strings");
    let dense;
    let src = if ensure_dense(src, "convert_strings").is_ok() {
        src
    } else {
        dense = src.contiguous()?;
        &dense
    };

    let offsets = determine_offsets_and_lengths(src, dtype)?;
    let mut out = create_string_ndarray(ctx, src, &offsets, dtype)?;
    if src.is_scalar() {
        out = out.reshape(&[])?;
    }
    assign_string_data(ctx, &mut out, src, &offsets, dtype)?;
    Ok(out)
}

/// Payload length of a string array (`offsets[N]`)
pub fn byte_length(array: &NDArray) -> Result<usize> {
    if !array.dtype().is_string() {
        return Err(Error::unsupported_dtype(array.dtype(), "byte_length"));
    }
    let offsets = array.buffer().string_offsets()?;
    Ok(offsets[offsets.len() - 1].max(0) as usize)
}

/// Split `haystack` on every occurrence of `delimiter`
///
/// ```
/// use ndexec::string::split;
/// assert_eq!(split("a,,b", ","), vec!["a", "", "b"]);
/// ```
pub fn split(haystack: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![haystack.to_string()];
    }
    haystack.split(delimiter).map(str::to_string).collect()
}

/// Count (possibly overlapping) occurrences of `needle` in `haystack`
pub fn count_subarrays<T: PartialEq>(haystack: &[T], needle: &[T]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Set element `idx` of `arr` from element `idx` of `input`, converting
/// between encodings as needed
pub fn set_value_for_different_data_type(
    arr: &mut NDArray,
    idx: usize,
    input: &NDArray,
) -> Result<()> {
    let from = input.encoding()?;
    let bytes = input.string_bytes(idx)?;
    arr.set_string_bytes(idx, bytes, from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CpuContext {
        CpuContext::new().unwrap()
    }

    #[test]
    fn test_lengths_and_offsets() {
        assert_eq!(determine_lengths(b""), Vec::<usize>::new());
        assert_eq!(determine_lengths(b"abc"), vec![3]);
        assert_eq!(determine_lengths(b"\0"), vec![0]);
        assert_eq!(determine_offsets(&[2, 0, 3]), vec![0, 2, 2]);
        assert_eq!(offsets_with_total(&[2, 0, 3]), vec![0, 2, 2, 5]);
    }

    #[test]
    fn test_offsets_for_target_encoding() {
        let a = NDArray::from_strings(&["ab", "π"], &[2], DType::Utf8).unwrap();
        assert_eq!(
            determine_offsets_and_lengths(&a, DType::Utf16).unwrap(),
            vec![0, 4, 6]
        );
        assert_eq!(
            determine_offsets_and_lengths(&a, DType::Utf32).unwrap(),
            vec![0, 8, 12]
        );
    }

    #[test]
    fn test_convert_keeps_shape_and_values() {
        let ctx = ctx();
        let a = NDArray::from_strings(&["x", "yy", "𝄞", ""], &[2, 2], DType::Utf8).unwrap();
        let b = convert_strings(&ctx, &a, DType::Utf16).unwrap();
        assert_eq!(b.shape(), &[2, 2]);
        assert_eq!(b.dtype(), DType::Utf16);
        assert_eq!(b.to_strings().unwrap(), a.to_strings().unwrap());
        assert_eq!(byte_length(&b).unwrap(), 2 + 4 + 4);
    }

    #[test]
    fn test_single_element_becomes_vector() {
        let ctx = ctx();
        let a = NDArray::from_strings(&["solo"], &[1, 1], DType::Utf8).unwrap();
        let offsets = determine_offsets_and_lengths(&a, DType::Utf32).unwrap();
        let out = create_string_ndarray(&ctx, &a, &offsets, DType::Utf32).unwrap();
        assert_eq!(out.shape(), &[1]);
    }

    #[test]
    fn test_assign_rejects_alias() {
        let ctx = ctx();
        let a = NDArray::from_strings(&["q"], &[1], DType::Utf8).unwrap();
        let mut alias = a.clone();
        let offsets = determine_offsets_and_lengths(&a, DType::Utf8).unwrap();
        assert!(assign_string_data(&ctx, &mut alias, &a, &offsets, DType::Utf8).is_err());
    }

    #[test]
    fn test_split_and_count() {
        assert_eq!(split("a::b::", "::"), vec!["a", "b", ""]);
        assert_eq!(count_subarrays(&[1i64, 1, 1, 2], &[1, 1]), 2);
        assert_eq!(count_subarrays(&[1i64, 2], &[1, 2]), 1);
        assert_eq!(count_subarrays::<i64>(&[1], &[]), 0);
    }

    #[test]
    fn test_set_value_converts() {
        let mut z = NDArray::from_strings(&["a", "b"], &[2], DType::Utf32).unwrap();
        let x = NDArray::from_strings(&["c", "δ"], &[2], DType::Utf8).unwrap();
        set_value_for_different_data_type(&mut z, 1, &x).unwrap();
        assert_eq!(z.to_strings().unwrap(), vec!["a", "δ"]);
        assert_eq!(z.dtype(), DType::Utf32);
    }
}

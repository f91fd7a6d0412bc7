//! Code-unit level transcoding between UTF-8, UTF-16 and UTF-32
//!
//! UTF-16 and UTF-32 code units are little-endian. Malformed input decodes
//! to U+FFFD; byte-length computation and conversion share the same decoder
//! so a precomputed target span is always filled exactly.

use crate::dtype::DType;
use crate::error::{Error, Result};
use std::char::REPLACEMENT_CHARACTER;

/// String element encoding
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8 bytes
    Utf8,
    /// Little-endian UTF-16 code units
    Utf16,
    /// Little-endian UTF-32 code units
    Utf32,
}

impl Encoding {
    /// The string dtype carrying this encoding
    pub const fn dtype(self) -> DType {
        match self {
            Self::Utf8 => DType::Utf8,
            Self::Utf16 => DType::Utf16,
            Self::Utf32 => DType::Utf32,
        }
    }

    /// Width of one code unit in bytes
    pub const fn unit_bytes(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16 => 2,
            Self::Utf32 => 4,
        }
    }

    /// Bytes needed to encode `c`
    #[inline]
    pub fn char_len(self, c: char) -> usize {
        match self {
            Self::Utf8 => c.len_utf8(),
            Self::Utf16 => c.len_utf16() * 2,
            Self::Utf32 => 4,
        }
    }
}

impl TryFrom<DType> for Encoding {
    type Error = Error;

    fn try_from(dtype: DType) -> Result<Self> {
        match dtype {
            DType::Utf8 => Ok(Self::Utf8),
            DType::Utf16 => Ok(Self::Utf16),
            DType::Utf32 => Ok(Self::Utf32),
            other => Err(Error::unsupported_dtype(other, "string encoding")),
        }
    }
}

/// Call `f` for every scalar value decoded from `bytes`
pub fn for_each_char(bytes: &[u8], encoding: Encoding, mut f: impl FnMut(char)) {
    match encoding {
        Encoding::Utf8 => String::from_utf8_lossy(bytes).chars().for_each(f),
        Encoding::Utf16 => {
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            for decoded in char::decode_utf16(units) {
                f(decoded.unwrap_or(REPLACEMENT_CHARACTER));
            }
            if bytes.len() % 2 != 0 {
                f(REPLACEMENT_CHARACTER);
            }
        }
        Encoding::Utf32 => {
            for quad in bytes.chunks_exact(4) {
                let unit = u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]);
                f(char::from_u32(unit).unwrap_or(REPLACEMENT_CHARACTER));
            }
            if bytes.len() % 4 != 0 {
                f(REPLACEMENT_CHARACTER);
            }
        }
    }
}

/// Byte length of `bytes` (encoded as `from`) once re-encoded as `to`
pub fn transcoded_len(bytes: &[u8], from: Encoding, to: Encoding) -> usize {
    if from == to {
        return bytes.len();
    }
    let mut len = 0;
    for_each_char(bytes, from, |c| len += to.char_len(c));
    len
}

/// Encode one scalar value into `out`, returning the bytes written
#[inline]
fn encode_char(c: char, to: Encoding, out: &mut [u8]) -> usize {
    match to {
        Encoding::Utf8 => c.encode_utf8(out).len(),
        Encoding::Utf16 => {
            let mut units = [0u16; 2];
            let encoded = c.encode_utf16(&mut units);
            for (i, unit) in encoded.iter().enumerate() {
                out[2 * i..2 * i + 2].copy_from_slice(&unit.to_le_bytes());
            }
            encoded.len() * 2
        }
        Encoding::Utf32 => {
            out[..4].copy_from_slice(&(c as u32).to_le_bytes());
            4
        }
    }
}

/// Re-encode `bytes` from `from` into `out` as `to`
///
/// `out` must be exactly [`transcoded_len`] bytes long.
pub fn transcode_into(bytes: &[u8], from: Encoding, to: Encoding, out: &mut [u8]) -> Result<()> {
    if from == to {
        if out.len() != bytes.len() {
            return Err(span_mismatch(bytes.len(), out.len()));
        }
        out.copy_from_slice(bytes);
        return Ok(());
    }

    let mut pos = 0;
    let mut overflow = false;
    for_each_char(bytes, from, |c| {
        let need = to.char_len(c);
        if overflow || pos + need > out.len() {
            overflow = true;
            return;
        }
        pos += encode_char(c, to, &mut out[pos..]);
    });

    if overflow || pos != out.len() {
        return Err(span_mismatch(transcoded_len(bytes, from, to), out.len()));
    }
    Ok(())
}

fn span_mismatch(needed: usize, got: usize) -> Error {
    Error::Internal(format!(
        "string target span holds {got} bytes but the element needs {needed}"
    ))
}

/// Encode a Rust string
pub fn encode_str(s: &str, to: Encoding) -> Vec<u8> {
    match to {
        Encoding::Utf8 => s.as_bytes().to_vec(),
        Encoding::Utf16 => s.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        Encoding::Utf32 => s.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
    }
}

/// Decode into a Rust string
pub fn decode_to_string(bytes: &[u8], from: Encoding) -> String {
    let mut out = String::with_capacity(bytes.len());
    for_each_char(bytes, from, |c| out.push(c));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str, from: Encoding, to: Encoding) {
        let src = encode_str(s, from);
        let mut mid = vec![0u8; transcoded_len(&src, from, to)];
        transcode_into(&src, from, to, &mut mid).unwrap();
        assert_eq!(mid, encode_str(s, to));

        let mut back = vec![0u8; transcoded_len(&mid, to, from)];
        transcode_into(&mid, to, from, &mut back).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn test_roundtrips() {
        for s in ["", "alpha", "π ≈ 3.14", "𝄞 clef", "日本語"] {
            roundtrip(s, Encoding::Utf8, Encoding::Utf16);
            roundtrip(s, Encoding::Utf8, Encoding::Utf32);
            roundtrip(s, Encoding::Utf16, Encoding::Utf32);
        }
    }

    #[test]
    fn test_lengths() {
        let s = "a𝄞";
        let utf8 = encode_str(s, Encoding::Utf8);
        assert_eq!(transcoded_len(&utf8, Encoding::Utf8, Encoding::Utf16), 2 + 4);
        assert_eq!(transcoded_len(&utf8, Encoding::Utf8, Encoding::Utf32), 8);
    }

    #[test]
    fn test_invalid_input_uses_replacement() {
        // lone high surrogate
        let bad = 0xD800u16.to_le_bytes();
        let len = transcoded_len(&bad, Encoding::Utf16, Encoding::Utf8);
        assert_eq!(len, REPLACEMENT_CHARACTER.len_utf8());
        let mut out = vec![0u8; len];
        transcode_into(&bad, Encoding::Utf16, Encoding::Utf8, &mut out).unwrap();
        assert_eq!(decode_to_string(&out, Encoding::Utf8), "\u{FFFD}");
    }

    #[test]
    fn test_wrong_span_is_rejected() {
        let src = encode_str("abc", Encoding::Utf8);
        let mut out = vec![0u8; 4];
        assert!(transcode_into(&src, Encoding::Utf8, Encoding::Utf16, &mut out).is_err());
    }

    #[test]
    fn test_encoding_from_dtype() {
        assert_eq!(Encoding::try_from(DType::Utf16).unwrap(), Encoding::Utf16);
        assert!(Encoding::try_from(DType::F32).is_err());
    }
}

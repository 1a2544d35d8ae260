//! Fixed-width value codec.
//!
//! Values are stored as `N` chunks of `W` bytes each. A string is encoded by
//! splitting its UTF-8 bytes across the chunks and zero-padding the rest.
//!
//! Two properties are inherited from the storage cells this models and are
//! kept on purpose:
//!
//! - Bytes beyond `N * W` are discarded by [`encode`]. Use
//!   [`ChunkedValue::encode_checked`] to reject oversized input instead.
//! - [`decode`] strips *every* zero byte, so a value containing an embedded
//!   NUL does not survive a round trip.

use std::fmt;

use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Bytes per chunk.
pub const CHUNK_BYTES: usize = 31;

/// Chunks per vault value.
pub const CHUNK_COUNT: usize = 4;

/// Byte capacity of a vault value.
pub const VAULT_CAPACITY: usize = CHUNK_COUNT * CHUNK_BYTES;

/// Encode a string into `N` zero-padded chunks of `W` bytes.
///
/// Input beyond `N * W` bytes is silently dropped.
pub fn encode<const N: usize, const W: usize>(value: &str) -> [[u8; W]; N] {
    let mut chunks = [[0u8; W]; N];
    let bytes = value.as_bytes();

    for (chunk, src) in chunks.iter_mut().zip(bytes.chunks(W)) {
        chunk[..src.len()].copy_from_slice(src);
    }

    chunks
}

/// Decode chunks back into a string.
///
/// All zero bytes are removed before UTF-8 decoding. Invalid UTF-8 (only
/// possible when truncation split a multi-byte character) is replaced with
/// U+FFFD rather than reported.
pub fn decode<const N: usize, const W: usize>(chunks: &[[u8; W]; N]) -> String {
    let bytes = strip_zeros(chunks);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn strip_zeros<const N: usize, const W: usize>(chunks: &[[u8; W]; N]) -> Vec<u8> {
    chunks
        .iter()
        .flat_map(|chunk| chunk.iter().copied())
        .filter(|&b| b != 0)
        .collect()
}

/// A value held in `N` fixed-width chunks.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkedValue<const N: usize, const W: usize> {
    chunks: [[u8; W]; N],
}

/// The chunk layout used by credential vault entries (4 x 31 bytes).
pub type VaultValue = ChunkedValue<CHUNK_COUNT, CHUNK_BYTES>;

impl<const N: usize, const W: usize> ChunkedValue<N, W> {
    /// Total byte capacity.
    pub const CAPACITY: usize = N * W;

    /// Encode a string, truncating anything past capacity.
    pub fn encode(value: &str) -> Self {
        Self {
            chunks: encode::<N, W>(value),
        }
    }

    /// Encode a string, rejecting input that would be truncated.
    pub fn encode_checked(value: &str) -> Result<Self, CoreError> {
        let len = value.len();
        if len > Self::CAPACITY {
            return Err(CoreError::ValueTooLarge {
                len,
                capacity: Self::CAPACITY,
            });
        }
        Ok(Self::encode(value))
    }

    /// Wrap already-encoded chunks.
    pub const fn from_chunks(chunks: [[u8; W]; N]) -> Self {
        Self { chunks }
    }

    /// Rebuild from a flat byte slice of exactly `N * W` bytes.
    pub fn from_flat(flat: &[u8]) -> Result<Self, CoreError> {
        if flat.len() != Self::CAPACITY {
            return Err(CoreError::DecodingError(format!(
                "expected {} bytes, got {}",
                Self::CAPACITY,
                flat.len()
            )));
        }
        let mut chunks = [[0u8; W]; N];
        for (chunk, src) in chunks.iter_mut().zip(flat.chunks(W)) {
            chunk.copy_from_slice(src);
        }
        Ok(Self { chunks })
    }

    /// The raw chunks.
    pub const fn chunks(&self) -> &[[u8; W]; N] {
        &self.chunks
    }

    /// All chunk bytes laid end to end, padding included.
    pub fn to_flat(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }

    /// The stored value bytes with zero padding removed.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(strip_zeros(&self.chunks))
    }

    /// Decode to a string.
    pub fn decode(&self) -> String {
        decode(&self.chunks)
    }
}

impl<const N: usize, const W: usize> fmt::Debug for ChunkedValue<N, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are secrets; never print the contents.
        write!(f, "ChunkedValue<{}, {}>({} bytes)", N, W, self.to_bytes().len())
    }
}

impl<const N: usize, const W: usize> Serialize for ChunkedValue<N, W> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_flat().serialize(serializer)
    }
}

impl<'de, const N: usize, const W: usize> Deserialize<'de> for ChunkedValue<N, W> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flat = Vec::<u8>::deserialize(deserializer)?;
        Self::from_flat(&flat).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_value_roundtrip() {
        let value = VaultValue::encode("sk-live-1234");
        assert_eq!(value.decode(), "sk-live-1234");
        assert_eq!(&value.chunks()[0][..12], b"sk-live-1234");
        assert!(value.chunks()[1].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_value_spans_chunks() {
        let input = "a".repeat(31) + &"b".repeat(31) + "c";
        let value = VaultValue::encode(&input);

        assert!(value.chunks()[0].iter().all(|&b| b == b'a'));
        assert!(value.chunks()[1].iter().all(|&b| b == b'b'));
        assert_eq!(value.chunks()[2][0], b'c');
        assert_eq!(value.decode(), input);
    }

    #[test]
    fn test_exact_capacity_roundtrip() {
        let input = "z".repeat(VAULT_CAPACITY);
        assert_eq!(VaultValue::encode(&input).decode(), input);
    }

    #[test]
    fn test_overflow_truncates_last_byte() {
        let input: String = (0..125).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let decoded = VaultValue::encode(&input).decode();

        assert_eq!(decoded.len(), 124);
        assert_eq!(decoded, input[..124]);
    }

    #[test]
    fn test_encode_checked_rejects_overflow() {
        let input = "x".repeat(125);
        let err = VaultValue::encode_checked(&input).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ValueTooLarge {
                len: 125,
                capacity: 124
            }
        ));

        assert!(VaultValue::encode_checked(&"x".repeat(124)).is_ok());
    }

    #[test]
    fn test_embedded_zero_byte_is_stripped() {
        let value = VaultValue::encode("ab\0cd");
        assert_eq!(value.decode(), "abcd");
    }

    #[test]
    fn test_empty_value() {
        let value = VaultValue::encode("");
        assert_eq!(value.decode(), "");
        assert!(value.to_bytes().is_empty());
    }

    #[test]
    fn test_split_multibyte_char_decodes_lossily() {
        // 123 ASCII bytes followed by a 2-byte character: only the first byte
        // of the character fits.
        let input = "a".repeat(123) + "é";
        let decoded = VaultValue::encode(&input).decode();
        assert!(decoded.starts_with(&"a".repeat(123)));
        assert!(decoded.ends_with('\u{FFFD}'));
    }

    #[test]
    fn test_custom_layout() {
        let chunks = encode::<2, 4>("abcdefghij");
        assert_eq!(chunks, [*b"abcd", *b"efgh"]);
        assert_eq!(decode(&chunks), "abcdefgh");
    }

    #[test]
    fn test_flat_roundtrip() {
        let value = VaultValue::encode("flat");
        let flat = value.to_flat();
        assert_eq!(flat.len(), VAULT_CAPACITY);
        assert_eq!(VaultValue::from_flat(&flat).unwrap(), value);
        assert!(VaultValue::from_flat(&flat[..10]).is_err());
    }

    #[test]
    fn test_debug_hides_contents() {
        let value = VaultValue::encode("hunter2");
        let debug = format!("{:?}", value);
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_serde_json() {
        let value = VaultValue::encode("json");
        let json = serde_json::to_string(&value).unwrap();
        let recovered: VaultValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, recovered);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_without_nul(s in "[^\\x00]{0,30}") {
            // 30 chars of at most 4 bytes each always fit.
            prop_assert_eq!(VaultValue::encode(&s).decode(), s);
        }

        #[test]
        fn prop_decoded_never_exceeds_capacity(s in ".{0,200}") {
            let bytes = VaultValue::encode(&s).to_bytes();
            prop_assert!(bytes.len() <= VAULT_CAPACITY);
        }
    }
}

//! The one serialization contract used for everything the store persists:
//! the index, every [`StoredValue`](super::StoredValue), and the children
//! lists inside node values.
//!
//! `bincode` with varint integers. Decoding is bounded by the input length
//! and rejects trailing bytes, so a damaged buffer fails instead of
//! allocating wildly or decoding a prefix.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::DefaultOptions::new().serialize(value)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    bincode::DefaultOptions::new()
        .with_limit(bytes.len() as u64)
        .reject_trailing_bytes()
        .deserialize(bytes)
}

pub fn compress(bytes: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::encode_all(bytes, level)
}

pub fn decompress(bytes: &[u8]) -> io::Result<Vec<u8>> {
    zstd::decode_all(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode(&42u64).unwrap();
        bytes.push(0);
        assert!(decode::<u64>(&bytes).is_err());
    }

    #[test]
    fn oversized_length_prefix_fails_cleanly() {
        // A map claiming billions of entries in a five byte buffer.
        let bytes = [0xFCu8, 0xFF, 0xFF, 0xFF, 0x7F];
        assert!(decode::<HashMap<String, u64>>(&bytes).is_err());
    }

    #[test]
    fn compressed_buffers_shrink_repetitive_input() {
        let input = vec![7u8; 64 * 1024];
        let packed = compress(&input, 3).unwrap();
        assert!(packed.len() < input.len() / 10);
        assert_eq!(decompress(&packed).unwrap(), input);
    }

    #[test]
    fn garbage_does_not_decompress() {
        assert!(decompress(b"definitely not zstd").is_err());
    }
}

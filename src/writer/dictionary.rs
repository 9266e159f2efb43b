// Dictionary encoding.
//
// Values are interned into a small-integer dictionary in first-seen order;
// the index stream is RLE/bit-packed behind a one-byte bit-width prefix, and
// the dictionary page is the plain encoding of the distinct values in
// insertion order. Built single-threaded per column, so ids and page bytes
// are deterministic.

use std::collections::HashMap;

use crate::writer::rle::{decode_hybrid_rle, encode_hybrid_rle};
use crate::writer::varint::bits_required;

/// Interns raw value encodings (the caller passes each value's plain-encoded
/// bytes) and records the index stream.
pub struct DictionaryEncoder {
    map: HashMap<Vec<u8>, u32>,
    values: Vec<Vec<u8>>,
    indices: Vec<u32>,
    max_entries: usize,
}

/// Dictionary size ceiling; past this the caller falls back to the column's
/// plain or delta encoding.
pub const DEFAULT_DICTIONARY_MAX: usize = 1 << 16;

impl DictionaryEncoder {
    pub fn new(max_entries: usize) -> Self {
        DictionaryEncoder {
            map: HashMap::new(),
            values: Vec::new(),
            indices: Vec::new(),
            max_entries,
        }
    }

    /// Intern one value. Returns false once the dictionary would exceed its
    /// ceiling; the encoder is then abandoned.
    #[must_use]
    pub fn put(&mut self, value: &[u8]) -> bool {
        if let Some(&id) = self.map.get(value) {
            self.indices.push(id);
            return true;
        }
        if self.values.len() >= self.max_entries {
            return false;
        }
        let id = self.values.len() as u32;
        self.map.insert(value.to_vec(), id);
        self.values.push(value.to_vec());
        self.indices.push(id);
        true
    }

    pub fn num_entries(&self) -> usize {
        self.values.len()
    }

    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    /// Dictionary page: the distinct values' plain encodings, concatenated
    /// in insertion order.
    pub fn dict_page(&self) -> Vec<u8> {
        let total: usize = self.values.iter().map(|v| v.len()).sum();
        let mut page = Vec::with_capacity(total);
        for v in &self.values {
            page.extend_from_slice(v);
        }
        page
    }

    /// Index stream: one bit-width byte, then the RLE/bit-packed ids.
    pub fn encode_indices(&self, output: &mut Vec<u8>) -> u8 {
        let bit_width = bits_required(self.values.len().saturating_sub(1) as u32);
        output.push(bit_width);
        encode_hybrid_rle(&self.indices, bit_width, output);
        bit_width
    }
}

/// Decode an index stream written by `encode_indices`.
pub fn decode_indices(data: &[u8], pos: &mut usize, num_values: usize) -> Option<Vec<u32>> {
    let bit_width = *data.get(*pos)?;
    *pos += 1;
    if num_values == 0 {
        return Some(Vec::new());
    }
    decode_hybrid_rle(data, pos, bit_width, num_values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_first_seen_order() {
        let mut enc = DictionaryEncoder::new(16);
        for v in [&b"b"[..], b"a", b"b", b"c", b"a"] {
            assert!(enc.put(v));
        }
        assert_eq!(enc.num_entries(), 3);
        assert_eq!(enc.dict_page(), b"bac");
        assert_eq!(enc.indices, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn test_index_stream_round_trip() {
        let mut enc = DictionaryEncoder::new(64);
        let input: Vec<u32> = (0..300).map(|i| i % 7).collect();
        for &i in &input {
            assert!(enc.put(format!("v{i}").as_bytes()));
        }
        let mut out = Vec::new();
        let bit_width = enc.encode_indices(&mut out);
        assert_eq!(bit_width, 3, "7 entries need 3 bits");
        let mut pos = 0;
        let decoded = decode_indices(&out, &mut pos, 300).expect("decode");
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_overflow_signals_fallback() {
        let mut enc = DictionaryEncoder::new(2);
        assert!(enc.put(b"a"));
        assert!(enc.put(b"b"));
        assert!(enc.put(b"a"), "existing entries still intern");
        assert!(!enc.put(b"c"), "third distinct value overflows");
    }

    #[test]
    fn test_single_entry_dictionary() {
        let mut enc = DictionaryEncoder::new(4);
        for _ in 0..100 {
            assert!(enc.put(b"same"));
        }
        let mut out = Vec::new();
        let bit_width = enc.encode_indices(&mut out);
        assert_eq!(bit_width, 0);
        let mut pos = 0;
        let decoded = decode_indices(&out, &mut pos, 100).expect("decode");
        assert!(decoded.iter().all(|&i| i == 0));
    }
}

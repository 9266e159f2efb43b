// RLE/bit-packed hybrid encoding.
//
// The canonical definition-level encoding: runs of 8 or more equal values
// become an RLE run with header `(count << 1) | 0` followed by the value in
// ceil(bit_width / 8) bytes; everything else is bit-packed in groups of 8
// with header `(groups << 1) | 1`. The encoder buffers up to 64 values and
// tracks the length of the trailing run.
//
// Definition levels with zero nulls take a fast path: one RLE run covering
// the whole page, no bitmap iteration.

use crate::writer::varint::{read_uvarint, write_uvarint};

pub struct HybridRleEncoder {
    bit_width: u8,
    bytes_per_value: usize,
    output: Vec<u8>,
    buffered: Vec<u32>,
    current: u32,
    repeat: usize,
}

impl HybridRleEncoder {
    pub fn new(bit_width: u8) -> Self {
        HybridRleEncoder {
            bit_width,
            bytes_per_value: ((bit_width as usize) + 7) / 8,
            output: Vec::with_capacity(1024),
            buffered: Vec::with_capacity(64),
            current: 0,
            repeat: 0,
        }
    }

    pub fn put(&mut self, value: u32) {
        if self.buffered.is_empty() {
            self.current = value;
            self.repeat = 1;
            self.buffered.push(value);
            return;
        }

        if value == self.current {
            self.repeat += 1;
            self.buffered.push(value);
            if self.repeat >= 8 {
                // A significant run: flush the preceding non-repeated values
                // as bit-packed and keep only the run buffered.
                let non_repeated = self.buffered.len() - self.repeat;
                if non_repeated > 0 {
                    self.flush_bit_packed(non_repeated);
                    self.buffered.drain(..non_repeated);
                }
            }
        } else {
            if self.repeat >= 8 {
                self.flush_rle_run();
                self.buffered.clear();
            }
            self.current = value;
            self.repeat = 1;
            self.buffered.push(value);
        }

        if self.buffered.len() >= 64 {
            self.flush_buffered();
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.flush_buffered();
        self.output
    }

    fn flush_buffered(&mut self) {
        if self.buffered.is_empty() {
            return;
        }
        if self.repeat >= 8 && self.buffered.len() == self.repeat {
            self.flush_rle_run();
        } else if self.repeat >= 8 {
            let bit_packed = self.buffered.len() - self.repeat;
            self.flush_bit_packed(bit_packed);
            self.flush_rle_run();
        } else {
            self.flush_bit_packed(self.buffered.len());
        }
        self.buffered.clear();
        self.repeat = 0;
    }

    fn flush_rle_run(&mut self) {
        if self.repeat == 0 {
            return;
        }
        write_uvarint((self.repeat as u64) << 1, &mut self.output);
        for b in 0..self.bytes_per_value {
            self.output.push((self.current >> (b * 8)) as u8);
        }
        self.repeat = 0;
    }

    fn flush_bit_packed(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let groups = (count + 7) / 8;
        write_uvarint(((groups as u64) << 1) | 1, &mut self.output);

        let mut buffer: u64 = 0;
        let mut bits_in_buffer = 0usize;
        for i in 0..groups * 8 {
            let value = if i < count { self.buffered[i] } else { 0 };
            buffer |= (value as u64) << bits_in_buffer;
            bits_in_buffer += self.bit_width as usize;
            while bits_in_buffer >= 8 {
                self.output.push(buffer as u8);
                buffer >>= 8;
                bits_in_buffer -= 8;
            }
        }
        if bits_in_buffer > 0 {
            self.output.push(buffer as u8);
        }
    }
}

/// Encode a full sequence with the hybrid scheme.
pub fn encode_hybrid_rle(values: &[u32], bit_width: u8, output: &mut Vec<u8>) {
    if values.is_empty() {
        return;
    }
    let mut encoder = HybridRleEncoder::new(bit_width);
    for &v in values {
        encoder.put(v);
    }
    output.extend_from_slice(&encoder.finish());
}

/// Decode `num_values` hybrid-encoded values, advancing `pos`.
pub fn decode_hybrid_rle(
    data: &[u8],
    pos: &mut usize,
    bit_width: u8,
    num_values: usize,
) -> Option<Vec<u32>> {
    let mut out = Vec::with_capacity(num_values);
    let bytes_per_value = ((bit_width as usize) + 7) / 8;
    while out.len() < num_values {
        let header = read_uvarint(data, pos)?;
        if header & 1 == 0 {
            // RLE run.
            let count = (header >> 1) as usize;
            let mut value: u32 = 0;
            for b in 0..bytes_per_value {
                value |= (*data.get(*pos)? as u32) << (b * 8);
                *pos += 1;
            }
            let take = count.min(num_values - out.len());
            out.extend(std::iter::repeat(value).take(take));
            if take < count {
                return None;
            }
        } else {
            // Bit-packed groups of 8.
            let groups = (header >> 1) as usize;
            let total = groups * 8;
            let mut buffer: u64 = 0;
            let mut bits_in_buffer = 0usize;
            let mask = if bit_width >= 32 {
                u32::MAX as u64
            } else {
                (1u64 << bit_width) - 1
            };
            for _ in 0..total {
                while bits_in_buffer < bit_width as usize {
                    buffer |= (*data.get(*pos)? as u64) << bits_in_buffer;
                    *pos += 1;
                    bits_in_buffer += 8;
                }
                let value = (buffer & mask) as u32;
                buffer >>= bit_width;
                bits_in_buffer -= bit_width as usize;
                // Values past num_values are group padding.
                if out.len() < num_values {
                    out.push(value);
                }
            }
        }
    }
    Some(out)
}

// ===========================================================================
// Definition levels
// ===========================================================================

/// Encode a null bitmap as definition levels (0 = null, `max_def_level`
/// otherwise), prefixed with the 4-byte little-endian length of the encoded
/// body. `null_count` enables the zero-null fast path: a single RLE run
/// covering every row without touching the bitmap.
pub fn encode_def_levels(
    nulls: &[bool],
    max_def_level: u8,
    null_count: usize,
    output: &mut Vec<u8>,
) {
    if nulls.is_empty() {
        return;
    }
    let bit_width = crate::writer::varint::bits_required(max_def_level as u32);
    let length_pos = output.len();
    output.extend_from_slice(&[0u8; 4]);
    let data_start = output.len();

    if null_count == 0 {
        write_uvarint((nulls.len() as u64) << 1, output);
        let bytes_per_value = ((bit_width as usize) + 7) / 8;
        for b in 0..bytes_per_value {
            output.push((max_def_level >> (b * 8)) as u8);
        }
    } else {
        let mut encoder = HybridRleEncoder::new(bit_width);
        for &is_null in nulls {
            encoder.put(if is_null { 0 } else { max_def_level as u32 });
        }
        output.extend_from_slice(&encoder.finish());
    }

    let encoded_len = (output.len() - data_start) as u32;
    output[length_pos..length_pos + 4].copy_from_slice(&encoded_len.to_le_bytes());
}

/// Decode definition levels written by `encode_def_levels`.
pub fn decode_def_levels(
    data: &[u8],
    pos: &mut usize,
    max_def_level: u8,
    num_values: usize,
) -> Option<Vec<u32>> {
    if num_values == 0 {
        return Some(Vec::new());
    }
    let len_bytes: [u8; 4] = data.get(*pos..*pos + 4)?.try_into().ok()?;
    let body_len = u32::from_le_bytes(len_bytes) as usize;
    *pos += 4;
    let body_end = *pos + body_len;
    let bit_width = crate::writer::varint::bits_required(max_def_level as u32);
    let levels = decode_hybrid_rle(data, pos, bit_width, num_values)?;
    if *pos > body_end {
        return None;
    }
    *pos = body_end;
    Some(levels)
}

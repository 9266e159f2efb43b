// Delta binary packed encoding for integers.
//
// Geometry: blocks of 128 deltas, 4 mini-blocks of 32 per block. Header:
// varint(block_size), varint(miniblocks_per_block), varint(total_values),
// zigzag-varint(first_value). Per block: zigzag-varint(min_delta), four
// bit-width bytes, then each mini-block's `delta - min_delta` values packed
// at its width. Arithmetic wraps, so the full i64 range round-trips.

use crate::writer::varint::{
    bits_required_u64, read_uvarint, write_uvarint, zigzag_decode, zigzag_encode,
};

const BLOCK_SIZE: usize = 128;
const MINIBLOCK_COUNT: usize = 4;
const MINIBLOCK_SIZE: usize = BLOCK_SIZE / MINIBLOCK_COUNT;

fn bit_pack(values: &[u64], bit_width: u8, output: &mut Vec<u8>) {
    if bit_width == 0 {
        return;
    }
    let mut buffer: u128 = 0;
    let mut bits_in_buffer = 0usize;
    for &v in values {
        buffer |= (v as u128) << bits_in_buffer;
        bits_in_buffer += bit_width as usize;
        while bits_in_buffer >= 8 {
            output.push(buffer as u8);
            buffer >>= 8;
            bits_in_buffer -= 8;
        }
    }
    if bits_in_buffer > 0 {
        output.push(buffer as u8);
    }
}

fn bit_unpack(data: &[u8], pos: &mut usize, bit_width: u8, count: usize) -> Option<Vec<u64>> {
    let mut out = Vec::with_capacity(count);
    if bit_width == 0 {
        out.resize(count, 0);
        return Some(out);
    }
    let mut buffer: u128 = 0;
    let mut bits_in_buffer = 0usize;
    let mask = if bit_width >= 64 {
        u64::MAX as u128
    } else {
        (1u128 << bit_width) - 1
    };
    for _ in 0..count {
        while bits_in_buffer < bit_width as usize {
            buffer |= (*data.get(*pos)? as u128) << bits_in_buffer;
            *pos += 1;
            bits_in_buffer += 8;
        }
        out.push((buffer & mask) as u64);
        buffer >>= bit_width;
        bits_in_buffer -= bit_width as usize;
    }
    Some(out)
}

fn encode_deltas(first: i64, deltas: &[i64], output: &mut Vec<u8>) {
    write_uvarint(BLOCK_SIZE as u64, output);
    write_uvarint(MINIBLOCK_COUNT as u64, output);
    write_uvarint((deltas.len() + 1) as u64, output);
    write_uvarint(zigzag_encode(first), output);

    let mut idx = 0;
    while idx < deltas.len() {
        let block = &deltas[idx..(idx + BLOCK_SIZE).min(deltas.len())];
        let min_delta = block.iter().copied().min().unwrap_or(0);
        write_uvarint(zigzag_encode(min_delta), output);

        let mut widths = [0u8; MINIBLOCK_COUNT];
        for (mb, width) in widths.iter_mut().enumerate() {
            let lo = mb * MINIBLOCK_SIZE;
            if lo >= block.len() {
                continue;
            }
            let hi = (lo + MINIBLOCK_SIZE).min(block.len());
            let max_adjusted = block[lo..hi]
                .iter()
                .map(|&d| d.wrapping_sub(min_delta) as u64)
                .max()
                .unwrap_or(0);
            *width = bits_required_u64(max_adjusted);
        }
        output.extend_from_slice(&widths);

        for (mb, &width) in widths.iter().enumerate() {
            let lo = mb * MINIBLOCK_SIZE;
            if lo >= block.len() {
                continue;
            }
            let hi = (lo + MINIBLOCK_SIZE).min(block.len());
            let adjusted: Vec<u64> = block[lo..hi]
                .iter()
                .map(|&d| d.wrapping_sub(min_delta) as u64)
                .collect();
            bit_pack(&adjusted, width, output);
        }
        idx += block.len();
    }
}

fn decode_deltas(data: &[u8], pos: &mut usize) -> Option<(i64, Vec<i64>, usize)> {
    let block_size = read_uvarint(data, pos)? as usize;
    let miniblocks = read_uvarint(data, pos)? as usize;
    if block_size == 0 || miniblocks == 0 || block_size % miniblocks != 0 {
        return None;
    }
    let miniblock_size = block_size / miniblocks;
    let total = read_uvarint(data, pos)? as usize;
    let first = zigzag_decode(read_uvarint(data, pos)?);
    if total == 0 {
        return None;
    }

    let mut deltas = Vec::with_capacity(total - 1);
    while deltas.len() < total - 1 {
        let remaining = total - 1 - deltas.len();
        let block_count = remaining.min(block_size);
        let min_delta = zigzag_decode(read_uvarint(data, pos)?);
        let mut widths = vec![0u8; miniblocks];
        for w in widths.iter_mut() {
            *w = *data.get(*pos)?;
            *pos += 1;
        }
        for (mb, &width) in widths.iter().enumerate() {
            let lo = mb * miniblock_size;
            if lo >= block_count {
                continue;
            }
            let hi = (lo + miniblock_size).min(block_count);
            let adjusted = bit_unpack(data, pos, width, hi - lo)?;
            for a in adjusted {
                deltas.push(min_delta.wrapping_add(a as i64));
            }
        }
    }
    Some((first, deltas, total))
}

/// Encode i32 values with delta binary packing.
pub fn encode_delta_i32(values: &[i32], output: &mut Vec<u8>) {
    if values.is_empty() {
        return;
    }
    let deltas: Vec<i64> = values
        .windows(2)
        .map(|w| w[1] as i64 - w[0] as i64)
        .collect();
    encode_deltas(values[0] as i64, &deltas, output);
}

/// Encode i64 values with delta binary packing. Deltas wrap.
pub fn encode_delta_i64(values: &[i64], output: &mut Vec<u8>) {
    if values.is_empty() {
        return;
    }
    let deltas: Vec<i64> = values.windows(2).map(|w| w[1].wrapping_sub(w[0])).collect();
    encode_deltas(values[0], &deltas, output);
}

/// Decode a delta-binary-packed i32 sequence, advancing `pos`.
pub fn decode_delta_i32(data: &[u8], pos: &mut usize) -> Option<Vec<i32>> {
    let (first, deltas, total) = decode_deltas(data, pos)?;
    let mut out = Vec::with_capacity(total);
    let mut current = first;
    out.push(i32::try_from(current).ok()?);
    for d in deltas {
        current = current.wrapping_add(d);
        out.push(i32::try_from(current).ok()?);
    }
    Some(out)
}

/// Decode a delta-binary-packed i64 sequence, advancing `pos`.
pub fn decode_delta_i64(data: &[u8], pos: &mut usize) -> Option<Vec<i64>> {
    let (first, deltas, total) = decode_deltas(data, pos)?;
    let mut out = Vec::with_capacity(total);
    let mut current = first;
    out.push(current);
    for d in deltas {
        current = current.wrapping_add(d);
        out.push(current);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_i32(values: &[i32]) {
        let mut encoded = Vec::new();
        encode_delta_i32(values, &mut encoded);
        let mut pos = 0;
        let decoded = decode_delta_i32(&encoded, &mut pos).expect("decode");
        assert_eq!(decoded, values);
        assert_eq!(pos, encoded.len());
    }

    fn round_trip_i64(values: &[i64]) {
        let mut encoded = Vec::new();
        encode_delta_i64(values, &mut encoded);
        let mut pos = 0;
        let decoded = decode_delta_i64(&encoded, &mut pos).expect("decode");
        assert_eq!(decoded, values);
        assert_eq!(pos, encoded.len());
    }

    #[test]
    fn test_single_value() {
        round_trip_i32(&[42]);
        round_trip_i64(&[i64::MIN]);
    }

    #[test]
    fn test_monotonic_sequence_is_compact() {
        let values: Vec<i32> = (0..1000).collect();
        let mut encoded = Vec::new();
        encode_delta_i32(&values, &mut encoded);
        // Constant delta of 1: every adjusted delta is 0.
        assert!(
            encoded.len() < 100,
            "monotonic run should collapse, got {} bytes",
            encoded.len()
        );
        round_trip_i32(&values);
    }

    #[test]
    fn test_mixed_signs_and_magnitudes() {
        round_trip_i32(&[0, -1, i32::MAX, i32::MIN, 7, 7, 7, -100]);
        round_trip_i64(&[0, -1, i64::MAX, i64::MIN, 7, 7, 7, -100]);
    }

    #[test]
    fn test_partial_blocks_and_miniblocks() {
        // Lengths probing block/mini-block edges.
        for len in [1usize, 2, 31, 32, 33, 127, 128, 129, 255, 256, 257] {
            let values: Vec<i32> = (0..len as i32).map(|i| i * 7 - 300).collect();
            round_trip_i32(&values);
        }
    }

    #[test]
    fn test_large_sequence() {
        let mut state = 0x1234_5678u64;
        let values: Vec<i64> = (0..100_000)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                state as i64
            })
            .collect();
        round_trip_i64(&values);
    }

    #[test]
    fn test_extreme_delta_wrap() {
        // MIN -> MAX has a delta that overflows i64; wrapping handles it.
        round_trip_i64(&[i64::MIN, i64::MAX, i64::MIN, 0]);
    }

    #[test]
    fn test_empty_is_empty() {
        let mut encoded = Vec::new();
        encode_delta_i32(&[], &mut encoded);
        assert!(encoded.is_empty());
    }
}

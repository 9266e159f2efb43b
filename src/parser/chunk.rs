// Row-aligned chunk splitting.
//
// The finder walks 64-byte blocks once, carrying quote parity from offset 0,
// so every boundary it produces is one past a genuine row terminator outside
// quotes. A quoted field longer than the target simply keeps the chunk
// growing until a real terminator appears; an unterminated quote at buffer
// end leaves the final chunk extending to EOF for the indexer to report.

use crate::buffer::AlignedBuffer;
use crate::dialect::{Dialect, EscapeMode};
use crate::parser::indexer::EscapeTracker;
use crate::simd::{kernels, BLOCK};

/// A half-open, row-aligned byte range assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
    /// Physical rows terminated inside the chunk, plus a trailing
    /// unterminated row in the final chunk.
    pub row_count: usize,
}

/// Split `buf[start..]` into row-aligned chunks of roughly `target` bytes.
pub fn find_chunks(
    buf: &AlignedBuffer,
    start: usize,
    dialect: &Dialect,
    target: usize,
) -> Vec<Chunk> {
    let len = buf.len();
    if start >= len {
        return Vec::new();
    }
    let target = target.max(BLOCK);
    let k = kernels();
    let padded = buf.padded();
    let quote = dialect.quote_byte();
    let quoting = dialect.quote.is_some();
    let backslash = dialect.escape == EscapeMode::Backslash;

    let mut chunks = Vec::with_capacity((len - start) / target + 1);
    let mut chunk_start = start;
    let mut goal = (start + target).min(len);
    let mut rows: usize = 0;
    let mut last_term_end = start;
    let mut carry = 0u64;
    let mut esc = EscapeTracker::default();

    let mut base = start;
    while base < len {
        let valid = (len - base).min(BLOCK);
        let block: &[u8; BLOCK] = match padded[base..base + BLOCK].try_into() {
            Ok(b) => b,
            Err(_) => break,
        };
        let m = (k.classify)(block, dialect.delimiter, quote).truncate(valid);
        let escaped = if backslash {
            let bs = (k.classify)(block, b'\\', 0).truncate(valid).seps;
            esc.find_escaped(bs)
        } else {
            0
        };
        let quotes = if quoting { m.quotes & !escaped } else { 0 };
        let (inside, next_carry) = (k.inside_quote)(quotes, carry);
        carry = next_carry;

        let mut row_bits = m.newlines & !inside & !escaped;
        while row_bits != 0 {
            let p = base + row_bits.trailing_zeros() as usize;
            row_bits &= row_bits - 1;
            rows += 1;
            last_term_end = p + 1;
            if p >= goal {
                chunks.push(Chunk {
                    start: chunk_start,
                    end: p + 1,
                    row_count: rows,
                });
                chunk_start = p + 1;
                goal = (chunk_start + target).min(len);
                rows = 0;
            }
        }
        base += BLOCK;
    }

    // Final chunk: whatever remains, including a trailing row without a
    // terminator (well-formed or not).
    if chunk_start < len {
        if last_term_end < len {
            rows += 1;
        }
        chunks.push(Chunk {
            start: chunk_start,
            end: len,
            row_count: rows,
        });
    }
    chunks
}

/// Count physical rows in `buf[start..]`: unquoted LFs plus a trailing
/// unterminated row.
pub fn count_rows(buf: &AlignedBuffer, start: usize, dialect: &Dialect) -> usize {
    let len = buf.len();
    if start >= len {
        return 0;
    }
    let k = kernels();
    let padded = buf.padded();
    let quote = dialect.quote_byte();
    let quoting = dialect.quote.is_some();
    let backslash = dialect.escape == EscapeMode::Backslash;

    let mut rows = 0usize;
    let mut last_term_end = start;
    let mut carry = 0u64;
    let mut esc = EscapeTracker::default();

    let mut base = start;
    while base < len {
        let valid = (len - base).min(BLOCK);
        let block: &[u8; BLOCK] = match padded[base..base + BLOCK].try_into() {
            Ok(b) => b,
            Err(_) => break,
        };
        let m = (k.classify)(block, dialect.delimiter, quote).truncate(valid);
        let escaped = if backslash {
            let bs = (k.classify)(block, b'\\', 0).truncate(valid).seps;
            esc.find_escaped(bs)
        } else {
            0
        };
        let quotes = if quoting { m.quotes & !escaped } else { 0 };
        let (inside, next_carry) = (k.inside_quote)(quotes, carry);
        carry = next_carry;

        let row_bits = m.newlines & !inside & !escaped;
        rows += row_bits.count_ones() as usize;
        if row_bits != 0 {
            last_term_end = base + (63 - row_bits.leading_zeros() as usize) + 1;
        }
        base += BLOCK;
    }
    if last_term_end < len {
        rows += 1;
    }
    rows
}

// Two-pass branchless indexer.
//
// Pass 1 classifies each 64-byte block into structural bitmaps without
// data-dependent branches: quote parity is propagated with the
// carryless-multiply kernel, backslash escapes with the odd-run-length mask
// trick, and quote-placement violations fall out of shifted boundary masks.
// Pass 2 walks the stored `field_ends` words and emits (offset, len) pairs,
// closing rows at unquoted LF, stripping a `\r` before LF, and applying the
// comment and empty-row dialect rules.
//
// A row never crosses a chunk boundary (the chunk finder only cuts one past
// a terminator), so each worker's segment is self-contained. The trailing
// padding of the buffer lets pass 1 load full blocks to the very end.

use crate::buffer::AlignedBuffer;
use crate::dialect::{Dialect, EscapeMode};
use crate::error::{ErrorCollector, ErrorMode, ParseError, ParseErrorKind};
use crate::parser::chunk::Chunk;
use crate::parser::index::{FieldEntry, IndexSegment};
use crate::simd::{kernels, BLOCK};

/// Carries backslash-escape state across 64-byte lanes.
///
/// `find_escaped` returns the positions whose classification is suppressed
/// because an odd-length backslash run precedes them. Branchless; the carry
/// is the escaped state of the next lane's first byte.
#[derive(Default)]
pub struct EscapeTracker {
    prev_escaped: u64,
}

impl EscapeTracker {
    pub fn find_escaped(&mut self, backslash_in: u64) -> u64 {
        const EVEN_BITS: u64 = 0x5555_5555_5555_5555;
        let backslash = backslash_in & !self.prev_escaped;
        let follows_escape = (backslash << 1) | self.prev_escaped;
        let odd_sequence_starts = backslash & !EVEN_BITS & !follows_escape;
        let (sequences_on_even, carry) = odd_sequence_starts.overflowing_add(backslash);
        self.prev_escaped = carry as u64;
        (EVEN_BITS ^ (sequences_on_even << 1)) & follows_escape
    }
}

/// Per-block words stored by pass 1.
struct MaskWords {
    field_ends: Vec<u64>,
    row_ends: Vec<u64>,
    opens: Vec<u64>,
    closes: Vec<u64>,
    boundary: Vec<u64>,
}

#[inline]
fn is_field_ws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Index one chunk into a row-major segment.
///
/// `row_base` is the number of physical data rows before this chunk; it is
/// only used to report absolute coordinates when strict mode trips the
/// collector. All staged diagnostics keep chunk-relative physical rows for
/// the reader to rebase.
pub fn index_chunk(
    buf: &AlignedBuffer,
    chunk: &Chunk,
    dialect: &Dialect,
    collector: &ErrorCollector,
    row_base: u64,
) -> IndexSegment {
    let mut segment = IndexSegment {
        chunk_start: chunk.start as u32,
        ..IndexSegment::default()
    };
    segment.row_offsets.push(0);
    if chunk.start >= chunk.end {
        return segment;
    }

    let Some((words, unterminated)) = classify_pass(buf, chunk, dialect, collector) else {
        // Cancelled by another worker's strict error; the reader discards us.
        return segment;
    };

    let bad_quotes = quote_violations(&words, chunk);
    walk_pass(buf, chunk, dialect, &words, &bad_quotes, unterminated, &mut segment);

    if dialect.error_mode == ErrorMode::Strict {
        if let Some(first) = segment.errors.first() {
            let mut rebased = first.clone();
            rebased.row = row_base + rebased.row + 1;
            collector.push(rebased);
        }
    }
    segment
}

/// Pass 1: per-block structural bitmaps. Returns `None` when cancelled.
fn classify_pass(
    buf: &AlignedBuffer,
    chunk: &Chunk,
    dialect: &Dialect,
    collector: &ErrorCollector,
) -> Option<(MaskWords, bool)> {
    let k = kernels();
    let padded = buf.padded();
    let quote = dialect.quote_byte();
    let quoting = dialect.quote.is_some();
    let backslash = dialect.escape == EscapeMode::Backslash;
    let strict = dialect.error_mode == ErrorMode::Strict;

    let n_blocks = (chunk.end - chunk.start + BLOCK - 1) / BLOCK;
    let mut words = MaskWords {
        field_ends: Vec::with_capacity(n_blocks),
        row_ends: Vec::with_capacity(n_blocks),
        opens: Vec::with_capacity(n_blocks),
        closes: Vec::with_capacity(n_blocks),
        boundary: Vec::with_capacity(n_blocks),
    };

    let mut carry = 0u64;
    let mut esc = EscapeTracker::default();
    for b in 0..n_blocks {
        if strict && collector.is_tripped() {
            return None;
        }
        let base = chunk.start + b * BLOCK;
        let valid = (chunk.end - base).min(BLOCK);
        let block: &[u8; BLOCK] = padded[base..base + BLOCK].try_into().ok()?;
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

        words.field_ends.push((m.seps | m.newlines) & !inside & !escaped);
        words.row_ends.push(m.newlines & !inside & !escaped);
        words.opens.push(quotes & inside);
        words.closes.push(quotes & !inside);
        words.boundary.push(((m.seps | m.newlines | m.crs) & !escaped) | quotes);
    }
    Some((words, carry != 0))
}

/// Positions of quote bytes that violate the open/close-at-field-boundary
/// rule: an opening quote must follow a delimiter, row terminator, quote, or
/// the chunk start; a closing quote must precede one (or the chunk end).
fn quote_violations(words: &MaskWords, chunk: &Chunk) -> Vec<u32> {
    let n = words.boundary.len();
    let mut bad = Vec::new();
    for i in 0..n {
        let prev_carry = if i == 0 { 1 } else { words.boundary[i - 1] >> 63 };
        let prev_ok = (words.boundary[i] << 1) | prev_carry;

        let next_carry = if i + 1 < n {
            (words.boundary[i + 1] & 1) << 63
        } else {
            0
        };
        let mut next_ok = (words.boundary[i] >> 1) | next_carry;
        if i + 1 == n {
            let valid = chunk.end - (chunk.start + i * BLOCK);
            next_ok |= 1u64 << (valid - 1);
        }

        let mut violations = (words.opens[i] & !prev_ok) | (words.closes[i] & !next_ok);
        while violations != 0 {
            let bit = violations.trailing_zeros() as usize;
            violations &= violations - 1;
            bad.push((chunk.start + i * BLOCK + bit) as u32);
        }
    }
    bad
}

/// Pass 2: walk the field-end words, emitting entries and closing rows.
fn walk_pass(
    buf: &AlignedBuffer,
    chunk: &Chunk,
    dialect: &Dialect,
    words: &MaskWords,
    bad_quotes: &[u32],
    unterminated: bool,
    segment: &mut IndexSegment,
) {
    let data = buf.as_slice();
    let est_fields = (chunk.end - chunk.start) / 8 + 4;
    segment.entries.reserve(est_fields);
    segment.row_phys.reserve(chunk.row_count);
    segment.row_offsets.reserve(chunk.row_count + 1);

    let mut field_start = chunk.start;
    let mut phys_row: u32 = 0;
    let mut fields_in_row: usize = 0;
    let mut in_comment = false;
    let mut checked_comment = false;
    let mut bad_cursor = 0usize;

    let mut close_field =
        |segment: &mut IndexSegment, start: usize, len: usize, row: u32, col: usize| {
            // Attribute any quote violations inside the field's raw range.
            while bad_cursor < bad_quotes.len() && (bad_quotes[bad_cursor] as usize) <= start + len
            {
                segment.errors.push(ParseError {
                    row: row as u64,
                    column: Some(col as u32),
                    kind: ParseErrorKind::QuoteInUnquotedField,
                    message: format!("at byte offset {}", bad_quotes[bad_cursor]),
                });
                bad_cursor += 1;
            }
            segment.entries.push(FieldEntry {
                offset: start as u32,
                len: len as u32,
            });
        };

    for (i, &ends_word) in words.field_ends.iter().enumerate() {
        let base = chunk.start + i * BLOCK;
        let mut bits = ends_word;
        while bits != 0 {
            let bit = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            let p = base + bit;
            let is_row_end = (words.row_ends[i] >> bit) & 1 == 1;

            // Comment detection once per row, at its first structural byte.
            if !checked_comment {
                checked_comment = true;
                if let Some(comment) = dialect.comment {
                    let mut q = field_start;
                    while q < chunk.end && is_field_ws(data[q]) {
                        q += 1;
                    }
                    if q < chunk.end && data[q] == comment {
                        in_comment = true;
                    }
                }
            }

            if in_comment {
                field_start = p + 1;
                if is_row_end {
                    in_comment = false;
                    checked_comment = false;
                    phys_row += 1;
                    fields_in_row = 0;
                }
                continue;
            }

            let mut flen = p - field_start;
            if is_row_end && flen > 0 && data[p - 1] == b'\r' {
                flen -= 1;
            }
            close_field(segment, field_start, flen, phys_row, fields_in_row);
            fields_in_row += 1;
            field_start = p + 1;

            if is_row_end {
                if fields_in_row == 1 && flen == 0 && dialect.skip_empty_rows {
                    segment.entries.pop();
                } else {
                    segment.row_offsets.push(segment.entries.len() as u32);
                    segment.row_phys.push(phys_row);
                }
                phys_row += 1;
                fields_in_row = 0;
                checked_comment = false;
            }
        }
    }

    // Trailing row without a terminator: only the final chunk can have one.
    if !in_comment && (fields_in_row > 0 || field_start < chunk.end) {
        // The comment rule applies to an unchecked trailing row too.
        let mut skip = false;
        if !checked_comment {
            if let Some(comment) = dialect.comment {
                let mut q = field_start;
                while q < chunk.end && is_field_ws(data[q]) {
                    q += 1;
                }
                skip = q < chunk.end && data[q] == comment;
            }
        }
        if !skip {
            let flen = chunk.end - field_start;
            close_field(segment, field_start, flen, phys_row, fields_in_row);
            fields_in_row += 1;
            if fields_in_row == 1 && flen == 0 && dialect.skip_empty_rows {
                segment.entries.pop();
            } else {
                segment.row_offsets.push(segment.entries.len() as u32);
                segment.row_phys.push(phys_row);
            }
        }
        if unterminated {
            segment.errors.push(ParseError {
                row: phys_row as u64,
                column: None,
                kind: ParseErrorKind::UnterminatedQuote,
                message: "quote still open at end of input".to_string(),
            });
        }
        phys_row += 1;
    }

    // Violations past the last field (e.g. inside a skipped comment tail).
    while bad_cursor < bad_quotes.len() {
        segment.errors.push(ParseError {
            row: phys_row.saturating_sub(1) as u64,
            column: None,
            kind: ParseErrorKind::QuoteInUnquotedField,
            message: format!("at byte offset {}", bad_quotes[bad_cursor]),
        });
        bad_cursor += 1;
    }

    segment.physical_rows = phys_row;
}

// Scalar line parser.
//
// Covers the work that does not go through the SIMD indexer: header
// parsing, the type-inference prefix sample, and sub-threshold inputs.
// Field semantics (trim, unescape, null matching) are shared with the
// indexed path through `field::extract`, so both paths agree byte for byte.

use memchr::{memchr, memchr2};

use crate::dialect::{Dialect, EscapeMode};
use crate::parser::field;

pub struct LineParser<'d> {
    dialect: &'d Dialect,
}

impl<'d> LineParser<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        LineParser { dialect }
    }

    /// Raw field spans of the record starting at `start`, and the position
    /// one past its terminator. A `\r` immediately before the LF is excluded
    /// from the last span; a bare `\r` is data.
    pub fn row_bounds(&self, data: &[u8], start: usize) -> (Vec<(usize, usize)>, usize) {
        let quote = self.dialect.quote;
        let backslash = self.dialect.escape == EscapeMode::Backslash;
        let mut bounds = Vec::new();
        let mut pos = start;
        let mut field_start = start;
        let mut in_quotes = false;

        while pos < data.len() {
            let b = data[pos];
            if in_quotes {
                if backslash && b == b'\\' {
                    pos += 2;
                    continue;
                }
                if Some(b) == quote {
                    if self.dialect.escape == EscapeMode::DoubleQuote
                        && pos + 1 < data.len()
                        && data[pos + 1] == b
                    {
                        pos += 2;
                        continue;
                    }
                    in_quotes = false;
                }
                pos += 1;
            } else if quote == Some(b) {
                in_quotes = true;
                pos += 1;
            } else if backslash && b == b'\\' {
                pos += 2;
            } else if b == self.dialect.delimiter {
                bounds.push((field_start, pos));
                pos += 1;
                field_start = pos;
            } else if b == b'\n' {
                let mut end = pos;
                if end > field_start && data[end - 1] == b'\r' {
                    end -= 1;
                }
                bounds.push((field_start, end));
                return (bounds, pos + 1);
            } else {
                pos += 1;
            }
        }

        // End of input without a terminator.
        if field_start < data.len() || !bounds.is_empty() {
            bounds.push((field_start, data.len()));
        }
        (bounds, data.len())
    }

    /// One record as trimmed, unescaped field values.
    pub fn parse_record(&self, data: &[u8], start: usize) -> (Vec<Vec<u8>>, usize) {
        let (bounds, next) = self.row_bounds(data, start);
        let fields = bounds
            .into_iter()
            .map(|(s, e)| field::extract(data, s, e - s, self.dialect).into_owned())
            .collect();
        (fields, next)
    }

    /// Position one past the LF terminating the row at `start`, or the end
    /// of input. Quote-aware; uses memchr to hop between structural bytes.
    pub fn find_row_end(&self, data: &[u8], start: usize) -> usize {
        let mut pos = start;
        let mut in_quotes = false;
        let backslash = self.dialect.escape == EscapeMode::Backslash;

        while pos < data.len() {
            if in_quotes {
                let quote = match self.dialect.quote {
                    Some(q) => q,
                    None => return data.len(),
                };
                match memchr(quote, &data[pos..]) {
                    None => return data.len(),
                    Some(rel) => {
                        let q = pos + rel;
                        if backslash && is_backslash_escaped(data, q) {
                            pos = q + 1;
                        } else if self.dialect.escape == EscapeMode::DoubleQuote
                            && q + 1 < data.len()
                            && data[q + 1] == quote
                        {
                            pos = q + 2;
                        } else {
                            in_quotes = false;
                            pos = q + 1;
                        }
                    }
                }
            } else {
                let hit = match self.dialect.quote {
                    Some(q) => memchr2(q, b'\n', &data[pos..]),
                    None => memchr(b'\n', &data[pos..]),
                };
                match hit {
                    None => return data.len(),
                    Some(rel) => {
                        let p = pos + rel;
                        if data[p] == b'\n' {
                            return p + 1;
                        }
                        if backslash && is_backslash_escaped(data, p) {
                            pos = p + 1;
                        } else {
                            in_quotes = true;
                            pos = p + 1;
                        }
                    }
                }
            }
        }
        data.len()
    }

    /// True when the row starting at `pos` is a comment row.
    pub fn is_comment_row(&self, data: &[u8], pos: usize) -> bool {
        let comment = match self.dialect.comment {
            Some(c) => c,
            None => return false,
        };
        let mut q = pos;
        while q < data.len() && (data[q] == b' ' || data[q] == b'\t') {
            q += 1;
        }
        q < data.len() && data[q] == comment
    }

    /// Parse the header row: skip comment rows (and empty rows when the
    /// dialect suppresses them), then return the trimmed, unescaped names
    /// and the offset where data rows begin.
    pub fn parse_header(&self, data: &[u8]) -> (Vec<String>, usize) {
        let mut pos = 0;
        while pos < data.len() {
            if self.is_comment_row(data, pos) {
                pos = self.find_row_end(data, pos);
                continue;
            }
            let (fields, next) = self.parse_record(data, pos);
            let empty = fields.len() == 1 && fields[0].is_empty();
            if empty && self.dialect.skip_empty_rows {
                pos = next;
                continue;
            }
            let names = fields
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            return (names, next);
        }
        (Vec::new(), data.len())
    }

    /// Field count of the first data record, without consuming anything.
    /// Used to size the schema for header-less input.
    pub fn peek_width(&self, data: &[u8], start: usize) -> usize {
        let mut pos = start;
        while pos < data.len() {
            if self.is_comment_row(data, pos) {
                pos = self.find_row_end(data, pos);
                continue;
            }
            let (bounds, next) = self.row_bounds(data, pos);
            let empty = bounds.len() == 1 && bounds[0].0 == bounds[0].1;
            if empty && self.dialect.skip_empty_rows {
                pos = next;
                continue;
            }
            return bounds.len();
        }
        0
    }
}

/// Whether the byte at `pos` is preceded by an odd-length backslash run.
fn is_backslash_escaped(data: &[u8], pos: usize) -> bool {
    let mut run = 0;
    while run < pos && data[pos - 1 - run] == b'\\' {
        run += 1;
    }
    run % 2 == 1
}

// Field extraction: whitespace handling, quote stripping, unescaping.
//
// The index stores raw on-wire ranges (quotes and escapes included); this is
// where a range becomes the field's logical value. Returns Cow::Borrowed
// whenever no unescaping is needed.

use std::borrow::Cow;

use crate::dialect::{Dialect, EscapeMode};

#[inline]
fn is_field_ws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Trim leading and trailing spaces/tabs.
#[inline]
pub fn trim(mut field: &[u8]) -> &[u8] {
    while let Some((&first, rest)) = field.split_first() {
        if is_field_ws(first) {
            field = rest;
        } else {
            break;
        }
    }
    while let Some((&last, rest)) = field.split_last() {
        if is_field_ws(last) {
            field = rest;
        } else {
            break;
        }
    }
    field
}

/// Unescape doubled quote bytes in a quoted field's inner content: `""` → `"`.
pub fn unescape_doubled(inner: &[u8], quote: u8) -> Vec<u8> {
    let mut result = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == quote && i + 1 < inner.len() && inner[i + 1] == quote {
            result.push(quote);
            i += 2;
        } else {
            result.push(inner[i]);
            i += 1;
        }
    }
    result
}

/// Unescape backslash sequences: `\x` → `x` for any byte x.
pub fn unescape_backslash(inner: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] == b'\\' && i + 1 < inner.len() {
            result.push(inner[i + 1]);
            i += 2;
        } else {
            result.push(inner[i]);
            i += 1;
        }
    }
    result
}

/// Extract a field's logical value from its raw on-wire range.
///
/// Rules, matching the scalar line parser: surrounding whitespace outside
/// the quotes is trimmed; a field wrapped in quote bytes is stripped and
/// unescaped per the dialect's escape mode; whitespace inside quotes is
/// preserved.
pub fn extract<'a>(input: &'a [u8], offset: usize, len: usize, dialect: &Dialect) -> Cow<'a, [u8]> {
    let end = (offset + len).min(input.len());
    if offset >= end {
        return Cow::Borrowed(&[]);
    }
    let field = trim(&input[offset..end]);

    let quote = match dialect.quote {
        Some(q) => q,
        None => return Cow::Borrowed(field),
    };

    // Not quoted.
    if field.len() < 2 || field[0] != quote || field[field.len() - 1] != quote {
        return Cow::Borrowed(field);
    }

    let inner = &field[1..field.len() - 1];
    match dialect.escape {
        EscapeMode::DoubleQuote => {
            if inner.contains(&quote) {
                Cow::Owned(unescape_doubled(inner, quote))
            } else {
                Cow::Borrowed(inner)
            }
        }
        EscapeMode::Backslash => {
            if inner.contains(&b'\\') {
                Cow::Owned(unescape_backslash(inner))
            } else {
                Cow::Borrowed(inner)
            }
        }
    }
}

// Parse configuration.
//
// A Dialect describes one CSV variant: delimiter, quoting, escape policy,
// comment prefix, null/bool vocabularies, and the parse-level knobs (threads,
// error mode, chunk target). Immutable once a parse begins.

use crate::error::ErrorMode;

/// How a literal quote byte is represented inside a quoted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    /// RFC 4180: a doubled quote byte (`""`) is one literal quote.
    DoubleQuote,
    /// A backslash suppresses the classification of the next byte.
    Backslash,
}

/// Default target chunk size handed to the chunk finder (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Default number of rows sampled for type inference.
pub const DEFAULT_INFER_ROWS: usize = 1000;

#[derive(Debug, Clone)]
pub struct Dialect {
    /// Byte separating fields.
    pub delimiter: u8,
    /// Field-wrapping byte; `None` disables quoting entirely.
    pub quote: Option<u8>,
    pub escape: EscapeMode,
    /// Row-prefix byte that skips the row.
    pub comment: Option<u8>,
    /// First non-comment row holds column names.
    pub has_header: bool,
    /// Suppress zero-field, zero-length rows.
    pub skip_empty_rows: bool,
    /// Values that parse to null. An empty string means empty-field-is-null.
    pub null_values: Vec<String>,
    pub true_values: Vec<String>,
    pub false_values: Vec<String>,
    /// Worker count for the parallel phase; 0 is treated as 1.
    pub num_threads: usize,
    pub error_mode: ErrorMode,
    /// Check string columns for valid UTF-8 during materialization.
    pub validate_utf8: bool,
    /// Target byte size per parallel chunk.
    pub target_chunk_size: usize,
    /// Rows sampled for type inference.
    pub infer_rows: usize,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            delimiter: b',',
            quote: Some(b'"'),
            escape: EscapeMode::DoubleQuote,
            comment: None,
            has_header: true,
            skip_empty_rows: true,
            null_values: vec![String::new(), "NA".to_string()],
            true_values: vec!["TRUE".to_string(), "true".to_string(), "T".to_string()],
            false_values: vec!["FALSE".to_string(), "false".to_string(), "F".to_string()],
            num_threads: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
            error_mode: ErrorMode::Strict,
            validate_utf8: false,
            target_chunk_size: DEFAULT_CHUNK_SIZE,
            infer_rows: DEFAULT_INFER_ROWS,
        }
    }
}

impl Dialect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: Option<u8>) -> Self {
        self.quote = quote;
        self
    }

    pub fn escape(mut self, escape: EscapeMode) -> Self {
        self.escape = escape;
        self
    }

    pub fn comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn skip_empty_rows(mut self, skip: bool) -> Self {
        self.skip_empty_rows = skip;
        self
    }

    pub fn null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn true_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.true_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn false_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.false_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    pub fn validate_utf8(mut self, validate: bool) -> Self {
        self.validate_utf8 = validate;
        self
    }

    pub fn target_chunk_size(mut self, size: usize) -> Self {
        self.target_chunk_size = size.max(64);
        self
    }

    pub fn infer_rows(mut self, rows: usize) -> Self {
        self.infer_rows = rows.max(1);
        self
    }

    /// Quote byte for mask building; 0 never matches real input when quoting
    /// is disabled because the classifier is fed a byte that cannot occur in
    /// the mask (padding is zero but padding bits are masked off).
    #[inline]
    pub(crate) fn quote_byte(&self) -> u8 {
        self.quote.unwrap_or(0)
    }

    /// Worker count with the 0-means-1 rule applied.
    #[inline]
    pub fn effective_threads(&self) -> usize {
        self.num_threads.max(1)
    }

    /// True when the empty string is configured as a null value.
    pub(crate) fn empty_is_null(&self) -> bool {
        self.null_values.iter().any(|v| v.is_empty())
    }

    /// Length of the longest configured null value, for the fast prefilter.
    pub(crate) fn max_null_len(&self) -> usize {
        self.null_values.iter().map(|v| v.len()).max().unwrap_or(0)
    }

    pub(crate) fn is_null_value(&self, value: &[u8]) -> bool {
        if value.is_empty() {
            return self.empty_is_null();
        }
        if value.len() > self.max_null_len() {
            return false;
        }
        self.null_values.iter().any(|v| v.as_bytes() == value)
    }

    pub(crate) fn is_true_value(&self, value: &[u8]) -> bool {
        self.true_values.iter().any(|v| v.as_bytes() == value)
    }

    pub(crate) fn is_false_value(&self, value: &[u8]) -> bool {
        self.false_values.iter().any(|v| v.as_bytes() == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let d = Dialect::default();
        assert_eq!(d.delimiter, b',');
        assert_eq!(d.quote, Some(b'"'));
        assert!(d.has_header);
        assert!(d.skip_empty_rows);
        assert!(d.empty_is_null());
        assert_eq!(d.max_null_len(), 2);
    }

    #[test]
    fn test_builder_chain() {
        let d = Dialect::new()
            .delimiter(b';')
            .quote(Some(b'\''))
            .comment(Some(b'#'))
            .has_header(false)
            .num_threads(0);
        assert_eq!(d.delimiter, b';');
        assert_eq!(d.quote, Some(b'\''));
        assert_eq!(d.comment, Some(b'#'));
        assert!(!d.has_header);
        assert_eq!(d.effective_threads(), 1, "0 threads is treated as 1");
    }

    #[test]
    fn test_null_matching() {
        let d = Dialect::default();
        assert!(d.is_null_value(b""));
        assert!(d.is_null_value(b"NA"));
        assert!(!d.is_null_value(b"N"));
        assert!(!d.is_null_value(b"NAN"), "length prefilter rejects longer values");

        let d = Dialect::new().null_values(["null", "NULL"]);
        assert!(!d.is_null_value(b""), "empty only null when configured");
        assert!(d.is_null_value(b"null"));
    }

    #[test]
    fn test_bool_matching() {
        let d = Dialect::default();
        assert!(d.is_true_value(b"TRUE"));
        assert!(d.is_true_value(b"T"));
        assert!(d.is_false_value(b"false"));
        assert!(!d.is_true_value(b"yes"));
    }
}

// Error types and the bounded diagnostic collector.
//
// Every public operation returns Result; panics are reserved for internal
// invariant violations, which abort via `invariant_violation`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use crate::schema::DataType;

/// How the parser reacts to malformed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorMode {
    /// First diagnostic aborts the parse.
    Strict,
    /// Diagnostics accumulate; offending rows are best-effort parsed.
    Permissive,
}

/// What the collector does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Discard the oldest diagnostic to make room.
    DropOldest,
    /// Keep the stored diagnostics, only count the overflow.
    CountOnly,
}

/// A parse-level diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnterminatedQuote,
    QuoteInUnquotedField,
    FieldCountMismatch,
    ParseFailure(DataType),
    InvalidUtf8,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorKind::UnterminatedQuote => write!(f, "unterminated quote"),
            ParseErrorKind::QuoteInUnquotedField => write!(f, "quote in unquoted field"),
            ParseErrorKind::FieldCountMismatch => write!(f, "field count mismatch"),
            ParseErrorKind::ParseFailure(t) => write!(f, "failed to parse as {t}"),
            ParseErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8"),
        }
    }
}

/// A diagnostic tied to a position in the input.
///
/// `row` is the 1-based data-row ordinal (the header does not count);
/// `column` is the 0-based column index when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub row: u64,
    pub column: Option<u32>,
    pub kind: ParseErrorKind,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}", self.row)?;
        if let Some(col) = self.column {
            write!(f, ", column {col}")?;
        }
        write!(f, ": {}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

/// Top-level error for all public operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("aligned allocation of {size} bytes failed")]
    Alloc { size: usize },

    #[error("input of {size} bytes exceeds the {limit}-byte index limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("{0}")]
    Parse(ParseError),

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Abort the process on a broken internal invariant.
///
/// Never used for malformed input; only for states that indicate a bug in
/// this crate.
#[cold]
pub(crate) fn invariant_violation(msg: &str) -> ! {
    log::error!("internal invariant violation: {msg}");
    eprintln!("columncsv: internal invariant violation: {msg}");
    std::process::abort();
}

// ===========================================================================
// ErrorCollector
// ===========================================================================

struct CollectorInner {
    errors: VecDeque<ParseError>,
    dropped: u64,
}

/// Bounded, thread-safe diagnostic buffer shared by parser workers.
///
/// In `Strict` mode the first push trips an abort flag that workers poll at
/// SIMD lane boundaries. In `Permissive` mode diagnostics accumulate up to
/// `capacity`, then overflow per the configured policy. Workers stage errors
/// locally and flush once on exit, so the lock is rarely contended.
pub struct ErrorCollector {
    mode: ErrorMode,
    capacity: usize,
    policy: OverflowPolicy,
    tripped: AtomicBool,
    inner: Mutex<CollectorInner>,
}

/// Default diagnostic capacity.
pub const DEFAULT_ERROR_CAPACITY: usize = 1024;

impl ErrorCollector {
    pub fn new(mode: ErrorMode, capacity: usize, policy: OverflowPolicy) -> Self {
        ErrorCollector {
            mode,
            capacity: capacity.max(1),
            policy,
            tripped: AtomicBool::new(false),
            inner: Mutex::new(CollectorInner {
                errors: VecDeque::new(),
                dropped: 0,
            }),
        }
    }

    pub fn with_mode(mode: ErrorMode) -> Self {
        Self::new(mode, DEFAULT_ERROR_CAPACITY, OverflowPolicy::DropOldest)
    }

    pub fn mode(&self) -> ErrorMode {
        self.mode
    }

    /// Record a diagnostic. Returns `false` when the caller should abort
    /// (strict mode).
    pub fn push(&self, error: ParseError) -> bool {
        if self.mode == ErrorMode::Strict {
            // Only the first error is kept; everything after the trip is noise
            // from workers that have not yet observed the flag.
            if self
                .tripped
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.inner.lock().errors.push_back(error);
            }
            return false;
        }

        let mut inner = self.inner.lock();
        if inner.errors.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    inner.errors.pop_front();
                    inner.dropped += 1;
                    inner.errors.push_back(error);
                }
                OverflowPolicy::CountOnly => {
                    inner.dropped += 1;
                }
            }
        } else {
            inner.errors.push_back(error);
        }
        true
    }

    /// Flush a worker's staging buffer. Returns `false` if the parse should
    /// abort.
    pub fn extend(&self, errors: Vec<ParseError>) -> bool {
        let mut ok = true;
        for e in errors {
            ok = self.push(e);
            if !ok {
                break;
            }
        }
        ok
    }

    /// True once a strict-mode error has been recorded. Workers poll this at
    /// every 64-byte block boundary.
    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Relaxed)
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.lock().errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of diagnostics lost to overflow.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    pub fn first(&self) -> Option<ParseError> {
        self.inner.lock().errors.front().cloned()
    }

    pub fn errors(&self) -> Vec<ParseError> {
        self.inner.lock().errors.iter().cloned().collect()
    }

    /// Reset between parse calls. The collector itself outlives the parse.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.errors.clear();
        inner.dropped = 0;
        self.tripped.store(false, Ordering::Release);
    }
}

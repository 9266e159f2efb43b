// columncsv - Columnar CSV ingestion engine
//
// No unwrap/expect in production code. Fallible paths return Result.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//
// Pipeline, front to back:
//   buffer   padded, 64-byte-aligned input bytes
//   simd     runtime-dispatched mask kernels (classify, quote parity, minmax)
//   parser   chunk splitting, two-pass branchless indexing, scalar fallback
//   infer    per-column type widening over a prefix sample
//   column   typed nullable builders and the string pool
//   reader   the CsvReader facade driving the stages above
//   writer   columnar encodings, statistics, row groups
//   error    bounded diagnostic collector with strict/permissive modes

pub mod buffer;
pub mod column;
pub mod dialect;
pub mod error;
pub mod infer;
pub mod parser;
pub mod reader;
pub mod schema;
pub mod simd;
pub mod table;
pub mod writer;

pub use buffer::AlignedBuffer;
pub use column::{Column, ColumnData};
pub use dialect::{Dialect, EscapeMode};
pub use error::{
    Error, ErrorCollector, ErrorMode, OverflowPolicy, ParseError, ParseErrorKind, Result,
};
pub use reader::CsvReader;
pub use schema::{DataType, Field, Schema};
pub use table::Table;
pub use writer::{ColumnStatistics, ColumnarWriter, Compression, WriterOptions};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Parsing pipeline: chunk splitting, two-pass indexing, field extraction,
// and the scalar fallback.

pub mod chunk;
pub mod field;
pub mod index;
pub mod indexer;
pub mod line;

pub use chunk::{count_rows, find_chunks, Chunk};
pub use field::extract;
pub use index::{transpose_blocked, FieldEntry, FieldIndex, IndexSegment};
pub use indexer::index_chunk;
pub use line::LineParser;

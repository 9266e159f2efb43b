// Columnar on-disk encodings and the row-group driver.
//
// Byte-level encodings (varint, zigzag, RLE/bit-packed hybrid, delta binary
// packed, delta-length byte array, dictionary) are bit-exact against the
// target columnar format; the page/footer framing above them is delegated
// to the host format layer. Decoders ship alongside every encoder.

pub mod delta;
pub mod delta_length;
pub mod dictionary;
pub mod rle;
pub mod row_group;
pub mod stats;
pub mod varint;

pub use dictionary::DictionaryEncoder;
pub use rle::HybridRleEncoder;
pub use row_group::{
    ColumnChunk, ColumnarWriter, Compression, DataPage, Encoding, RowGroup, RowGroupMeta,
    WriterOptions,
};
pub use stats::{ColumnStatistics, StatValue};

// Column chunk and row group assembly.
//
// A column chunk is the dictionary page (when dictionary encoding won)
// followed by one data page: the 4-byte-prefixed definition levels, then
// the non-null values in the chunk's encoding. The driver slices the table
// into row groups by a row-count policy, and `serialize` concatenates the
// pages while recording per-column offsets and sizes. The page-header
// framing written here is a thin placeholder; a host format layer owns the
// real thrift headers and footer.

use rayon::prelude::*;

use crate::column::{Column, ColumnData};
use crate::error::{Error, Result};
use crate::schema::DataType;
use crate::table::Table;
use crate::writer::delta::{encode_delta_i32, encode_delta_i64};
use crate::writer::delta_length::encode_delta_length;
use crate::writer::dictionary::{DictionaryEncoder, DEFAULT_DICTIONARY_MAX};
use crate::writer::rle::{encode_def_levels, encode_hybrid_rle};
use crate::writer::stats::{column_statistics, ColumnStatistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    Rle,
    RleDictionary,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz4,
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Rows per row group.
    pub row_group_rows: usize,
    pub compression: Compression,
    /// Attempt dictionary encoding before the per-type fallback.
    pub dictionary: bool,
    /// Distinct-value ceiling before the dictionary attempt is abandoned.
    pub dictionary_max: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            row_group_rows: 64 * 1024,
            compression: Compression::None,
            dictionary: true,
            dictionary_max: DEFAULT_DICTIONARY_MAX,
        }
    }
}

/// One encoded data page.
#[derive(Debug, Clone)]
pub struct DataPage {
    pub num_values: u32,
    pub encoding: Encoding,
    pub uncompressed_size: u32,
    /// Page payload: definition levels then values; possibly compressed.
    pub bytes: Vec<u8>,
    pub stats: ColumnStatistics,
}

/// One column's contribution to a row group.
#[derive(Debug, Clone)]
pub struct ColumnChunk {
    pub dtype: DataType,
    pub dict_page: Option<Vec<u8>>,
    pub dict_uncompressed_size: u32,
    pub dict_num_values: u32,
    pub page: DataPage,
    pub stats: ColumnStatistics,
}

impl ColumnChunk {
    pub fn total_byte_size(&self) -> u64 {
        self.dict_page.as_ref().map(|p| p.len() as u64).unwrap_or(0) + self.page.bytes.len() as u64
    }
}

#[derive(Debug, Clone)]
pub struct RowGroup {
    pub num_rows: u64,
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: u64,
}

/// Offsets recorded while serializing, in the shape the footer layer wants.
#[derive(Debug, Clone, Default)]
pub struct RowGroupMeta {
    pub num_rows: u64,
    pub column_offsets: Vec<u64>,
    pub column_sizes: Vec<u64>,
    pub total_byte_size: u64,
}

pub struct ColumnarWriter {
    options: WriterOptions,
}

impl Default for ColumnarWriter {
    fn default() -> Self {
        Self::new(WriterOptions::default())
    }
}

impl ColumnarWriter {
    pub fn new(options: WriterOptions) -> Self {
        ColumnarWriter { options }
    }

    /// Encode a table into row groups per the configured row policy.
    pub fn write_table(&self, table: &Table) -> Result<Vec<RowGroup>> {
        let num_rows = table.num_rows();
        let group_rows = self.options.row_group_rows.max(1);
        let mut groups = Vec::with_capacity(num_rows / group_rows + 1);
        let mut start = 0;
        while start < num_rows || (num_rows == 0 && start == 0 && !table.columns().is_empty()) {
            let end = (start + group_rows).min(num_rows);
            let columns: Vec<ColumnChunk> = table
                .columns()
                .par_iter()
                .map(|col| self.encode_column(col, start..end))
                .collect::<Result<Vec<_>>>()?;
            let total_byte_size = columns.iter().map(|c| c.total_byte_size()).sum();
            groups.push(RowGroup {
                num_rows: (end - start) as u64,
                columns,
                total_byte_size,
            });
            if end == num_rows {
                break;
            }
            start = end;
        }
        log::debug!(
            "encoded {} row groups from {} rows",
            groups.len(),
            num_rows
        );
        Ok(groups)
    }

    /// Encode one column over a row range into a chunk.
    pub fn encode_column(&self, column: &Column, rows: std::ops::Range<usize>) -> Result<ColumnChunk> {
        let stats = column_statistics(column, rows.clone());
        let num_values = rows.len() as u32;
        let null_count = column.nulls()[rows.clone()]
            .iter()
            .filter(|&&n| n)
            .count();

        let mut payload = Vec::new();
        encode_def_levels(&column.nulls()[rows.clone()], 1, null_count, &mut payload);

        let (encoding, dict) = self.encode_values(column, rows, &mut payload);

        let (dict_page, dict_uncompressed_size, dict_num_values) = match dict {
            Some(enc) => {
                let page = enc.dict_page();
                let uncompressed = page.len() as u32;
                (Some(self.compress(page)?), uncompressed, enc.num_entries() as u32)
            }
            None => (None, 0, 0),
        };

        let uncompressed_size = payload.len() as u32;
        let bytes = self.compress(payload)?;
        Ok(ColumnChunk {
            dtype: column.dtype(),
            dict_page,
            dict_uncompressed_size,
            dict_num_values,
            page: DataPage {
                num_values,
                encoding,
                uncompressed_size,
                bytes,
                stats: stats.clone(),
            },
            stats,
        })
    }

    /// Append the non-null values in the best encoding for the column;
    /// returns the encoding used and the dictionary when it won.
    fn encode_values(
        &self,
        column: &Column,
        rows: std::ops::Range<usize>,
        payload: &mut Vec<u8>,
    ) -> (Encoding, Option<DictionaryEncoder>) {
        let nulls = column.nulls();
        match column.data() {
            ColumnData::Bool(v) => {
                let bits: Vec<u32> = rows
                    .filter(|&r| !nulls[r])
                    .map(|r| v[r] as u32)
                    .collect();
                encode_hybrid_rle(&bits, 1, payload);
                (Encoding::Rle, None)
            }
            ColumnData::Int32(v) | ColumnData::Date(v) => {
                let values: Vec<i32> = rows.filter(|&r| !nulls[r]).map(|r| v[r]).collect();
                if let Some(dict) = self.try_dictionary(values.iter().map(|x| x.to_le_bytes().to_vec())) {
                    dict.encode_indices(payload);
                    return (Encoding::RleDictionary, Some(dict));
                }
                encode_delta_i32(&values, payload);
                (Encoding::DeltaBinaryPacked, None)
            }
            ColumnData::Int64(v) | ColumnData::Timestamp(v) => {
                let values: Vec<i64> = rows.filter(|&r| !nulls[r]).map(|r| v[r]).collect();
                if let Some(dict) = self.try_dictionary(values.iter().map(|x| x.to_le_bytes().to_vec())) {
                    dict.encode_indices(payload);
                    return (Encoding::RleDictionary, Some(dict));
                }
                encode_delta_i64(&values, payload);
                (Encoding::DeltaBinaryPacked, None)
            }
            ColumnData::Float64(v) => {
                let values: Vec<f64> = rows.filter(|&r| !nulls[r]).map(|r| v[r]).collect();
                if let Some(dict) =
                    self.try_dictionary(values.iter().map(|x| x.to_le_bytes().to_vec()))
                {
                    dict.encode_indices(payload);
                    return (Encoding::RleDictionary, Some(dict));
                }
                for value in &values {
                    payload.extend_from_slice(&value.to_le_bytes());
                }
                (Encoding::Plain, None)
            }
            ColumnData::String(s) => {
                let values: Vec<&[u8]> =
                    rows.filter(|&r| !nulls[r]).map(|r| s.get(r)).collect();
                if let Some(dict) = self.try_dictionary(values.iter().map(|v| {
                    let mut plain = Vec::with_capacity(v.len() + 4);
                    plain.extend_from_slice(&(v.len() as u32).to_le_bytes());
                    plain.extend_from_slice(v);
                    plain
                })) {
                    dict.encode_indices(payload);
                    return (Encoding::RleDictionary, Some(dict));
                }
                encode_delta_length(values.iter().copied(), payload);
                (Encoding::DeltaLengthByteArray, None)
            }
            ColumnData::Na => (Encoding::Plain, None),
        }
    }

    fn try_dictionary<I>(&self, plain_values: I) -> Option<DictionaryEncoder>
    where
        I: Iterator<Item = Vec<u8>>,
    {
        if !self.options.dictionary {
            return None;
        }
        let mut dict = DictionaryEncoder::new(self.options.dictionary_max);
        for value in plain_values {
            if !dict.put(&value) {
                return None;
            }
        }
        Some(dict)
    }

    fn compress(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        match self.options.compression {
            Compression::None => Ok(payload),
            Compression::Lz4 => {
                lz4::block::compress(&payload, None, false).map_err(Error::Io)
            }
        }
    }

    /// Concatenate row groups into `out`, page headers included, recording
    /// per-column offsets and sizes for the footer layer.
    pub fn serialize<W: std::io::Write>(
        &self,
        row_groups: &[RowGroup],
        out: &mut W,
    ) -> Result<Vec<RowGroupMeta>> {
        const PAGE_DICT: u8 = 0;
        const PAGE_DATA: u8 = 1;

        let mut metas = Vec::with_capacity(row_groups.len());
        let mut offset = 0u64;
        for group in row_groups {
            let mut meta = RowGroupMeta {
                num_rows: group.num_rows,
                ..RowGroupMeta::default()
            };
            for chunk in &group.columns {
                meta.column_offsets.push(offset);
                let mut written = 0u64;
                if let Some(dict) = &chunk.dict_page {
                    written += write_page_header(
                        out,
                        PAGE_DICT,
                        encoding_code(Encoding::Plain),
                        chunk.dict_num_values,
                        chunk.dict_uncompressed_size,
                        dict.len() as u32,
                    )?;
                    out.write_all(dict)?;
                    written += dict.len() as u64;
                }
                written += write_page_header(
                    out,
                    PAGE_DATA,
                    encoding_code(chunk.page.encoding),
                    chunk.page.num_values,
                    chunk.page.uncompressed_size,
                    chunk.page.bytes.len() as u32,
                )?;
                out.write_all(&chunk.page.bytes)?;
                written += chunk.page.bytes.len() as u64;

                meta.column_sizes.push(written);
                meta.total_byte_size += written;
                offset += written;
            }
            metas.push(meta);
        }
        Ok(metas)
    }
}

fn encoding_code(encoding: Encoding) -> u8 {
    match encoding {
        Encoding::Plain => 0,
        Encoding::Rle => 3,
        Encoding::RleDictionary => 8,
        Encoding::DeltaBinaryPacked => 5,
        Encoding::DeltaLengthByteArray => 6,
    }
}

fn write_page_header<W: std::io::Write>(
    out: &mut W,
    page_type: u8,
    encoding: u8,
    num_values: u32,
    uncompressed: u32,
    compressed: u32,
) -> Result<u64> {
    out.write_all(&[page_type, encoding])?;
    out.write_all(&num_values.to_le_bytes())?;
    out.write_all(&uncompressed.to_le_bytes())?;
    out.write_all(&compressed.to_le_bytes())?;
    Ok(2 + 12)
}

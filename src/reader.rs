// CsvReader façade.
//
// Drives the whole pipeline: load → header + inference prefix → chunk find
// (main thread) → per-chunk indexing on a rayon pool, one private segment
// per worker → stable merge in chunk order with row-width normalization →
// blocked transpose to column-major → per-column materialization (one task
// per column, so dictionaries and pools build deterministically).
//
// Row order is independent of worker count: chunks are disjoint, collected
// in order, and every later stage is a per-row or per-column map.

use rayon::prelude::*;

use crate::buffer::{AlignedBuffer, SIMD_ALIGN};
use crate::column::{Column, ColumnBuilder};
use crate::dialect::Dialect;
use crate::error::{
    Error, ErrorCollector, ErrorMode, OverflowPolicy, ParseError, ParseErrorKind, Result,
    DEFAULT_ERROR_CAPACITY,
};
use crate::infer::infer_types;
use crate::parser::{
    count_rows, extract, find_chunks, index_chunk, FieldEntry, FieldIndex, IndexSegment,
    LineParser,
};
use crate::schema::{DataType, Schema};
use crate::table::Table;

pub struct CsvReader {
    buf: AlignedBuffer,
    dialect: Dialect,
    collector: ErrorCollector,
    schema: Option<Schema>,
    data_start: usize,
    parsed_rows: Option<usize>,
}

impl CsvReader {
    /// Read a file into an aligned buffer and initialize the reader.
    pub fn open<P: AsRef<std::path::Path>>(path: P, dialect: Dialect) -> Result<Self> {
        let buf = AlignedBuffer::load_file(path, SIMD_ALIGN)?;
        Self::from_buffer(buf, dialect)
    }

    /// Drain stdin and initialize the reader.
    pub fn open_stdin(dialect: Dialect) -> Result<Self> {
        let buf = AlignedBuffer::load_stdin(SIMD_ALIGN)?;
        Self::from_buffer(buf, dialect)
    }

    /// Adopt an already-loaded buffer.
    pub fn from_buffer(buf: AlignedBuffer, dialect: Dialect) -> Result<Self> {
        let collector = ErrorCollector::new(
            dialect.error_mode,
            DEFAULT_ERROR_CAPACITY,
            OverflowPolicy::DropOldest,
        );
        Ok(CsvReader {
            buf,
            dialect,
            collector,
            schema: None,
            data_start: 0,
            parsed_rows: None,
        })
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Column names and inferred types. Parses the header and an inference
    /// prefix on first call, then caches.
    pub fn schema(&mut self) -> Result<&Schema> {
        self.ensure_schema();
        match &self.schema {
            Some(s) => Ok(s),
            None => crate::error::invariant_violation("schema missing after ensure"),
        }
    }

    fn ensure_schema(&mut self) {
        if self.schema.is_some() {
            return;
        }
        let data = self.buf.as_slice();
        let parser = LineParser::new(&self.dialect);

        let (names, data_start) = if self.dialect.has_header {
            parser.parse_header(data)
        } else {
            let width = parser.peek_width(data, 0);
            (Schema::synthetic_names(width), 0)
        };
        let n_cols = names.len();
        let types = infer_types(data, data_start, n_cols, &self.dialect);
        log::debug!(
            "schema: {} columns, header consumed {} bytes",
            n_cols,
            data_start
        );
        self.schema = Some(Schema::from_parts(names, types));
        self.data_start = data_start;
    }

    /// Physical data rows: the materialized count after `read_all`, a
    /// quote-aware scan before it.
    pub fn row_count(&mut self) -> usize {
        if let Some(rows) = self.parsed_rows {
            return rows;
        }
        self.ensure_schema();
        count_rows(&self.buf, self.data_start, &self.dialect)
    }

    pub fn has_errors(&self) -> bool {
        self.collector.has_errors()
    }

    pub fn errors(&self) -> Vec<ParseError> {
        self.collector.errors()
    }

    /// Diagnostics lost to collector overflow.
    pub fn errors_dropped(&self) -> u64 {
        self.collector.dropped()
    }

    /// Parse everything into a table.
    pub fn read_all(&mut self) -> Result<Table> {
        self.collector.clear();
        self.ensure_schema();
        let schema = self.schema.clone().unwrap_or_default();
        let n_cols = schema.len();
        if n_cols == 0 {
            self.parsed_rows = Some(0);
            return Ok(Table::new(schema, Vec::new()));
        }

        let strict = self.dialect.error_mode == ErrorMode::Strict;
        let chunks = find_chunks(
            &self.buf,
            self.data_start,
            &self.dialect,
            self.dialect.target_chunk_size,
        );
        let mut row_bases = Vec::with_capacity(chunks.len());
        let mut base = 0u64;
        for c in &chunks {
            row_bases.push(base);
            base += c.row_count as u64;
        }
        log::debug!(
            "parsing {} bytes in {} chunks on {} threads",
            self.buf.len() - self.data_start,
            chunks.len(),
            self.dialect.effective_threads()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.dialect.effective_threads())
            .build()
            .map_err(|e| {
                Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;

        let buf = &self.buf;
        let dialect = &self.dialect;
        let collector = &self.collector;
        let mut segments: Vec<IndexSegment> = pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(i, chunk)| index_chunk(buf, chunk, dialect, collector, row_bases[i]))
                .collect()
        });
        // Collection already preserves chunk order; the stable sort on start
        // offset keeps the merge contract independent of how workers ran.
        segments.sort_by_key(|s| s.chunk_start);

        if strict && self.collector.is_tripped() {
            if let Some(first) = self.collector.first() {
                return Err(Error::Parse(first));
            }
        }

        // Stable merge in chunk order, normalizing row widths.
        let num_rows: usize = segments.iter().map(|s| s.num_rows()).sum();
        let mut row_major = Vec::with_capacity(num_rows * n_cols);
        let mut phys_rows = Vec::with_capacity(num_rows);
        for (i, seg) in segments.iter().enumerate() {
            for e in &seg.errors {
                let mut rebased = e.clone();
                rebased.row = row_bases[i] + rebased.row + 1;
                self.collector.push(rebased);
            }
            for r in 0..seg.num_rows() {
                let row = seg.row(r);
                let phys = row_bases[i] + seg.row_phys[r] as u64;
                if row.len() != n_cols {
                    let err = ParseError {
                        row: phys + 1,
                        column: Some(row.len().min(u32::MAX as usize) as u32),
                        kind: ParseErrorKind::FieldCountMismatch,
                        message: format!("expected {} fields, found {}", n_cols, row.len()),
                    };
                    self.collector.push(err.clone());
                    if strict {
                        return Err(Error::Parse(err));
                    }
                }
                for c in 0..n_cols {
                    row_major.push(row.get(c).copied().unwrap_or(FieldEntry::MISSING));
                }
                phys_rows.push(phys);
            }
        }

        if strict && self.collector.is_tripped() {
            if let Some(first) = self.collector.first() {
                return Err(Error::Parse(first));
            }
        }

        let index = FieldIndex::from_row_major(row_major, num_rows, n_cols);

        // One task per column keeps pools and dictionaries deterministic.
        let data = self.buf.as_slice();
        let phys = &phys_rows;
        let mut materialized: Vec<(Column, Vec<ParseError>)> = pool.install(|| {
            (0..n_cols)
                .into_par_iter()
                .map(|c| {
                    let dtype = schema
                        .field(c)
                        .map(|f| f.dtype)
                        .unwrap_or(DataType::String);
                    materialize_column(data, index.column(c), dtype, dialect, phys, c as u32)
                })
                .collect()
        });

        let mut value_errors: Vec<ParseError> = materialized
            .iter_mut()
            .flat_map(|(_, errs)| std::mem::take(errs))
            .collect();
        value_errors.sort_by_key(|e| (e.row, e.column));
        if strict {
            if let Some(first) = value_errors.into_iter().next() {
                self.collector.push(first.clone());
                return Err(Error::Parse(first));
            }
        } else {
            for e in value_errors {
                self.collector.push(e);
            }
        }

        let columns: Vec<Column> = materialized.into_iter().map(|(col, _)| col).collect();
        self.parsed_rows = Some(num_rows);
        log::debug!(
            "materialized {} rows x {} columns, {} diagnostics",
            num_rows,
            n_cols,
            self.collector.len()
        );
        Ok(Table::new(schema, columns))
    }
}

fn materialize_column(
    data: &[u8],
    entries: &[FieldEntry],
    dtype: DataType,
    dialect: &Dialect,
    phys_rows: &[u64],
    col: u32,
) -> (Column, Vec<ParseError>) {
    let mut builder = ColumnBuilder::with_capacity(dtype, entries.len(), dialect.validate_utf8);
    let mut errors = Vec::new();
    for (r, entry) in entries.iter().enumerate() {
        if entry.is_missing() {
            builder.append_null();
            continue;
        }
        let value = extract(data, entry.offset as usize, entry.len as usize, dialect);
        if dialect.is_null_value(&value) {
            builder.append_null();
            continue;
        }
        match builder.append(&value, dialect) {
            Ok(()) => {}
            Err(kind) => {
                builder.append_null();
                errors.push(ParseError {
                    row: phys_rows[r] + 1,
                    column: Some(col),
                    kind,
                    message: format!("value {:?}", String::from_utf8_lossy(&value)),
                });
            }
        }
    }
    (builder.finish(), errors)
}

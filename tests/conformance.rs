// End-to-end parser scenarios.
//
// Each scenario goes through the full pipeline: buffer → chunks → indexing
// → inference → materialization. The determinism suite re-runs the same
// input across worker counts and requires byte-identical tables.

use columncsv::{
    AlignedBuffer, ColumnData, CsvReader, DataType, Dialect, Error, ErrorMode, EscapeMode,
    ParseErrorKind, Table,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read(data: &[u8], dialect: Dialect) -> (Table, CsvReader) {
    let buf = AlignedBuffer::from_slice(data).expect("alloc");
    let mut reader = CsvReader::from_buffer(buf, dialect).expect("reader");
    let table = reader.read_all().expect("parse");
    (table, reader)
}

/// Render a cell for comparison; nulls become None.
fn cell(table: &Table, row: usize, col: usize) -> Option<String> {
    let column = table.column(col).expect("column");
    if column.is_null(row) {
        return None;
    }
    Some(match column.data() {
        ColumnData::Bool(v) => v[row].to_string(),
        ColumnData::Int32(v) | ColumnData::Date(v) => v[row].to_string(),
        ColumnData::Int64(v) | ColumnData::Timestamp(v) => v[row].to_string(),
        ColumnData::Float64(v) => v[row].to_string(),
        ColumnData::String(s) => String::from_utf8_lossy(s.get(row)).into_owned(),
        ColumnData::Na => unreachable!("Na cells are always null"),
    })
}

fn grid(table: &Table) -> Vec<Vec<Option<String>>> {
    (0..table.num_rows())
        .map(|r| (0..table.num_columns()).map(|c| cell(table, r, c)).collect())
        .collect()
}

fn s(value: &str) -> Option<String> {
    Some(value.to_string())
}

// ---------------------------------------------------------------------------
// Boundary scenarios
// ---------------------------------------------------------------------------

#[test]
fn quote_spanning_simd_boundary() {
    // The quoted run crosses byte 64 of the data region.
    let mut data = Vec::from(&b"a,b\n\""[..]);
    data.extend(std::iter::repeat(b'x').take(80));
    data.extend_from_slice(b"\",y\n");
    let (table, reader) = read(&data, Dialect::default());
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.num_columns(), 2);
    let long = cell(&table, 0, 0).expect("value");
    assert_eq!(long.len(), 80);
    assert_eq!(cell(&table, 0, 1), s("y"));
    assert!(!reader.has_errors());
}

#[test]
fn unterminated_quote_strict() {
    let buf = AlignedBuffer::from_slice(b"a,b\n\"oops,c\n").expect("alloc");
    let mut reader = CsvReader::from_buffer(buf, Dialect::default()).expect("reader");
    match reader.read_all() {
        Err(Error::Parse(p)) => {
            assert_eq!(p.kind, ParseErrorKind::UnterminatedQuote);
            assert_eq!(p.row, 1);
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
}

#[test]
fn unterminated_quote_permissive() {
    let (table, reader) = read(
        b"a,b\n\"oops,c\n",
        Dialect::new().error_mode(ErrorMode::Permissive),
    );
    assert_eq!(table.num_rows(), 1, "best-effort row emitted");
    assert!(reader.has_errors());
    assert!(reader
        .errors()
        .iter()
        .any(|e| e.kind == ParseErrorKind::UnterminatedQuote && e.row == 1));
}

#[test]
fn embedded_newline_in_quoted_field() {
    let (table, reader) = read(b"a,b\n\"x\ny\",z\n", Dialect::default());
    assert_eq!(table.num_rows(), 1);
    assert_eq!(cell(&table, 0, 0), s("x\ny"));
    assert_eq!(cell(&table, 0, 1), s("z"));
    assert!(!reader.has_errors());
}

#[test]
fn double_quote_escape() {
    let (table, _) = read(b"a\n\"he said \"\"hi\"\"\"\n", Dialect::default());
    assert_eq!(table.num_rows(), 1);
    assert_eq!(cell(&table, 0, 0), s("he said \"hi\""));
}

#[test]
fn mixed_types_inference() {
    let (table, reader) = read(
        b"a,b,c\n1,2.5,2024-01-02\n2,NaN,2024-01-03\n",
        Dialect::new().error_mode(ErrorMode::Permissive),
    );
    let types: Vec<DataType> = table.schema().fields().iter().map(|f| f.dtype).collect();
    assert_eq!(
        types,
        vec![DataType::Int32, DataType::Float64, DataType::Date]
    );
    assert_eq!(table.num_rows(), 2);

    let b = table.column(1).expect("b");
    assert_eq!(b.null_count(), 1, "NaN slot is null");
    let values = b.as_f64().expect("floats");
    assert_eq!(values[0], 2.5);
    assert!(values[1].is_nan(), "NaN stored in the value vector");

    let c = table.column(2).expect("c");
    let days = c.as_i32().expect("dates");
    assert_eq!(days[1] - days[0], 1);
    assert!(!reader.has_errors());
}

// ---------------------------------------------------------------------------
// Multi-threaded determinism
// ---------------------------------------------------------------------------

fn synthetic_csv(rows: usize) -> Vec<u8> {
    let mut data = Vec::from(&b"id,name,score,flag,note\n"[..]);
    for i in 0..rows {
        let note = match i % 4 {
            0 => format!("\"line{}\nbreak\"", i),
            1 => format!("\"quote \"\"{}\"\"\"", i % 17),
            2 => String::new(),
            _ => format!("plain-{}", i % 13),
        };
        data.extend_from_slice(
            format!(
                "{},user{},{}.{},{},{}\n",
                i,
                i % 101,
                i % 997,
                i % 10,
                if i % 2 == 0 { "true" } else { "false" },
                note
            )
            .as_bytes(),
        );
    }
    data
}

#[test]
fn thread_count_determinism() {
    let data = synthetic_csv(10_000);
    let reference = read(
        &data,
        Dialect::new().num_threads(1).target_chunk_size(1 << 12),
    )
    .0;
    assert_eq!(reference.num_rows(), 10_000);

    for threads in [2, 4, 8, 16] {
        let table = read(
            &data,
            Dialect::new()
                .num_threads(threads)
                .target_chunk_size(1 << 12),
        )
        .0;
        assert_eq!(table, reference, "threads={threads}");
    }
}

#[test]
fn chunk_size_independence() {
    let data = synthetic_csv(2_000);
    let reference = read(&data, Dialect::new().target_chunk_size(1 << 20)).0;
    for shift in [7usize, 9, 13] {
        let table = read(&data, Dialect::new().target_chunk_size(1 << shift)).0;
        assert_eq!(table, reference, "chunk=2^{shift}");
    }
}

// ---------------------------------------------------------------------------
// Dialect options
// ---------------------------------------------------------------------------

#[test]
fn semicolon_delimiter() {
    let (table, _) = read(b"a;b\n1;x\n", Dialect::new().delimiter(b';'));
    assert_eq!(grid(&table), vec![vec![s("1"), s("x")]]);
}

#[test]
fn comment_rows() {
    let (table, _) = read(
        b"# generated file\na,b\n1,2\n# trailing note\n3,4\n",
        Dialect::new().comment(Some(b'#')),
    );
    assert_eq!(
        table.schema().fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    assert_eq!(table.num_rows(), 2);
    assert_eq!(cell(&table, 1, 0), s("3"));
}

#[test]
fn headerless_with_synthetic_names() {
    let (table, _) = read(b"5,x\n6,y\n", Dialect::new().has_header(false));
    assert_eq!(
        table.schema().fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["X1", "X2"]
    );
    assert_eq!(table.num_rows(), 2);
}

#[test]
fn custom_null_and_bool_vocabulary() {
    let (table, _) = read(
        b"a,b\nNULL,yes\n1,no\n",
        Dialect::new()
            .null_values(["NULL", ""])
            .true_values(["yes"])
            .false_values(["no"]),
    );
    let a = table.column(0).expect("a");
    assert!(a.is_null(0));
    assert_eq!(
        table.column(1).and_then(|c| c.as_bool()),
        Some(&[true, false][..])
    );
}

#[test]
fn skip_empty_rows_toggle() {
    let data = b"a\n1\n\n2\n";
    let (table, _) = read(data, Dialect::default());
    assert_eq!(table.num_rows(), 2);

    let (table, _) = read(
        data,
        Dialect::new()
            .skip_empty_rows(false)
            .error_mode(ErrorMode::Permissive),
    );
    assert_eq!(table.num_rows(), 3);
    let a = table.column(0).expect("a");
    assert!(a.is_null(1), "empty field in the kept row is null");
}

#[test]
fn backslash_escape_dialect() {
    let (table, reader) = read(
        b"a,b\n\"x\\\"y\",\"p\\\\q\"\n",
        Dialect::new().escape(EscapeMode::Backslash),
    );
    assert_eq!(cell(&table, 0, 0), s("x\"y"));
    assert_eq!(cell(&table, 0, 1), s("p\\q"));
    assert!(!reader.has_errors());
}

#[test]
fn whitespace_trimming() {
    let (table, _) = read(b"a,b\n  7 , \"kept \" \n", Dialect::default());
    assert_eq!(cell(&table, 0, 0), s("7"), "unquoted whitespace trimmed");
    assert_eq!(cell(&table, 0, 1), s("kept "), "quoted whitespace preserved");
    let a = table.column(0).expect("a");
    assert_eq!(a.dtype(), DataType::Int32, "trimmed value still infers numeric");
}

// ---------------------------------------------------------------------------
// Round trip: write a table as CSV, parse it back
// ---------------------------------------------------------------------------

/// Minimal CSV writer for the round-trip property: quote when the value
/// contains a structural byte, double embedded quotes.
fn write_csv(rows: &[Vec<String>], delimiter: u8, quote: u8) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            let needs_quoting = value.bytes().any(|b| {
                b == delimiter || b == quote || b == b'\n' || b == b'\r'
            }) || value.starts_with(' ')
                || value.ends_with(' ');
            if needs_quoting {
                out.push(quote);
                for b in value.bytes() {
                    if b == quote {
                        out.push(quote);
                    }
                    out.push(b);
                }
                out.push(quote);
            } else {
                out.extend_from_slice(value.as_bytes());
            }
        }
        out.push(b'\n');
    }
    out
}

#[test]
fn csv_round_trip() {
    for (delimiter, quote) in [(b',', b'"'), (b';', b'\''), (b'\t', b'"')] {
        let rows: Vec<Vec<String>> = vec![
            vec!["h1".into(), "h2".into(), "h3".into()],
            vec!["plain".into(), "with space".into(), "a,b;c\td".into()],
            vec!["emb\nnewline".into(), format!("q{}q", quote as char), " padded ".into()],
            vec!["x".into(), "".into(), "end".into()],
        ];
        let data = write_csv(&rows, delimiter, quote);
        let (table, reader) = read(
            &data,
            Dialect::new()
                .delimiter(delimiter)
                .quote(Some(quote))
                .null_values(Vec::<String>::new())
                .error_mode(ErrorMode::Permissive),
        );
        assert!(!reader.has_errors(), "{:?}", reader.errors());
        assert_eq!(table.num_rows(), 3);
        for (r, row) in rows[1..].iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                assert_eq!(
                    cell(&table, r, c).as_deref(),
                    Some(value.as_str()),
                    "delim={delimiter} row={r} col={c}"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error surfaces
// ---------------------------------------------------------------------------

#[test]
fn quote_in_unquoted_field_permissive() {
    let (table, reader) = read(
        b"a,b\nab\"cd,2\n",
        Dialect::new().error_mode(ErrorMode::Permissive),
    );
    assert_eq!(table.num_rows(), 1);
    assert!(reader
        .errors()
        .iter()
        .any(|e| e.kind == ParseErrorKind::QuoteInUnquotedField && e.row == 1));
}

#[test]
fn schema_without_read() {
    let buf = AlignedBuffer::from_slice(b"name,age\nalice,31\n").expect("alloc");
    let mut reader = CsvReader::from_buffer(buf, Dialect::default()).expect("reader");
    let schema = reader.schema().expect("schema");
    assert_eq!(schema.len(), 2);
    assert_eq!(schema.field(0).map(|f| f.dtype), Some(DataType::String));
    assert_eq!(schema.field(1).map(|f| f.dtype), Some(DataType::Int32));
    assert_eq!(reader.row_count(), 1);
}

#[test]
fn file_loading() {
    use std::io::Write;
    let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
    tmp.write_all(b"a,b\n1,2\n").expect("write");
    let mut reader = CsvReader::open(tmp.path(), Dialect::default()).expect("open");
    let table = reader.read_all().expect("parse");
    assert_eq!(table.num_rows(), 1);
    assert_eq!(cell(&table, 0, 1), s("2"));
}

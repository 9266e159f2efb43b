// Type inference over a prefix sample.
//
// Each column starts unknown and widens through `schema::wider` as sampled
// fields arrive. Per-field classification applies the rules in order: null,
// bool, integer, float, date, timestamp, string. A column still unknown
// after the sample is promoted to String.

use crate::column::parse::parse_int;
use crate::dialect::Dialect;
use crate::parser::LineParser;
use crate::schema::{wider, DataType};

/// Classify one trimmed, unescaped field value.
pub fn infer_field(value: &[u8], dialect: &Dialect) -> DataType {
    if value.is_empty() || dialect.is_null_value(value) {
        return DataType::Na;
    }
    if dialect.is_true_value(value) || dialect.is_false_value(value) {
        return DataType::Bool;
    }
    if looks_like_int(value) {
        if let Some(n) = parse_int(value) {
            return if n >= i32::MIN as i64 && n <= i32::MAX as i64 {
                DataType::Int32
            } else {
                DataType::Int64
            };
        }
        // All digits but past i64: a float still represents it.
    }
    // Non-finite parses (NaN, inf) stay Float64 so a NaN cell does not
    // demote a numeric column to String.
    if fast_float::parse::<f64, _>(value).is_ok() {
        return DataType::Float64;
    }
    if looks_like_date(value) {
        return DataType::Date;
    }
    if looks_like_timestamp(value) {
        return DataType::Timestamp;
    }
    DataType::String
}

fn looks_like_int(value: &[u8]) -> bool {
    let digits = match value[0] {
        b'+' | b'-' => &value[1..],
        _ => value,
    };
    !digits.is_empty() && digits.iter().all(|b| b.is_ascii_digit())
}

fn looks_like_date(value: &[u8]) -> bool {
    if value.len() != 10 {
        return false;
    }
    let sep = value[4];
    (sep == b'-' || sep == b'/')
        && value[7] == sep
        && [0, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|&i| value[i].is_ascii_digit())
}

fn looks_like_timestamp(value: &[u8]) -> bool {
    if value.len() < 19 {
        return false;
    }
    let sep = value[4];
    (sep == b'-' || sep == b'/')
        && value[7] == sep
        && (value[10] == b'T' || value[10] == b' ')
        && value[13] == b':'
        && value[16] == b':'
        && [0, 1, 2, 3, 5, 6, 8, 9, 11, 12, 14, 15, 17, 18]
            .iter()
            .all(|&i| value[i].is_ascii_digit())
}

/// Widen per-column types over up to `dialect.infer_rows` records starting
/// at `start`. Comment rows and suppressed empty rows do not count toward
/// the sample. Fields beyond `n_cols` are ignored; short rows update only
/// the columns they have.
pub fn infer_types(data: &[u8], start: usize, n_cols: usize, dialect: &Dialect) -> Vec<DataType> {
    let mut types: Vec<Option<DataType>> = vec![None; n_cols];
    if n_cols == 0 {
        return Vec::new();
    }

    let parser = LineParser::new(dialect);
    let mut pos = start;
    let mut sampled = 0;
    while pos < data.len() && sampled < dialect.infer_rows {
        if parser.is_comment_row(data, pos) {
            pos = parser.find_row_end(data, pos);
            continue;
        }
        let (fields, next) = parser.parse_record(data, pos);
        pos = next;
        if fields.is_empty()
            || (fields.len() == 1 && fields[0].is_empty() && dialect.skip_empty_rows)
        {
            continue;
        }
        for (col, value) in fields.iter().take(n_cols).enumerate() {
            let observed = infer_field(value, dialect);
            types[col] = Some(match types[col] {
                Some(current) => wider(current, observed),
                None => observed,
            });
        }
        sampled += 1;
    }

    // Unknown after sampling promotes to String; an all-null column stays Na.
    types
        .into_iter()
        .map(|t| t.unwrap_or(DataType::String))
        .collect()
}

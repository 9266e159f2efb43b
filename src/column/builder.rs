// Per-type column builders.
//
// `append` parses a field's logical value into the typed vector; a failure
// leaves the builder untouched and reports the kind, so the caller decides
// between null-fill (permissive) and abort (strict). Null slots push a
// sentinel value (zero, NaN for floats, empty for strings) and set the
// bitmap.

use crate::column::parse::{parse_date, parse_int, parse_timestamp};
use crate::column::{Column, ColumnData, StringData};
use crate::dialect::Dialect;
use crate::error::ParseErrorKind;
use crate::schema::DataType;

pub struct ColumnBuilder {
    dtype: DataType,
    data: ColumnData,
    nulls: Vec<bool>,
    null_count: usize,
    validate_utf8: bool,
}

impl ColumnBuilder {
    pub fn with_capacity(dtype: DataType, capacity: usize, validate_utf8: bool) -> Self {
        let data = match dtype {
            DataType::Bool => ColumnData::Bool(Vec::with_capacity(capacity)),
            DataType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
            DataType::Int64 => ColumnData::Int64(Vec::with_capacity(capacity)),
            DataType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
            DataType::Date => ColumnData::Date(Vec::with_capacity(capacity)),
            DataType::Timestamp => ColumnData::Timestamp(Vec::with_capacity(capacity)),
            DataType::String => ColumnData::String(StringData::with_capacity(capacity, capacity * 8)),
            DataType::Na => ColumnData::Na,
        };
        ColumnBuilder {
            dtype,
            data,
            nulls: Vec::with_capacity(capacity),
            null_count: 0,
            validate_utf8,
        }
    }

    pub fn len(&self) -> usize {
        self.nulls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nulls.is_empty()
    }

    /// Parse and append one non-null value. On failure nothing is pushed.
    pub fn append(&mut self, value: &[u8], dialect: &Dialect) -> Result<(), ParseErrorKind> {
        match &mut self.data {
            ColumnData::Bool(v) => {
                if dialect.is_true_value(value) {
                    v.push(true);
                } else if dialect.is_false_value(value) {
                    v.push(false);
                } else {
                    return Err(ParseErrorKind::ParseFailure(DataType::Bool));
                }
            }
            ColumnData::Int32(v) => {
                let parsed = parse_int(value)
                    .filter(|&n| n >= i32::MIN as i64 && n <= i32::MAX as i64)
                    .ok_or(ParseErrorKind::ParseFailure(DataType::Int32))?;
                v.push(parsed as i32);
            }
            ColumnData::Int64(v) => {
                let parsed =
                    parse_int(value).ok_or(ParseErrorKind::ParseFailure(DataType::Int64))?;
                v.push(parsed);
            }
            ColumnData::Float64(v) => {
                let parsed = fast_float::parse::<f64, _>(value)
                    .map_err(|_| ParseErrorKind::ParseFailure(DataType::Float64))?;
                v.push(parsed);
                // NaN is stored but counts as null for statistics purposes.
                self.nulls.push(parsed.is_nan());
                if parsed.is_nan() {
                    self.null_count += 1;
                }
                return Ok(());
            }
            ColumnData::Date(v) => {
                let parsed =
                    parse_date(value).ok_or(ParseErrorKind::ParseFailure(DataType::Date))?;
                v.push(parsed);
            }
            ColumnData::Timestamp(v) => {
                let parsed = parse_timestamp(value)
                    .ok_or(ParseErrorKind::ParseFailure(DataType::Timestamp))?;
                v.push(parsed);
            }
            ColumnData::String(s) => {
                if self.validate_utf8 && std::str::from_utf8(value).is_err() {
                    return Err(ParseErrorKind::InvalidUtf8);
                }
                s.push(value);
            }
            // A column typed Na saw nothing but nulls in the sample; a late
            // non-null value cannot be represented.
            ColumnData::Na => return Err(ParseErrorKind::ParseFailure(DataType::Na)),
        }
        self.nulls.push(false);
        Ok(())
    }

    /// Append a null slot: sentinel value plus bitmap entry.
    pub fn append_null(&mut self) {
        match &mut self.data {
            ColumnData::Bool(v) => v.push(false),
            ColumnData::Int32(v) => v.push(0),
            ColumnData::Int64(v) => v.push(0),
            ColumnData::Float64(v) => v.push(f64::NAN),
            ColumnData::Date(v) => v.push(0),
            ColumnData::Timestamp(v) => v.push(0),
            ColumnData::String(s) => s.push(b""),
            ColumnData::Na => {}
        }
        self.nulls.push(true);
        self.null_count += 1;
    }

    pub fn finish(self) -> Column {
        Column::new(self.dtype, self.data, self.nulls, self.null_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> Dialect {
        Dialect::default()
    }

    #[test]
    fn test_int32_builder() {
        let mut b = ColumnBuilder::with_capacity(DataType::Int32, 4, false);
        b.append(b"1", &d()).expect("parse");
        b.append_null();
        b.append(b"-17", &d()).expect("parse");
        assert_eq!(b.len(), 3);
        let col = b.finish();
        assert_eq!(col.as_i32(), Some(&[1, 0, -17][..]));
        assert_eq!(col.nulls(), &[false, true, false]);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_int32_range_rejected() {
        let mut b = ColumnBuilder::with_capacity(DataType::Int32, 1, false);
        assert_eq!(
            b.append(b"2147483648", &d()),
            Err(ParseErrorKind::ParseFailure(DataType::Int32))
        );
        assert_eq!(b.len(), 0, "failed append pushes nothing");
        b.append(b"-2147483648", &d()).expect("min fits");
    }

    #[test]
    fn test_float_builder_nan_is_null() {
        let mut b = ColumnBuilder::with_capacity(DataType::Float64, 3, false);
        b.append(b"2.5", &d()).expect("parse");
        b.append(b"NaN", &d()).expect("NaN parses");
        b.append(b"1e3", &d()).expect("parse");
        let col = b.finish();
        let values = col.as_f64().expect("floats");
        assert_eq!(values[0], 2.5);
        assert!(values[1].is_nan(), "NaN stored in the value vector");
        assert_eq!(values[2], 1000.0);
        assert_eq!(col.nulls(), &[false, true, false], "but marked null");
    }

    #[test]
    fn test_bool_builder() {
        let mut b = ColumnBuilder::with_capacity(DataType::Bool, 4, false);
        b.append(b"TRUE", &d()).expect("parse");
        b.append(b"F", &d()).expect("parse");
        assert_eq!(
            b.append(b"maybe", &d()),
            Err(ParseErrorKind::ParseFailure(DataType::Bool))
        );
        let col = b.finish();
        assert_eq!(col.as_bool(), Some(&[true, false][..]));
    }

    #[test]
    fn test_date_and_timestamp_builders() {
        let mut b = ColumnBuilder::with_capacity(DataType::Date, 2, false);
        b.append(b"1970-01-02", &d()).expect("parse");
        assert_eq!(
            b.append(b"not a date", &d()),
            Err(ParseErrorKind::ParseFailure(DataType::Date))
        );
        assert_eq!(b.finish().as_i32(), Some(&[1][..]));

        let mut b = ColumnBuilder::with_capacity(DataType::Timestamp, 2, false);
        b.append(b"1970-01-01 00:00:02", &d()).expect("parse");
        assert_eq!(b.finish().as_i64(), Some(&[2_000_000][..]));
    }

    #[test]
    fn test_string_builder_owns_pool() {
        let mut b = ColumnBuilder::with_capacity(DataType::String, 3, false);
        b.append(b"alpha", &d()).expect("push");
        b.append_null();
        b.append(b"beta", &d()).expect("push");
        let col = b.finish();
        assert_eq!(col.str_at(0), Some(&b"alpha"[..]));
        assert_eq!(col.str_at(1), None, "null slot");
        assert_eq!(col.str_at(2), Some(&b"beta"[..]));
    }

    #[test]
    fn test_string_utf8_validation() {
        let mut b = ColumnBuilder::with_capacity(DataType::String, 1, true);
        assert_eq!(b.append(b"\xff\xfe", &d()), Err(ParseErrorKind::InvalidUtf8));
        b.append("héllo".as_bytes(), &d()).expect("valid utf8");
    }

    #[test]
    fn test_na_builder() {
        let mut b = ColumnBuilder::with_capacity(DataType::Na, 2, false);
        b.append_null();
        b.append_null();
        assert_eq!(
            b.append(b"late", &d()),
            Err(ParseErrorKind::ParseFailure(DataType::Na))
        );
        let col = b.finish();
        assert_eq!(col.len(), 2);
        assert_eq!(col.null_count(), 2);
    }
}

// Per-column statistics for predicate pushdown.
//
// Accumulated incrementally per encoded chunk; merging is associative and
// commutative min/max plus additive null counts, so per-worker accumulators
// can join in any grouping. NaN counts as null for FLOAT64.

use crate::column::{Column, ColumnData};
use crate::simd::kernels;

/// A min or max observation.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bytes(Vec<u8>),
}

impl StatValue {
    fn le(&self, other: &StatValue) -> bool {
        match (self, other) {
            (StatValue::Bool(a), StatValue::Bool(b)) => a <= b,
            (StatValue::Int32(a), StatValue::Int32(b)) => a <= b,
            (StatValue::Int64(a), StatValue::Int64(b)) => a <= b,
            (StatValue::Float64(a), StatValue::Float64(b)) => a <= b,
            (StatValue::Bytes(a), StatValue::Bytes(b)) => a <= b,
            // Type mismatch: keep the receiver.
            _ => true,
        }
    }

    /// Little-endian (or raw, for bytes) serialization for a statistics blob.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            StatValue::Bool(v) => vec![*v as u8],
            StatValue::Int32(v) => v.to_le_bytes().to_vec(),
            StatValue::Int64(v) => v.to_le_bytes().to_vec(),
            StatValue::Float64(v) => v.to_le_bytes().to_vec(),
            StatValue::Bytes(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStatistics {
    pub min: Option<StatValue>,
    pub max: Option<StatValue>,
    pub null_count: u64,
    pub has_null: bool,
}

impl ColumnStatistics {
    fn observe(&mut self, value: StatValue) {
        match &self.min {
            Some(min) if min.le(&value) => {}
            _ => self.min = Some(value.clone()),
        }
        match &self.max {
            Some(max) if value.le(max) => {}
            _ => self.max = Some(value),
        }
    }

    fn observe_null(&mut self) {
        self.null_count += 1;
        self.has_null = true;
    }

    pub fn add_bool(&mut self, value: bool, is_null: bool) {
        if is_null {
            self.observe_null();
        } else {
            self.observe(StatValue::Bool(value));
        }
    }

    pub fn add_i32(&mut self, value: i32, is_null: bool) {
        if is_null {
            self.observe_null();
        } else {
            self.observe(StatValue::Int32(value));
        }
    }

    pub fn add_i64(&mut self, value: i64, is_null: bool) {
        if is_null {
            self.observe_null();
        } else {
            self.observe(StatValue::Int64(value));
        }
    }

    pub fn add_f64(&mut self, value: f64, is_null: bool) {
        if is_null || value.is_nan() {
            self.observe_null();
        } else {
            self.observe(StatValue::Float64(value));
        }
    }

    pub fn add_bytes(&mut self, value: &[u8], is_null: bool) {
        if is_null {
            self.observe_null();
        } else {
            self.observe(StatValue::Bytes(value.to_vec()));
        }
    }

    /// Associative merge of two accumulators.
    pub fn merge(a: &ColumnStatistics, b: &ColumnStatistics) -> ColumnStatistics {
        let mut out = ColumnStatistics {
            min: a.min.clone(),
            max: a.max.clone(),
            null_count: a.null_count + b.null_count,
            has_null: a.has_null || b.has_null,
        };
        if let Some(min) = &b.min {
            match &out.min {
                Some(current) if current.le(min) => {}
                _ => out.min = Some(min.clone()),
            }
        }
        if let Some(max) = &b.max {
            match &out.max {
                Some(current) if max.le(current) => {}
                _ => out.max = Some(max.clone()),
            }
        }
        out
    }
}

/// Statistics for one column over `rows`, using the SIMD min/max kernels on
/// the all-valid fast path.
pub fn column_statistics(column: &Column, rows: std::ops::Range<usize>) -> ColumnStatistics {
    let mut stats = ColumnStatistics::default();
    let nulls = &column.nulls()[rows.clone()];
    let none_null = nulls.iter().all(|&n| !n);
    let k = kernels();

    match column.data() {
        ColumnData::Bool(v) => {
            for (i, &value) in v[rows].iter().enumerate() {
                stats.add_bool(value, nulls[i]);
            }
        }
        ColumnData::Int32(v) | ColumnData::Date(v) => {
            if none_null && !nulls.is_empty() {
                let (min, max) = (k.minmax_i32)(&v[rows]);
                stats.min = Some(StatValue::Int32(min));
                stats.max = Some(StatValue::Int32(max));
            } else {
                for (i, &value) in v[rows].iter().enumerate() {
                    stats.add_i32(value, nulls[i]);
                }
            }
        }
        ColumnData::Int64(v) | ColumnData::Timestamp(v) => {
            if none_null && !nulls.is_empty() {
                let (min, max) = (k.minmax_i64)(&v[rows]);
                stats.min = Some(StatValue::Int64(min));
                stats.max = Some(StatValue::Int64(max));
            } else {
                for (i, &value) in v[rows].iter().enumerate() {
                    stats.add_i64(value, nulls[i]);
                }
            }
        }
        ColumnData::Float64(v) => {
            // The kernel skips NaN; nulls are stored as NaN, so the fast
            // path only needs the counts patched in.
            let (min, max) = (k.minmax_f64)(&v[rows]);
            if !min.is_nan() {
                stats.min = Some(StatValue::Float64(min));
                stats.max = Some(StatValue::Float64(max));
            }
            let null_count = nulls.iter().filter(|&&n| n).count() as u64;
            stats.null_count = null_count;
            stats.has_null = null_count > 0;
        }
        ColumnData::String(s) => {
            for (i, r) in rows.enumerate() {
                stats.add_bytes(s.get(r), nulls[i]);
            }
        }
        ColumnData::Na => {
            stats.null_count = nulls.len() as u64;
            stats.has_null = !nulls.is_empty();
        }
    }
    stats
}

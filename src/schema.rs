// Column data types and the widening lattice used by type inference.

/// Type of a materialized column.
///
/// `Na` is the bottom of the widening lattice: a column whose sampled values
/// were all null stays `Na`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Na,
    Bool,
    Int32,
    Int64,
    Float64,
    /// Days since 1970-01-01.
    Date,
    /// Microseconds since 1970-01-01T00:00:00 UTC.
    Timestamp,
    String,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Na => "na",
            DataType::Bool => "bool",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::String => "string",
        };
        f.write_str(name)
    }
}

/// Least upper bound of two inferred types.
///
/// Chains: Na ⊆ everything; Bool ⊆ String; Int32 ⊆ Int64 ⊆ Float64 ⊆ String;
/// Date ⊆ Timestamp ⊆ String. Incomparable pairs widen to String.
pub fn wider(a: DataType, b: DataType) -> DataType {
    use DataType::*;
    if a == b {
        return a;
    }
    match (a, b) {
        (Na, t) | (t, Na) => t,
        (Int32, Int64) | (Int64, Int32) => Int64,
        (Int32, Float64) | (Float64, Int32) => Float64,
        (Int64, Float64) | (Float64, Int64) => Float64,
        (Date, Timestamp) | (Timestamp, Date) => Timestamp,
        _ => String,
    }
}

/// A named, typed column slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
}

/// Ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Schema { fields }
    }

    pub fn from_parts(names: Vec<String>, types: Vec<DataType>) -> Self {
        debug_assert_eq!(names.len(), types.len());
        Schema {
            fields: names
                .into_iter()
                .zip(types)
                .map(|(name, dtype)| Field { name, dtype })
                .collect(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Synthetic names `X1..Xn` for header-less input.
    pub fn synthetic_names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("X{i}")).collect()
    }
}

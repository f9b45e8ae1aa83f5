//! Column type inference
//!
//! Derives a [`SchemaDescriptor`] (column name -> storage type) from a
//! [`TabularDataset`]. Each column's type is the join of the types of its
//! non-null values over a small lattice:
//!
//! ```text
//!   Boolean   BigInt -> DoublePrecision   Date -> Timestamp
//!        \         \        /                /
//!         +---------+-- Text --------------+
//! ```
//!
//! Columns with no non-null values at all are typed `Text`.

use std::fmt;

use crate::models::{TabularDataset, Value};

/// Storage type of an inferred column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    DoublePrecision,
    Date,
    Timestamp,
    Text,
}

impl ColumnType {
    /// PostgreSQL type name
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::DoublePrecision => "DOUBLE PRECISION",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "TEXT",
        }
    }

    /// Map an `information_schema.columns.data_type` value back to a column type
    pub fn from_sql_type(data_type: &str) -> Option<Self> {
        match data_type.to_lowercase().as_str() {
            "boolean" => Some(ColumnType::Boolean),
            "bigint" => Some(ColumnType::BigInt),
            "double precision" => Some(ColumnType::DoublePrecision),
            "date" => Some(ColumnType::Date),
            "timestamp without time zone" | "timestamp" => Some(ColumnType::Timestamp),
            "text" => Some(ColumnType::Text),
            _ => None,
        }
    }

    /// Type of a single value; `None` for nulls
    ///
    /// Raw field text is typed through [`Value::parse`].
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Int(_) => Some(ColumnType::BigInt),
            Value::Float(_) => Some(ColumnType::DoublePrecision),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::Text(_) => Some(ColumnType::Text),
            Value::Raw(field) => Self::of(&Value::parse(field)),
        }
    }

    /// Least type able to hold values of both `self` and `other`
    pub fn join(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (BigInt, DoublePrecision) | (DoublePrecision, BigInt) => DoublePrecision,
            (Date, Timestamp) | (Timestamp, Date) => Timestamp,
            _ => Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

/// Inferred column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name as it appears in the staging header
    pub name: String,
    /// Inferred storage type
    pub column_type: ColumnType,
}

/// Ordered mapping from column name to storage type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescriptor {
    /// Columns in staging-header order
    pub columns: Vec<ColumnDescriptor>,
    /// Number of rows the descriptor was inferred from
    pub sampled_rows: usize,
}

impl SchemaDescriptor {
    /// Build a descriptor from explicit `(name, type)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(name, column_type)| ColumnDescriptor {
                    name: name.into(),
                    column_type,
                })
                .collect(),
            sampled_rows: 0,
        }
    }

    /// Infer a descriptor from every row of a dataset
    pub fn infer(dataset: &TabularDataset) -> Self {
        let mut types: Vec<Option<ColumnType>> = vec![None; dataset.columns().len()];

        for row in dataset.rows() {
            for (slot, value) in types.iter_mut().zip(row) {
                if let Some(t) = ColumnType::of(value) {
                    *slot = Some(slot.map_or(t, |current| current.join(t)));
                }
            }
        }

        let columns = dataset
            .columns()
            .iter()
            .zip(types)
            .map(|(name, t)| {
                let column_type = t.unwrap_or_else(|| {
                    tracing::warn!(column = %name, "no non-null values in sample, typing as TEXT");
                    ColumnType::Text
                });
                ColumnDescriptor {
                    name: name.clone(),
                    column_type,
                }
            })
            .collect();

        Self {
            columns,
            sampled_rows: dataset.len(),
        }
    }

    /// Type of a named column
    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    /// Column names in order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the descriptor has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds(columns: &[&str], rows: Vec<Vec<Value>>) -> TabularDataset {
        TabularDataset::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn test_join_lattice() {
        use ColumnType::*;
        assert_eq!(BigInt.join(DoublePrecision), DoublePrecision);
        assert_eq!(Date.join(Timestamp), Timestamp);
        assert_eq!(Boolean.join(BigInt), Text);
        assert_eq!(Text.join(Text), Text);
        assert_eq!(Date.join(BigInt), Text);
    }

    #[test]
    fn test_infer_widens_and_skips_nulls() {
        let data = ds(
            &["pitcher", "release_speed", "game_date", "des"],
            vec![
                vec![
                    Value::Int(1),
                    Value::Int(94),
                    Value::parse("2015-04-05"),
                    Value::Null,
                ],
                vec![
                    Value::Int(2),
                    Value::Float(88.1),
                    Value::parse("2015-04-06"),
                    Value::Null,
                ],
                vec![Value::Null, Value::Null, Value::Null, Value::Null],
            ],
        );

        let schema = SchemaDescriptor::infer(&data);
        assert_eq!(schema.sampled_rows, 3);
        assert_eq!(schema.get("pitcher"), Some(ColumnType::BigInt));
        assert_eq!(schema.get("release_speed"), Some(ColumnType::DoublePrecision));
        assert_eq!(schema.get("game_date"), Some(ColumnType::Date));
        assert_eq!(schema.get("des"), Some(ColumnType::Text));
        assert_eq!(
            schema.names(),
            vec!["pitcher", "release_speed", "game_date", "des"]
        );
    }

    #[test]
    fn test_infer_types_raw_fields() {
        let text = "id,speed,code,seen\n007,1e3,abc,2008-03-31T19:05:00\n12,94.5,TRUE,\n";
        let data = TabularDataset::from_csv_reader(text.as_bytes()).unwrap();

        let schema = SchemaDescriptor::infer(&data);
        assert_eq!(schema.get("id"), Some(ColumnType::BigInt));
        assert_eq!(schema.get("speed"), Some(ColumnType::DoublePrecision));
        assert_eq!(schema.get("code"), Some(ColumnType::Text));
        assert_eq!(schema.get("seen"), Some(ColumnType::Timestamp));
    }

    #[test]
    fn test_sql_type_round_trips_through_information_schema_names() {
        for t in [
            ColumnType::Boolean,
            ColumnType::BigInt,
            ColumnType::DoublePrecision,
            ColumnType::Date,
            ColumnType::Timestamp,
            ColumnType::Text,
        ] {
            assert_eq!(ColumnType::from_sql_type(t.sql_type()), Some(t));
        }
        assert_eq!(
            ColumnType::from_sql_type("timestamp without time zone"),
            Some(ColumnType::Timestamp)
        );
        assert_eq!(ColumnType::from_sql_type("integer"), None);
    }
}

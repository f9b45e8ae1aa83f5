//! Tabular dataset model
//!
//! A [`TabularDataset`] is an ordered sequence of rows sharing one column
//! list. Datasets are produced by acquisition or database queries and are
//! never mutated in place; transformations return new datasets.

use std::io::{Read, Write};

use super::value::Value;

/// Ordered rows over a homogeneous column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TabularDataset {
    /// Create a dataset, padding or truncating each row to the column count
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Create a dataset with columns but no rows
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Read a dataset from delimited text with a header row
    ///
    /// Fields are kept as [`Value::Raw`] text (empty fields as `Null`), so
    /// writing the dataset back reproduces them exactly. Input with no
    /// header at all yields an empty dataset with no columns.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(Value::raw).collect());
        }

        Ok(Self::new(columns, rows))
    }

    /// Write the dataset as comma-delimited text, optionally with a header
    pub fn write_csv<W: Write>(&self, writer: W, header: bool) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        if header {
            wtr.write_record(&self.columns)?;
        }
        for row in &self.rows {
            wtr.write_record(row.iter().map(Value::to_field))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Render the dataset (with header) into an in-memory buffer
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf, true)?;
        Ok(buf)
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in order
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, in row order
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// A new dataset with the row order inverted
    pub fn reversed(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().rev().cloned().collect(),
        }
    }

    /// A new dataset keeping only rows matching the predicate
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// A new dataset restricted to the named columns (missing names are skipped)
    pub fn select(&self, names: &[&str]) -> Self {
        let picks: Vec<(String, usize)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|i| (n.to_string(), i)))
            .collect();
        Self {
            columns: picks.iter().map(|(n, _)| n.clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| picks.iter().map(|(_, i)| row[*i].clone()).collect())
                .collect(),
        }
    }

    /// Append another dataset's rows, returning a new dataset
    ///
    /// Rows of `other` are mapped onto this dataset's columns by name.
    pub fn concat(&self, other: &TabularDataset) -> Self {
        if self.columns.is_empty() {
            return other.clone();
        }
        let mapping: Vec<Option<usize>> = self
            .columns
            .iter()
            .map(|c| other.column_index(c))
            .collect();
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().map(|row| {
            mapping
                .iter()
                .map(|m| m.map(|i| row[i].clone()).unwrap_or(Value::Null))
                .collect::<Vec<_>>()
        }));
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TabularDataset {
        TabularDataset::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::Int(1), Value::from("a")],
                vec![Value::Int(2), Value::from("b")],
                vec![Value::Int(3)],
            ],
        )
    }

    #[test]
    fn test_new_pads_short_rows() {
        let ds = sample();
        assert_eq!(ds.rows()[2], vec![Value::Int(3), Value::Null]);
    }

    #[test]
    fn test_reversed_does_not_touch_original() {
        let ds = sample();
        let rev = ds.reversed();
        assert_eq!(rev.rows()[0][0], Value::Int(3));
        assert_eq!(ds.rows()[0][0], Value::Int(1));
    }

    #[test]
    fn test_csv_read_keeps_fields_raw() {
        let text = "id,speed,flag\n1,94.5,True\n2,,False\n";
        let ds = TabularDataset::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(ds.columns(), &["id", "speed", "flag"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0][1], Value::Raw("94.5".to_string()));
        assert_eq!(ds.rows()[1][1], Value::Null);
        assert_eq!(ds.rows()[1][2], Value::Raw("False".to_string()));
    }

    #[test]
    fn test_csv_round_trip_preserves_field_text() {
        let text = "a,b\n007,abc\n12345678901234567890,TRUE\n1e3,2008-03-31T19:05:00\n";
        let ds = TabularDataset::from_csv_reader(text.as_bytes()).unwrap();
        let mut out = Vec::new();
        ds.write_csv(&mut out, true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_csv_read_empty_input() {
        let ds = TabularDataset::from_csv_reader("".as_bytes()).unwrap();
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
    }

    #[test]
    fn test_write_csv_with_and_without_header() {
        let ds = sample();
        let mut with = Vec::new();
        ds.write_csv(&mut with, true).unwrap();
        assert_eq!(String::from_utf8(with).unwrap(), "id,name\n1,a\n2,b\n3,\n");

        let mut without = Vec::new();
        ds.write_csv(&mut without, false).unwrap();
        assert!(String::from_utf8(without).unwrap().starts_with("1,a\n"));
    }

    #[test]
    fn test_select_and_column_values() {
        let ds = sample();
        let names = ds.select(&["name", "missing"]);
        assert_eq!(names.columns(), &["name"]);
        assert_eq!(names.rows()[1], vec![Value::from("b")]);

        let ids = ds.column_values("id").unwrap();
        assert_eq!(ids, vec![&Value::Int(1), &Value::Int(2), &Value::Int(3)]);
        assert!(ds.column_values("nope").is_none());
    }

    #[test]
    fn test_concat_maps_columns_by_name() {
        let a = sample();
        let b = TabularDataset::new(
            vec!["name".to_string(), "id".to_string()],
            vec![vec![Value::from("z"), Value::Int(9)]],
        );
        let joined = a.concat(&b);
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.rows()[3], vec![Value::Int(9), Value::from("z")]);
    }
}

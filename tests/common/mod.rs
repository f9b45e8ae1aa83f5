//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use statcast_loader::database::schema::{LIST_SCHEMAS_SQL, LIST_TABLES_SQL, TABLE_COLUMNS_SQL};
use statcast_loader::{
    AcquisitionError, CopySource, DatabaseError, DatabaseResult, StatsProvider, StreamingLoader,
    TabularDataset, TransactionalStore, Value,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dataset(columns: &[&str], rows: Vec<Vec<Value>>) -> TabularDataset {
    TabularDataset::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

/// Provider serving canned windows keyed by their first day
#[derive(Default)]
pub struct FakeProvider {
    pub windows: HashMap<NaiveDate, TabularDataset>,
    pub identities: TabularDataset,
    pub fail_on: Option<NaiveDate>,
    pub requested: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    pub looked_up: RefCell<Vec<i64>>,
}

impl FakeProvider {
    pub fn with_window(mut self, first_day: NaiveDate, rows: TabularDataset) -> Self {
        self.windows.insert(first_day, rows);
        self
    }
}

#[async_trait(?Send)]
impl StatsProvider for FakeProvider {
    async fn fetch_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TabularDataset, AcquisitionError> {
        self.requested.borrow_mut().push((start, end));
        if self.fail_on == Some(start) {
            return Err(AcquisitionError::Request {
                context: format!("window {} to {}", start, end),
                message: "status 502 Bad Gateway".to_string(),
            });
        }
        Ok(self.windows.get(&start).cloned().unwrap_or_default())
    }

    async fn reverse_lookup(&self, ids: &[i64]) -> Result<TabularDataset, AcquisitionError> {
        self.looked_up.borrow_mut().extend_from_slice(ids);
        let Some(key) = self.identities.column_index("key_mlbam") else {
            return Ok(self.identities.clone());
        };
        Ok(self
            .identities
            .filter_rows(|row| row[key].as_i64().is_some_and(|id| ids.contains(&id))))
    }
}

/// One table held by [`FakeDatabase`]
#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    /// `(column_name, data_type)` as `information_schema` would report them
    pub columns: Vec<(String, String)>,
    pub rows: Vec<Vec<Value>>,
}

/// In-memory stand-in for a PostgreSQL database
///
/// Understands exactly the statements the loader generates.
#[derive(Default)]
pub struct FakeDatabase {
    pub statements: RefCell<Vec<String>>,
    pub databases: RefCell<BTreeSet<String>>,
    pub schemas: RefCell<BTreeSet<String>>,
    pub tables: RefCell<BTreeMap<(String, String), FakeTable>>,
    pub copies: RefCell<Vec<String>>,
    pub fail_copy: bool,
}

impl FakeDatabase {
    pub fn new() -> Self {
        let db = Self::default();
        db.schemas.borrow_mut().insert("public".to_string());
        db
    }

    pub fn with_table(self, namespace: &str, table: &str, contents: FakeTable) -> Self {
        self.schemas.borrow_mut().insert(namespace.to_string());
        self.tables
            .borrow_mut()
            .insert((namespace.to_string(), table.to_string()), contents);
        self
    }

    pub fn table(&self, namespace: &str, table: &str) -> Option<FakeTable> {
        self.tables
            .borrow()
            .get(&(namespace.to_string(), table.to_string()))
            .cloned()
    }

    pub fn ddl_count(&self) -> usize {
        self.statements
            .borrow()
            .iter()
            .filter(|s| s.starts_with("CREATE TABLE") || s.starts_with("DROP TABLE"))
            .count()
    }

    fn apply(&self, statement: &str) -> DatabaseResult<()> {
        self.statements.borrow_mut().push(statement.to_string());

        if let Some(rest) = statement.strip_prefix("CREATE DATABASE ") {
            let name = unquote(rest);
            if !self.databases.borrow_mut().insert(name.clone()) {
                return Err(DatabaseError::QueryFailed(format!(
                    "database \"{}\" already exists",
                    name
                )));
            }
        } else if let Some(rest) = statement.strip_prefix("CREATE SCHEMA IF NOT EXISTS ") {
            self.schemas.borrow_mut().insert(unquote(rest));
        } else if let Some(rest) = statement.strip_prefix("DROP TABLE IF EXISTS ") {
            self.tables.borrow_mut().remove(&split_qualified(rest));
        } else if let Some(rest) = statement.strip_prefix("CREATE TABLE ") {
            let (name, body) = rest
                .split_once(" (\n")
                .ok_or_else(|| DatabaseError::QueryFailed("malformed CREATE TABLE".into()))?;
            let key = split_qualified(name);
            if self.tables.borrow().contains_key(&key) {
                return Err(DatabaseError::QueryFailed(format!(
                    "relation \"{}\" already exists",
                    key.1
                )));
            }
            let columns = body
                .trim_end_matches("\n)")
                .lines()
                .map(|line| {
                    let line = line.trim().trim_end_matches(',');
                    let (column, sql_type) = line[1..].split_once("\" ").unwrap_or((line, "text"));
                    (column.to_string(), catalog_type(sql_type))
                })
                .collect();
            self.tables.borrow_mut().insert(
                key,
                FakeTable {
                    columns,
                    rows: Vec::new(),
                },
            );
        } else {
            return Err(DatabaseError::QueryFailed(format!(
                "unsupported statement: {}",
                statement
            )));
        }
        Ok(())
    }

    fn distinct_union(&self, sql: &str) -> DatabaseResult<TabularDataset> {
        let mut ids = BTreeSet::new();
        for select in sql.split("\nUNION\n") {
            let rest = select
                .strip_prefix("SELECT DISTINCT ")
                .ok_or_else(|| DatabaseError::QueryFailed(sql.to_string()))?;
            let (column, source) = rest
                .split_once(" AS id FROM ")
                .ok_or_else(|| DatabaseError::QueryFailed(sql.to_string()))?;
            let column = unquote(column);
            let tables = self.tables.borrow();
            let table = tables
                .get(&split_qualified(source))
                .ok_or_else(|| DatabaseError::QueryFailed(format!("no table {}", source)))?;
            let idx = table
                .columns
                .iter()
                .position(|(c, _)| *c == column)
                .ok_or_else(|| DatabaseError::QueryFailed(format!("no column {}", column)))?;
            for row in &table.rows {
                if !row[idx].is_null() {
                    ids.insert(row[idx].to_field());
                }
            }
        }
        Ok(dataset(
            &["id"],
            ids.into_iter().map(|id| vec![Value::Text(id)]).collect(),
        ))
    }
}

fn unquote(name: &str) -> String {
    name.trim().trim_matches('"').replace("\"\"", "\"")
}

fn split_qualified(name: &str) -> (String, String) {
    let (namespace, table) = name.trim().split_once("\".\"").unwrap_or(("public", name));
    (unquote(namespace), unquote(table))
}

fn catalog_type(sql_type: &str) -> String {
    match sql_type {
        "TIMESTAMP" => "timestamp without time zone".to_string(),
        other => other.to_lowercase(),
    }
}

#[async_trait(?Send)]
impl TransactionalStore for FakeDatabase {
    async fn execute(&self, sql: &str) -> DatabaseResult<u64> {
        self.apply(sql)?;
        Ok(0)
    }

    async fn execute_in_transaction(&self, statements: &[String]) -> DatabaseResult<()> {
        let snapshot = self.tables.borrow().clone();
        for statement in statements {
            if let Err(e) = self.apply(statement) {
                *self.tables.borrow_mut() = snapshot;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn query(&self, sql: &str, params: &[&str]) -> DatabaseResult<TabularDataset> {
        if sql == TABLE_COLUMNS_SQL {
            let columns = self
                .table(params[0], params[1])
                .map(|t| t.columns)
                .unwrap_or_default();
            return Ok(dataset(
                &["column_name", "data_type"],
                columns
                    .into_iter()
                    .map(|(c, t)| vec![Value::Text(c), Value::Text(t)])
                    .collect(),
            ));
        }
        if sql == LIST_SCHEMAS_SQL {
            return Ok(dataset(
                &["schema_name"],
                self.schemas
                    .borrow()
                    .iter()
                    .map(|s| vec![Value::Text(s.clone())])
                    .collect(),
            ));
        }
        if sql == LIST_TABLES_SQL {
            return Ok(dataset(
                &["table_name"],
                self.tables
                    .borrow()
                    .keys()
                    .filter(|(ns, _)| ns == params[0])
                    .map(|(_, t)| vec![Value::Text(t.clone())])
                    .collect(),
            ));
        }
        self.distinct_union(sql)
    }
}

#[async_trait(?Send)]
impl StreamingLoader for FakeDatabase {
    async fn copy_in(&self, statement: &str, source: CopySource) -> DatabaseResult<u64> {
        if self.fail_copy {
            return Err(DatabaseError::LoadFailed("connection reset mid-stream".into()));
        }
        self.copies.borrow_mut().push(statement.to_string());

        let target = statement
            .strip_prefix("COPY ")
            .and_then(|s| s.strip_suffix(" FROM STDIN WITH CSV HEADER"))
            .ok_or_else(|| DatabaseError::LoadFailed(format!("bad copy: {}", statement)))?;
        let key = split_qualified(target);

        let bytes = match source {
            CopySource::Buffer(bytes) => bytes,
            CopySource::File(path) => std::fs::read(&path)
                .map_err(|e| DatabaseError::IoError(e.to_string()))?,
        };
        let incoming = TabularDataset::from_csv_reader(bytes.as_slice())
            .map_err(|e| DatabaseError::LoadFailed(e.to_string()))?;

        let mut tables = self.tables.borrow_mut();
        let table = tables
            .get_mut(&key)
            .ok_or_else(|| DatabaseError::LoadFailed(format!("no table {}", target)))?;
        if incoming.columns().len() != table.columns.len() {
            return Err(DatabaseError::LoadFailed("column count mismatch".into()));
        }
        table.rows.extend(incoming.rows().iter().cloned());
        Ok(incoming.len() as u64)
    }
}

//! Provisioning engine: databases, schemas and tables
//!
//! Schema creation is idempotent. Table creation is not: the default
//! [`ExistsPolicy::Fail`] refuses to touch an existing table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::schema::{
    LIST_SCHEMAS_SQL, LIST_TABLES_SQL, TABLE_COLUMNS_SQL, create_database_sql, create_schema_sql,
    create_table_sql, drop_table_sql, normalize_ident,
};
use super::{DatabaseError, DatabaseResult, TransactionalStore};
use crate::inference::{ColumnType, SchemaDescriptor};
use crate::models::Value;

/// What `create_table` does when the table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistsPolicy {
    /// Fail without modifying the existing table
    #[default]
    Fail,
    /// Drop the existing table and create it again
    Replace,
    /// Keep the existing table if its columns match the descriptor
    AppendIfCompatible,
}

impl FromStr for ExistsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(ExistsPolicy::Fail),
            "replace" => Ok(ExistsPolicy::Replace),
            "append" | "append-if-compatible" => Ok(ExistsPolicy::AppendIfCompatible),
            _ => Err(format!(
                "Unknown exists policy: {}. Use 'fail', 'replace' or 'append-if-compatible'.",
                s
            )),
        }
    }
}

impl fmt::Display for ExistsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExistsPolicy::Fail => write!(f, "fail"),
            ExistsPolicy::Replace => write!(f, "replace"),
            ExistsPolicy::AppendIfCompatible => write!(f, "append-if-compatible"),
        }
    }
}

/// Outcome of a `create_table` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableProvision {
    /// Table did not exist and was created
    Created,
    /// Existing table was dropped and created again
    Replaced,
    /// Existing compatible table was kept
    Reused,
}

/// Provisioning engine over a transactional store
pub struct Provisioner<'a> {
    store: &'a dyn TransactionalStore,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner on top of a transactional handle
    pub fn new(store: &'a dyn TransactionalStore) -> Self {
        Self { store }
    }

    /// Create a database
    ///
    /// Runs as a single autocommit statement, since database creation cannot
    /// run inside a transaction block. An existing database is an error.
    pub async fn create_database(&self, name: &str) -> DatabaseResult<()> {
        let sql = create_database_sql(name)?;
        self.store.execute(&sql).await.map_err(|e| {
            DatabaseError::ProvisioningFailed(format!("Failed to create database {}: {}", name, e))
        })?;
        tracing::info!(database = %name.to_lowercase(), "database created");
        Ok(())
    }

    /// Create each schema if it does not exist (names are lower-cased)
    pub async fn create_schemas<S: AsRef<str>>(&self, names: &[S]) -> DatabaseResult<()> {
        let statements = names
            .iter()
            .map(|n| create_schema_sql(n.as_ref()))
            .collect::<DatabaseResult<Vec<_>>>()?;

        self.store
            .execute_in_transaction(&statements)
            .await
            .map_err(|e| {
                DatabaseError::ProvisioningFailed(format!("Failed to create schemas: {}", e))
            })?;

        for name in names {
            tracing::info!(schema = %name.as_ref().to_lowercase(), "schema ensured");
        }
        Ok(())
    }

    /// Create an empty table whose columns come from `descriptor`
    ///
    /// The table name is lower-cased. No rows are written.
    pub async fn create_table(
        &self,
        descriptor: &SchemaDescriptor,
        table: &str,
        namespace: &str,
        policy: ExistsPolicy,
    ) -> DatabaseResult<TableProvision> {
        let create = create_table_sql(descriptor, table, namespace)?;
        let existing = self.table_columns(namespace, table).await?;

        let outcome = match (existing, policy) {
            (None, _) => {
                self.store
                    .execute_in_transaction(&[create])
                    .await
                    .map_err(|e| provisioning_error(table, e))?;
                TableProvision::Created
            }
            (Some(_), ExistsPolicy::Fail) => {
                return Err(DatabaseError::ProvisioningFailed(format!(
                    "Table {}.{} already exists",
                    namespace.to_lowercase(),
                    table.to_lowercase()
                )));
            }
            (Some(_), ExistsPolicy::Replace) => {
                let drop = drop_table_sql(table, namespace)?;
                self.store
                    .execute_in_transaction(&[drop, create])
                    .await
                    .map_err(|e| provisioning_error(table, e))?;
                TableProvision::Replaced
            }
            (Some(columns), ExistsPolicy::AppendIfCompatible) => {
                check_compatible(descriptor, &columns, table)?;
                TableProvision::Reused
            }
        };

        tracing::info!(
            table = %table.to_lowercase(),
            namespace = %namespace.to_lowercase(),
            columns = descriptor.len(),
            ?outcome,
            "table provisioned"
        );
        Ok(outcome)
    }

    /// Columns of an existing table in ordinal order, or `None` if it does not exist
    pub async fn table_columns(
        &self,
        namespace: &str,
        table: &str,
    ) -> DatabaseResult<Option<Vec<(String, String)>>> {
        let namespace = normalize_ident(namespace)?;
        let table = normalize_ident(table)?;
        let result = self
            .store
            .query(TABLE_COLUMNS_SQL, &[namespace.as_str(), table.as_str()])
            .await?;

        if result.is_empty() {
            return Ok(None);
        }

        Ok(Some(
            result
                .rows()
                .iter()
                .map(|row| (text_of(&row[0]), text_of(&row[1])))
                .collect(),
        ))
    }

    /// Schema names in the database
    pub async fn list_schemas(&self) -> DatabaseResult<Vec<String>> {
        let result = self.store.query(LIST_SCHEMAS_SQL, &[]).await?;
        Ok(result.rows().iter().map(|row| text_of(&row[0])).collect())
    }

    /// Tables per schema, for the given schemas or every schema when `None`
    pub async fn database_layout(
        &self,
        schemas: Option<&[String]>,
    ) -> DatabaseResult<BTreeMap<String, Vec<String>>> {
        let schemas = match schemas {
            Some(s) if !s.is_empty() => s.to_vec(),
            _ => self.list_schemas().await?,
        };

        let mut layout = BTreeMap::new();
        for schema in schemas {
            let result = self.store.query(LIST_TABLES_SQL, &[schema.as_str()]).await?;
            let tables = result.rows().iter().map(|row| text_of(&row[0])).collect();
            layout.insert(schema, tables);
        }
        Ok(layout)
    }
}

fn provisioning_error(table: &str, e: DatabaseError) -> DatabaseError {
    DatabaseError::ProvisioningFailed(format!("Failed to create table {}: {}", table, e))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => other.to_field(),
    }
}

/// Existing columns must match the descriptor by name, order and type
fn check_compatible(
    descriptor: &SchemaDescriptor,
    existing: &[(String, String)],
    table: &str,
) -> DatabaseResult<()> {
    let incompatible = |detail: String| {
        DatabaseError::ProvisioningFailed(format!(
            "Table {} exists with an incompatible layout: {}",
            table, detail
        ))
    };

    if existing.len() != descriptor.len() {
        return Err(incompatible(format!(
            "{} columns, expected {}",
            existing.len(),
            descriptor.len()
        )));
    }

    for (wanted, (name, data_type)) in descriptor.columns.iter().zip(existing) {
        if &wanted.name != name {
            return Err(incompatible(format!(
                "column {} where {} was expected",
                name, wanted.name
            )));
        }
        if ColumnType::from_sql_type(data_type) != Some(wanted.column_type) {
            return Err(incompatible(format!(
                "column {} is {}, expected {}",
                name, data_type, wanted.column_type
            )));
        }
    }
    Ok(())
}

//! SQL statement generation
//!
//! Object names (databases, schemas, tables) are case-normalised to lower
//! case and validated before they are interpolated. Column names come from
//! the staging header and are always double-quoted so they keep their exact
//! spelling.

use super::{DatabaseError, DatabaseResult};
use crate::inference::SchemaDescriptor;

/// Catalog query listing the columns of one table in ordinal order
pub const TABLE_COLUMNS_SQL: &str = r#"
SELECT column_name::text AS column_name, data_type::text AS data_type
FROM information_schema.columns
WHERE table_schema::text = $1 AND table_name::text = $2
ORDER BY ordinal_position
"#;

/// Catalog query listing user schemas
pub const LIST_SCHEMAS_SQL: &str = r#"
SELECT schema_name::text AS schema_name
FROM information_schema.schemata
ORDER BY schema_name
"#;

/// Catalog query listing the base tables of one schema
pub const LIST_TABLES_SQL: &str = r#"
SELECT table_name::text AS table_name
FROM information_schema.tables
WHERE table_schema::text = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name
"#;

/// Maximum identifier length accepted by PostgreSQL
const MAX_IDENTIFIER_LEN: usize = 63;

/// Lower-case and validate a database object name
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit.
pub fn normalize_ident(name: &str) -> DatabaseResult<String> {
    let lowered = name.trim().to_lowercase();
    let valid = !lowered.is_empty()
        && lowered.len() <= MAX_IDENTIFIER_LEN
        && lowered
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !lowered.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(lowered)
    } else {
        Err(DatabaseError::InvalidIdentifier(name.to_string()))
    }
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Fully qualified `"namespace"."table"` after normalisation
pub fn qualified_name(namespace: &str, table: &str) -> DatabaseResult<String> {
    Ok(format!(
        "{}.{}",
        quote_ident(&normalize_ident(namespace)?),
        quote_ident(&normalize_ident(table)?)
    ))
}

/// `CREATE DATABASE` statement
pub fn create_database_sql(name: &str) -> DatabaseResult<String> {
    Ok(format!("CREATE DATABASE {}", quote_ident(&normalize_ident(name)?)))
}

/// `CREATE SCHEMA IF NOT EXISTS` statement
pub fn create_schema_sql(name: &str) -> DatabaseResult<String> {
    Ok(format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        quote_ident(&normalize_ident(name)?)
    ))
}

/// Empty `CREATE TABLE` statement derived from a schema descriptor
pub fn create_table_sql(
    descriptor: &SchemaDescriptor,
    table: &str,
    namespace: &str,
) -> DatabaseResult<String> {
    if descriptor.is_empty() {
        return Err(DatabaseError::ProvisioningFailed(format!(
            "Cannot create table {} without columns",
            table
        )));
    }

    let columns: Vec<String> = descriptor
        .columns
        .iter()
        .map(|c| format!("    {} {}", quote_ident(&c.name), c.column_type.sql_type()))
        .collect();

    Ok(format!(
        "CREATE TABLE {} (\n{}\n)",
        qualified_name(namespace, table)?,
        columns.join(",\n")
    ))
}

/// `DROP TABLE IF EXISTS` statement
pub fn drop_table_sql(table: &str, namespace: &str) -> DatabaseResult<String> {
    Ok(format!(
        "DROP TABLE IF EXISTS {}",
        qualified_name(namespace, table)?
    ))
}

/// Bulk copy statement reading CSV with a header row from the client
pub fn copy_from_stdin_sql(table: &str, namespace: &str) -> DatabaseResult<String> {
    Ok(format!(
        "COPY {} FROM STDIN WITH CSV HEADER",
        qualified_name(namespace, table)?
    ))
}

/// `SELECT DISTINCT` union over identifier columns, aliased as `id`
pub fn distinct_union_sql(columns: &[String], table: &str, namespace: &str) -> DatabaseResult<String> {
    if columns.is_empty() {
        return Err(DatabaseError::QueryFailed(
            "No identifier columns given".to_string(),
        ));
    }

    let source = qualified_name(namespace, table)?;
    let selects: Vec<String> = columns
        .iter()
        .map(|c| format!("SELECT DISTINCT {} AS id FROM {}", quote_ident(c), source))
        .collect();
    Ok(selects.join("\nUNION\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ColumnType;

    #[test]
    fn test_normalize_ident() {
        assert_eq!(normalize_ident("Statcast").unwrap(), "statcast");
        assert_eq!(normalize_ident(" public ").unwrap(), "public");
        assert_eq!(normalize_ident("statcast_pitch").unwrap(), "statcast_pitch");
        assert!(normalize_ident("").is_err());
        assert!(normalize_ident("1abc").is_err());
        assert!(normalize_ident("drop table x;").is_err());
        assert!(normalize_ident(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("des"), "\"des\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_create_statements() {
        assert_eq!(
            create_database_sql("Statcast").unwrap(),
            "CREATE DATABASE \"statcast\""
        );
        assert_eq!(
            create_schema_sql("RAW").unwrap(),
            "CREATE SCHEMA IF NOT EXISTS \"raw\""
        );
    }

    #[test]
    fn test_create_table_sql() {
        let descriptor = SchemaDescriptor::from_pairs([
            ("pitch_type", ColumnType::Text),
            ("release_speed", ColumnType::DoublePrecision),
            ("batter", ColumnType::BigInt),
        ]);
        let sql = create_table_sql(&descriptor, "Statcast_Pitch", "public").unwrap();
        assert!(sql.starts_with("CREATE TABLE \"public\".\"statcast_pitch\" ("));
        assert!(sql.contains("\"pitch_type\" TEXT"));
        assert!(sql.contains("\"release_speed\" DOUBLE PRECISION"));
        assert!(sql.contains("\"batter\" BIGINT"));
        assert!(!sql.contains("IF NOT EXISTS"));
    }

    #[test]
    fn test_create_table_requires_columns() {
        let err = create_table_sql(&SchemaDescriptor::default(), "t", "public").unwrap_err();
        assert!(matches!(err, DatabaseError::ProvisioningFailed(_)));
    }

    #[test]
    fn test_copy_statement() {
        assert_eq!(
            copy_from_stdin_sql("statcast_pitch", "public").unwrap(),
            "COPY \"public\".\"statcast_pitch\" FROM STDIN WITH CSV HEADER"
        );
    }

    #[test]
    fn test_distinct_union_sql() {
        let sql = distinct_union_sql(
            &["batter".to_string(), "pitcher".to_string()],
            "statcast_pitch",
            "public",
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT DISTINCT \"batter\" AS id FROM \"public\".\"statcast_pitch\"\nUNION\nSELECT DISTINCT \"pitcher\" AS id FROM \"public\".\"statcast_pitch\""
        );
        assert!(distinct_union_sql(&[], "t", "public").is_err());
    }
}

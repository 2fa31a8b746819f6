//! SQL dialect registry.
//!
//! Maps user-facing dialect names to `sqlparser` dialect implementations.
//! The list is what the parser collaborator actually ships; `dialects`
//! output and `--dialect` validation both come from here.

use sqlparser::dialect::{
    AnsiDialect, BigQueryDialect, ClickHouseDialect, DatabricksDialect, Dialect, DuckDbDialect,
    GenericDialect, HiveDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    RedshiftSqlDialect, SQLiteDialect, SnowflakeDialect,
};

use crate::error::{SqlError, SqlResult};

/// Supported dialect names, sorted.
pub const SUPPORTED_DIALECTS: &[&str] = &[
    "ansi",
    "bigquery",
    "clickhouse",
    "databricks",
    "duckdb",
    "generic",
    "hive",
    "mssql",
    "mysql",
    "postgres",
    "redshift",
    "snowflake",
    "sqlite",
];

/// Return the sorted list of supported dialect names.
pub fn supported_dialects() -> Vec<&'static str> {
    SUPPORTED_DIALECTS.to_vec()
}

/// Resolve a dialect name to its parser implementation.
pub fn resolve_dialect(name: &str) -> SqlResult<Box<dyn Dialect>> {
    match name.to_lowercase().as_str() {
        "ansi" => Ok(Box::new(AnsiDialect {})),
        "bigquery" => Ok(Box::new(BigQueryDialect {})),
        "clickhouse" => Ok(Box::new(ClickHouseDialect {})),
        "databricks" => Ok(Box::new(DatabricksDialect {})),
        "duckdb" => Ok(Box::new(DuckDbDialect {})),
        "generic" => Ok(Box::new(GenericDialect {})),
        "hive" => Ok(Box::new(HiveDialect {})),
        "mssql" => Ok(Box::new(MsSqlDialect {})),
        "mysql" => Ok(Box::new(MySqlDialect {})),
        "postgres" => Ok(Box::new(PostgreSqlDialect {})),
        "redshift" => Ok(Box::new(RedshiftSqlDialect {})),
        "snowflake" => Ok(Box::new(SnowflakeDialect {})),
        "sqlite" => Ok(Box::new(SQLiteDialect {})),
        other => Err(SqlError::UnknownDialect(other.to_string())),
    }
}

/// Parse line and column from a sqlparser error message.
///
/// `ParserError` is a simple string wrapper with no structured location
/// data, so we extract "Line: N, Column: M" from the error message text.
pub(crate) fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (0, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let Ok(column) = msg[col_start..col_end].trim().parse::<usize>() else {
        return (0, 0);
    };
    (line, column)
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;

//! SQL parser wrapper

use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;

use crate::dialect::{parse_location_from_error, resolve_dialect};
use crate::error::{SqlError, SqlResult};

/// SQL parser that wraps sqlparser-rs with dialect selection.
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
    name: String,
}

impl SqlParser {
    /// Create a parser from a dialect name (see
    /// [`supported_dialects`](crate::dialect::supported_dialects)).
    pub fn from_dialect_name(name: &str) -> SqlResult<Self> {
        let dialect = resolve_dialect(name)?;
        Ok(Self {
            dialect,
            name: name.to_lowercase(),
        })
    }

    /// Create a parser with the generic dialect.
    pub fn generic() -> Self {
        Self {
            dialect: Box::new(sqlparser::dialect::GenericDialect {}),
            name: "generic".to_string(),
        }
    }

    /// Create a parser with the DuckDB dialect.
    pub fn duckdb() -> Self {
        Self {
            dialect: Box::new(sqlparser::dialect::DuckDbDialect {}),
            name: "duckdb".to_string(),
        }
    }

    /// Parse SQL into AST statements.
    pub fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(SqlError::EmptySql);
        }

        Parser::parse_sql(&*self.dialect, sql).map_err(|e| {
            let message = e.to_string();
            let (line, column) = parse_location_from_error(&message);
            SqlError::ParseError {
                message,
                line,
                column,
            }
        })
    }

    /// Parse SQL and return the first statement.
    pub fn parse_single(&self, sql: &str) -> SqlResult<Statement> {
        let statements = self.parse(sql)?;
        statements.into_iter().next().ok_or(SqlError::EmptySql)
    }

    /// Get the dialect name.
    pub fn dialect_name(&self) -> &str {
        &self.name
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::generic()
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;

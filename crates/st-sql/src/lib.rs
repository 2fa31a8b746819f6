//! st-sql - SQL parsing layer for sqltrace
//!
//! This crate wraps sqlparser-rs behind a dialect registry and walks parsed
//! statements into per-statement lineage: write targets, base-table sources
//! (with CTEs and subqueries inlined), and column-level flows. Everything
//! here is pure with respect to a single statement; folding across
//! statements and files happens in st-core's resolver.

pub mod columns;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod parser;

pub use dialect::{supported_dialects, SUPPORTED_DIALECTS};
pub use error::SqlError;
pub use extractor::{extract_statement, extract_statements};
pub use parser::SqlParser;

use sqlparser::ast::{ObjectName, ObjectNamePart};
use st_core::statement::TableRef;

/// Render an `ObjectName` as a dotted string.
pub fn object_name_to_string(name: &ObjectName) -> String {
    object_name_parts(name).join(".")
}

/// The identifier parts of an `ObjectName`, in order.
pub(crate) fn object_name_parts(name: &ObjectName) -> Vec<String> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => ident.value.clone(),
            other => other.to_string(),
        })
        .collect()
}

/// Split an `ObjectName` into a schema-qualified table reference. The last
/// part is the table name; everything before it becomes the schema prefix.
pub(crate) fn table_ref_from_object_name(name: &ObjectName) -> TableRef {
    let mut parts = object_name_parts(name);
    if parts.len() <= 1 {
        TableRef::bare(parts.pop().unwrap_or_default())
    } else {
        let table = parts.pop().unwrap_or_default();
        TableRef {
            schema: Some(parts.join(".")),
            name: table,
        }
    }
}

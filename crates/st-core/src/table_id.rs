//! Strongly-typed canonical table identifier.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Canonical identifier for a table or view, e.g. `raw.customers`.
///
/// Identity is case-insensitive: the inner string is lowercased on
/// construction, so two references that differ only in case compare equal
/// and hash identically. Display casing of the original reference lives on
/// [`Table`](crate::model::Table), not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    /// Create a new `TableId`, canonicalizing to lowercase.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_lowercase())
    }

    /// Build an id from an optional schema and an unqualified name.
    pub fn from_parts(schema: Option<&str>, name: &str) -> Self {
        match schema {
            Some(schema) => Self::new(format!("{}.{}", schema, name)),
            None => Self::new(name),
        }
    }

    /// Return the canonical id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The unqualified (last) component of the id.
    pub fn bare_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// The schema prefix, if the id is qualified.
    pub fn schema(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(schema, _)| schema)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for TableId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TableId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TableId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for TableId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TableId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for TableId {
    fn eq(&self, other: &String) -> bool {
        self.0 == *other
    }
}

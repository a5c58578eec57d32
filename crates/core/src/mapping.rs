//! Source-column to canonical-field mapping.
//!
//! A [`FieldMapping`] holds only the columns the operator chose to import.
//! A column that is not a key is routed to the contact's overflow bag by
//! the server. Several columns may target the same field; the backend
//! applies last-wins semantics, so nothing here guards against it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::fields::{guess_field, CanonicalField};

/// Delimiters for the fingerprint input (ASCII unit/record separators).
const KEY_SEPARATOR: u8 = 0x1f;
const ENTRY_SEPARATOR: u8 = 0x1e;

/// Mapping from source column name to canonical contact field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, CanonicalField>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from `(column, field)` pairs. Later pairs for the
    /// same column replace earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, CanonicalField)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(c, f)| (c.into(), f)).collect())
    }

    /// Map `column` onto `field`, returning the previous target if any.
    pub fn insert(&mut self, column: impl Into<String>, field: CanonicalField) -> Option<CanonicalField> {
        self.0.insert(column.into(), field)
    }

    /// Stop importing `column` (it falls back to the overflow bag).
    pub fn remove(&mut self, column: &str) -> Option<CanonicalField> {
        self.0.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<CanonicalField> {
        self.0.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CanonicalField)> {
        self.0.iter().map(|(c, f)| (c.as_str(), *f))
    }

    /// Stable digest of the mapping contents.
    ///
    /// Two mappings have the same fingerprint exactly when they map the
    /// same columns onto the same fields.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (column, field) in &self.0 {
            hasher.update(column.as_bytes());
            hasher.update([KEY_SEPARATOR]);
            hasher.update(field.as_str().as_bytes());
            hasher.update([ENTRY_SEPARATOR]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Source columns that are not mapped, in source order.
    pub fn unmapped_columns<'a>(&self, source_columns: &'a [String]) -> Vec<&'a str> {
        source_columns
            .iter()
            .filter(|c| !self.0.contains_key(c.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Check the mapping against the columns the parser reported.
    ///
    /// Every key must be a known source column and at least one column
    /// must be mapped.
    pub fn validate_against(&self, source_columns: &[String]) -> Result<(), CoreError> {
        if self.0.is_empty() {
            return Err(CoreError::Validation(
                "Map at least one column to a contact field".to_string(),
            ));
        }
        let unknown: Vec<&str> = self
            .0
            .keys()
            .filter(|k| !source_columns.iter().any(|c| c == *k))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(CoreError::Validation(format!(
                "Mapping refers to columns not present in the file: {}",
                unknown.join(", ")
            )));
        }
        Ok(())
    }
}

/// Pre-populate a mapping by matching each header against known field
/// spellings. Columns without a confident match are left unmapped.
pub fn suggest_mapping(source_columns: &[String]) -> FieldMapping {
    FieldMapping(
        source_columns
            .iter()
            .filter_map(|column| guess_field(column).map(|field| (column.clone(), field)))
            .collect(),
    )
}

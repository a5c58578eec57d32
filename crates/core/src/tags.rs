//! Tag selection applied to every imported or updated contact.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// A tag as listed by the tag management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: DbId,
    pub name: String,
}

/// Set of selected tag ids. Order is irrelevant and repeats collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSelection(BTreeSet<DbId>);

impl TagSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: DbId) -> bool {
        if !self.0.remove(&id) {
            self.0.insert(id);
            true
        } else {
            false
        }
    }

    pub fn insert(&mut self, id: DbId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: DbId) -> bool {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DbId> + '_ {
        self.0.iter().copied()
    }

    /// Drop ids that no longer refer to an existing tag and return them.
    ///
    /// Tags deleted concurrently by another operator are not an error; the
    /// stale ids simply disappear from the selection.
    pub fn reconcile(&mut self, existing: &[Tag]) -> Vec<DbId> {
        let known: BTreeSet<DbId> = existing.iter().map(|t| t.id).collect();
        let stale: Vec<DbId> = self.0.difference(&known).copied().collect();
        for id in &stale {
            self.0.remove(id);
        }
        stale
    }
}

impl FromIterator<DbId> for TagSelection {
    fn from_iter<I: IntoIterator<Item = DbId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

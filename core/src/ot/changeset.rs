//! Flat arena of pending edits keyed by revision id
//!
//! Parent links are plain `based_on` strings, so "children of X" is a filter
//! over the arena. The map is ordered, which makes `children_of` return
//! siblings sorted by revision id: the first one is always the winner.

use crate::edit::Edit;
use std::collections::BTreeMap;

/// Edits owned by one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    edits: BTreeMap<String, Edit>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a change set from edits
    ///
    /// When a revision id appears twice the first copy is kept.
    pub fn from_edits(edits: impl IntoIterator<Item = Edit>) -> Self {
        let mut set = Self::new();
        for edit in edits {
            set.insert(edit);
        }
        set
    }

    /// Add an edit; returns false if its revision is already present
    pub fn insert(&mut self, edit: Edit) -> bool {
        if self.edits.contains_key(&edit.revision) {
            tracing::warn!(revision = %edit.revision, "duplicate revision in change set, keeping first");
            return false;
        }
        self.edits.insert(edit.revision.clone(), edit);
        true
    }

    /// Remove and return an edit
    pub fn remove(&mut self, revision: &str) -> Option<Edit> {
        self.edits.remove(revision)
    }

    pub fn get(&self, revision: &str) -> Option<&Edit> {
        self.edits.get(revision)
    }

    pub fn get_mut(&mut self, revision: &str) -> Option<&mut Edit> {
        self.edits.get_mut(revision)
    }

    pub fn contains(&self, revision: &str) -> bool {
        self.edits.contains_key(revision)
    }

    /// Revisions of the edits based on `revision`, in tie-break order
    pub fn children_of(&self, revision: &str) -> Vec<String> {
        self.edits
            .values()
            .filter(|edit| edit.based_on == revision)
            .map(|edit| edit.revision.clone())
            .collect()
    }

    /// Remove the winning child of `revision`, if any
    ///
    /// Siblings are ranked by byte-wise comparison of their revision ids.
    pub fn take_winner(&mut self, revision: &str) -> Option<Edit> {
        let winner = self
            .edits
            .values()
            .find(|edit| edit.based_on == revision)
            .map(|edit| edit.revision.clone())?;
        self.edits.remove(&winner)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// All revision ids, sorted
    pub fn revisions(&self) -> impl Iterator<Item = &str> {
        self.edits.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edit> {
        self.edits.values()
    }

    /// Consume the set, returning edits sorted by revision
    pub fn into_edits(self) -> Vec<Edit> {
        self.edits.into_values().collect()
    }
}

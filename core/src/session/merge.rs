//! Echo detection between the authoritative edit set and local edits

use crate::edit::Edit;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Authoritative edits plus local edits the server hasn't echoed yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedEdits {
    /// Server edits followed by unconfirmed local edits
    pub merged: Vec<Edit>,

    /// Local revisions already present in the server set
    pub duplicates: Vec<String>,
}

/// Combine server and local edits, de-duplicating by revision id
///
/// # Example
///
/// ```rust
/// use textsync_core::edit::Edit;
/// use textsync_core::merge_known;
///
/// let server = vec![Edit::new("a::1", "root", vec![])];
/// let local = vec![Edit::new("a::1", "root", vec![]), Edit::new("a::2", "a::1", vec![])];
///
/// let result = merge_known(&server, &local);
/// assert_eq!(result.merged.len(), 2);
/// assert_eq!(result.duplicates, vec!["a::1"]);
/// ```
pub fn merge_known(server_edits: &[Edit], local_edits: &[Edit]) -> MergedEdits {
    let known: HashSet<&str> = server_edits.iter().map(|e| e.revision.as_str()).collect();

    let mut merged = server_edits.to_vec();
    let mut duplicates = Vec::new();

    for edit in local_edits {
        if known.contains(edit.revision.as_str()) {
            tracing::debug!(revision = %edit.revision, "local edit echoed back");
            duplicates.push(edit.revision.clone());
        } else {
            merged.push(edit.clone());
        }
    }

    MergedEdits { merged, duplicates }
}

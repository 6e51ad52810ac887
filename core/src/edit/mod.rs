//! Edits: the unit of change exchanged between sessions
//!
//! An [`Edit`] is one session's batch of [`Operation`]s, anchored to the
//! revision it was made against (`based_on`). Edits form a tree keyed by
//! revision id; the parent need not be known locally yet.
//!
//! # Example
//!
//! ```rust
//! use textsync_core::edit::{Edit, Operation};
//!
//! let edit = Edit::new("ws-s1::1", "root", vec![Operation::insert(0, "Hi")]);
//! assert_eq!(edit.origin_session, "ws-s1");
//! assert_eq!(edit.apply("!"), "Hi!");
//! ```

mod operation;
mod revision;
mod wire;

pub use operation::{apply_operations, normalize_operations, Operation, MAX_POSITION};
pub use revision::{
    new_origin_session, parse_revision, revision_id, RevisionCounter, REVISION_SEPARATOR,
    ROOT_REVISION,
};

pub(crate) use operation::{application_order, apply_to_rope};

use crate::error::Result;
use ropey::Rope;
use serde::{Deserialize, Serialize};
use wire::WireEdit;

/// Identifies one collaboratively edited document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Kind of object the text belongs to (card, project, resource...)
    pub kind: String,

    /// Object id within its kind
    pub id: i64,
}

impl DocumentKey {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// One session's set of operations against a prior revision
///
/// Coordinates are fixed at creation. Reconciliation works on copies and
/// never mutates an Edit that callers still hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "WireEdit", into = "WireEdit")]
pub struct Edit {
    /// Unique id of the state reached by applying this edit
    pub revision: String,

    /// Revision the operations' offsets refer to
    pub based_on: String,

    /// Session that produced the edit
    pub origin_session: String,

    /// Kind of the edited document
    pub target_kind: String,

    /// Id of the edited document
    pub target_id: i64,

    /// Operations in ascending-offset order
    pub operations: Vec<Operation>,

    /// Ordering keys of the inserts, parallel to `operations`
    ///
    /// Only set inside a reconciliation pass; never sent over the wire.
    pub(crate) anchors: Vec<Option<InsertAnchor>>,
}

/// Where an insert sat when its edit was written
///
/// Two inserts pushed onto the same position by concurrent edits are ordered
/// by their anchors when both come from the same base revision, so the
/// result does not depend on which edit was applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct InsertAnchor {
    /// Base revision the offset refers to, as an ordinal of the pass
    pub base: usize,

    /// Offset in the base revision
    pub offset: usize,

    /// Revision of the edit, as an ordinal sorted like the revision ids
    pub rank: usize,

    /// Position of the insert in its edit
    pub index: usize,
}

impl PartialEq for Edit {
    fn eq(&self, other: &Self) -> bool {
        self.revision == other.revision
            && self.based_on == other.based_on
            && self.origin_session == other.origin_session
            && self.target_kind == other.target_kind
            && self.target_id == other.target_id
            && self.operations == other.operations
    }
}

impl Eq for Edit {}

impl Edit {
    /// Create an edit, deriving the origin session from a conventional revision id
    pub fn new(
        revision: impl Into<String>,
        based_on: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Self {
        let revision = revision.into();
        let origin_session = parse_revision(&revision)
            .map(|(session, _)| session.to_string())
            .unwrap_or_default();

        Self {
            revision,
            based_on: based_on.into(),
            origin_session,
            target_kind: String::new(),
            target_id: 0,
            operations,
            anchors: Vec::new(),
        }
    }

    /// Attach the edit to a document
    pub fn with_target(mut self, document: &DocumentKey) -> Self {
        self.target_kind = document.kind.clone();
        self.target_id = document.id;
        self
    }

    /// Set the originating session explicitly
    pub fn with_origin(mut self, session: impl Into<String>) -> Self {
        self.origin_session = session.into();
        self
    }

    /// Ordering key of the operation at `index`, if the pass assigned one
    pub(crate) fn anchor(&self, index: usize) -> Option<InsertAnchor> {
        if self.anchors.len() != self.operations.len() {
            return None;
        }
        self.anchors.get(index).copied().flatten()
    }

    /// Key every insert by its current offset in `base`
    pub(crate) fn anchor_inserts(&mut self, base: usize, rank: usize) {
        self.anchors = self
            .operations
            .iter()
            .enumerate()
            .map(|(index, op)| match op {
                Operation::Insert { offset, .. } => Some(InsertAnchor {
                    base,
                    offset: *offset,
                    rank,
                    index,
                }),
                Operation::Delete { .. } => None,
            })
            .collect();
    }

    /// Document this edit targets
    pub fn document(&self) -> DocumentKey {
        DocumentKey::new(self.target_kind.clone(), self.target_id)
    }

    /// Check if applying the edit changes nothing
    pub fn is_noop(&self) -> bool {
        self.operations.iter().all(Operation::is_noop)
    }

    /// Apply the operations to a rope in place
    pub fn apply_to(&self, rope: &mut Rope) {
        apply_to_rope(rope, &self.operations);
    }

    /// Apply the operations to `text` and return the result
    pub fn apply(&self, text: &str) -> String {
        apply_operations(text, &self.operations)
    }

    /// Decode an edit from its JSON wire form
    ///
    /// Malformed operations are logged and dropped.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode the edit in its JSON wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode a JSON array of edits
pub fn edits_from_json(json: &str) -> Result<Vec<Edit>> {
    Ok(serde_json::from_str(json)?)
}

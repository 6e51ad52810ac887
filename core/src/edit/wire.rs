//! Wire representation of an Edit
//!
//! Field names are camelCase on the wire. Operation payloads are optional
//! here so a single bad operation can be reported and dropped without
//! rejecting the whole Edit.

use super::{Edit, Operation};
use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireEdit {
    pub revision: String,
    pub based_on: String,
    #[serde(default)]
    pub origin_session: String,
    #[serde(default)]
    pub target_kind: String,
    #[serde(default)]
    pub target_id: i64,
    #[serde(default)]
    pub operations: Vec<WireOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireOperation {
    pub kind: String,
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl TryFrom<WireOperation> for Operation {
    type Error = ReconcileError;

    fn try_from(wire: WireOperation) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| ReconcileError::MalformedOperation {
            kind: wire.kind.clone(),
            offset: wire.offset,
            reason: reason.to_string(),
        };

        match wire.kind.as_str() {
            "insert" => match wire.text {
                Some(text) => Ok(Operation::Insert {
                    offset: wire.offset,
                    text,
                }),
                None => Err(malformed("insert without text")),
            },
            "delete" => match wire.length {
                Some(length) => Ok(Operation::Delete {
                    offset: wire.offset,
                    length,
                }),
                None => Err(malformed("delete without length")),
            },
            _ => Err(malformed("unknown operation kind")),
        }
    }
}

impl From<Operation> for WireOperation {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Insert { offset, text } => WireOperation {
                kind: "insert".to_string(),
                offset,
                text: Some(text),
                length: None,
            },
            Operation::Delete { offset, length } => WireOperation {
                kind: "delete".to_string(),
                offset,
                text: None,
                length: Some(length),
            },
        }
    }
}

impl From<WireEdit> for Edit {
    fn from(wire: WireEdit) -> Self {
        let mut operations = Vec::with_capacity(wire.operations.len());
        for op in wire.operations {
            match Operation::try_from(op) {
                Ok(op) => operations.push(op),
                Err(err) => {
                    tracing::warn!(revision = %wire.revision, error = %err, "skipping operation");
                }
            }
        }

        Edit {
            revision: wire.revision,
            based_on: wire.based_on,
            origin_session: wire.origin_session,
            target_kind: wire.target_kind,
            target_id: wire.target_id,
            operations,
            anchors: Vec::new(),
        }
    }
}

impl From<Edit> for WireEdit {
    fn from(edit: Edit) -> Self {
        WireEdit {
            revision: edit.revision,
            based_on: edit.based_on,
            origin_session: edit.origin_session,
            target_kind: edit.target_kind,
            target_id: edit.target_id,
            operations: edit.operations.into_iter().map(WireOperation::from).collect(),
        }
    }
}

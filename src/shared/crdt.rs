/**
 * Shared CRDT Types
 * 
 * This module defines the text operations clients send to a room and the
 * document state the server hands back. Positions are character indices
 * (Unicode scalar values), matching the document engine.
 */

use serde::{Deserialize, Serialize};

/// CRDT operation types for collaborative editing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum CRDTOperation {
    /// Insert text at a specific position
    Insert {
        /// Position in the document (character index)
        position: usize,
        /// Text to insert
        text: String,
    },
    /// Delete a range of text
    Delete {
        /// Start position (inclusive)
        start: usize,
        /// End position (exclusive)
        end: usize,
    },
}

impl CRDTOperation {
    /// Create a new insert operation
    pub fn insert(position: usize, text: impl Into<String>) -> Self {
        Self::Insert {
            position,
            text: text.into(),
        }
    }

    /// Create a new delete operation
    pub fn delete(start: usize, end: usize) -> Self {
        Self::Delete { start, end }
    }

    /// Whether applying this operation would leave the document unchanged
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Insert { text, .. } => text.is_empty(),
            Self::Delete { start, end } => start >= end,
        }
    }
}

/// Document state snapshot as seen by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocumentState {
    /// The document content
    pub content: String,
    /// Number of operations in the document history
    pub version: usize,
}

impl DocumentState {
    /// Create document state with content
    pub fn with_content(content: impl Into<String>, version: usize) -> Self {
        Self {
            content: content.into(),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_wire_format() {
        let op = CRDTOperation::insert(3, "hi");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Insert", "position": 3, "text": "hi"}));

        let parsed: CRDTOperation =
            serde_json::from_str(r#"{"type":"Delete","start":1,"end":4}"#).unwrap();
        assert_eq!(parsed, CRDTOperation::delete(1, 4));
    }

    #[test]
    fn test_noop_detection() {
        assert!(CRDTOperation::insert(0, "").is_noop());
        assert!(CRDTOperation::delete(2, 2).is_noop());
        assert!(!CRDTOperation::delete(2, 3).is_noop());
    }
}

/**
 * Room Document
 *
 * Wraps a diamond-types `OpLog` as the single authoritative text of a
 * room. Operations arrive as character-indexed inserts and deletes; each one is
 * bounds-checked before it reaches the oplog so a bad client cannot corrupt the
 * history. Snapshots are the oplog's full binary encoding.
 */

use diamond_types::list::encoding::ENCODE_FULL;
use diamond_types::list::OpLog;
use thiserror::Error;

use crate::shared::{CRDTOperation, DocumentState};

/// Document errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("insert position {position} is past the end of the document ({len})")]
    InsertOutOfBounds { position: usize, len: usize },
    #[error("delete range {start}..{end} is outside the document ({len})")]
    DeleteOutOfBounds { start: usize, end: usize, len: usize },
    #[error("snapshot could not be decoded: {0}")]
    Decode(String),
}

/// Authoritative text of a room
pub struct TextDocument {
    oplog: OpLog,
    /// Length in chars of the tip content
    len: usize,
}

impl TextDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            oplog: OpLog::new(),
            len: 0,
        }
    }

    /// Rebuild a document from a snapshot produced by [`TextDocument::snapshot`]
    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, DocumentError> {
        let oplog = OpLog::load_from(bytes).map_err(|e| DocumentError::Decode(format!("{:?}", e)))?;
        let len = oplog.checkout_tip().content().to_string().chars().count();
        Ok(Self { oplog, len })
    }

    /// Serialize the full document history
    pub fn snapshot(&self) -> Vec<u8> {
        self.oplog.encode(ENCODE_FULL)
    }

    /// Current text
    pub fn content(&self) -> String {
        self.oplog.checkout_tip().content().to_string()
    }

    /// Length of the current text in chars
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of operations in the history
    pub fn version(&self) -> usize {
        self.oplog.len()
    }

    pub fn state(&self) -> DocumentState {
        DocumentState::with_content(self.content(), self.version())
    }

    /// Apply a batch of operations on behalf of `agent`.
    ///
    /// Operations are applied in order, each against the result of the previous
    /// one. The whole batch is checked before anything is applied, so an invalid
    /// operation leaves the document untouched. Returns whether anything changed.
    pub fn apply(&mut self, agent: &str, operations: &[CRDTOperation]) -> Result<bool, DocumentError> {
        let mut len = self.len;
        for op in operations.iter().filter(|op| !op.is_noop()) {
            len = Self::check(op, len)?;
        }

        let agent_id = self.oplog.get_or_create_agent_id(agent);
        let mut changed = false;
        for op in operations.iter().filter(|op| !op.is_noop()) {
            match op {
                CRDTOperation::Insert { position, text } => {
                    self.oplog.add_insert(agent_id, *position, text);
                }
                CRDTOperation::Delete { start, end } => {
                    self.oplog.add_delete_without_content(agent_id, *start..*end);
                }
            }
            changed = true;
        }
        self.len = len;

        Ok(changed)
    }

    /// Length after applying `op` to a document of `len` chars
    fn check(op: &CRDTOperation, len: usize) -> Result<usize, DocumentError> {
        match op {
            CRDTOperation::Insert { position, text } => {
                if *position > len {
                    return Err(DocumentError::InsertOutOfBounds {
                        position: *position,
                        len,
                    });
                }
                Ok(len + text.chars().count())
            }
            CRDTOperation::Delete { start, end } => {
                if *end > len {
                    return Err(DocumentError::DeleteOutOfBounds {
                        start: *start,
                        end: *end,
                        len,
                    });
                }
                Ok(len - (end - start))
            }
        }
    }
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDocument")
            .field("len", &self.len)
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_delete() {
        let mut doc = TextDocument::new();
        assert!(doc.apply("a", &[CRDTOperation::insert(0, "hello world")]).unwrap());
        assert!(doc.apply("a", &[CRDTOperation::delete(5, 11)]).unwrap());
        assert_eq!(doc.content(), "hello");
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn test_positions_are_chars() {
        let mut doc = TextDocument::new();
        doc.apply("a", &[CRDTOperation::insert(0, "héllo")]).unwrap();
        doc.apply("a", &[CRDTOperation::insert(5, "!")]).unwrap();
        assert_eq!(doc.content(), "héllo!");
        assert_eq!(doc.len(), 6);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut doc = TextDocument::new();
        doc.apply("a", &[CRDTOperation::insert(0, "abc")]).unwrap();

        assert_eq!(
            doc.apply("a", &[CRDTOperation::insert(4, "x")]),
            Err(DocumentError::InsertOutOfBounds { position: 4, len: 3 })
        );
        assert_eq!(
            doc.apply("a", &[CRDTOperation::delete(1, 9)]),
            Err(DocumentError::DeleteOutOfBounds { start: 1, end: 9, len: 3 })
        );
        assert_eq!(doc.content(), "abc");
    }

    #[test]
    fn test_invalid_batch_applies_nothing() {
        let mut doc = TextDocument::new();
        let version = doc.version();
        let batch = [CRDTOperation::insert(0, "ab"), CRDTOperation::delete(0, 5)];

        assert!(doc.apply("a", &batch).is_err());
        assert_eq!(doc.content(), "");
        assert_eq!(doc.version(), version);
    }

    #[test]
    fn test_batch_ops_see_earlier_ops() {
        let mut doc = TextDocument::new();
        let batch = [CRDTOperation::insert(0, "abc"), CRDTOperation::delete(1, 2), CRDTOperation::insert(2, "!")];
        assert!(doc.apply("a", &batch).unwrap());
        assert_eq!(doc.content(), "ac!");
    }

    #[test]
    fn test_noop_batch_reports_no_change() {
        let mut doc = TextDocument::new();
        let before = doc.version();
        assert!(!doc.apply("a", &[CRDTOperation::insert(0, ""), CRDTOperation::delete(0, 0)]).unwrap());
        assert_eq!(doc.version(), before);
    }

    #[test]
    fn test_snapshot_restores_content() {
        let mut doc = TextDocument::new();
        doc.apply("a", &[CRDTOperation::insert(0, "shared text")]).unwrap();
        doc.apply("b", &[CRDTOperation::delete(0, 7)]).unwrap();

        let restored = TextDocument::from_snapshot(&doc.snapshot()).unwrap();
        assert_eq!(restored.content(), "text");
        assert_eq!(restored.len(), 4);
        assert_eq!(restored.version(), doc.version());
    }

    #[test]
    fn test_garbage_snapshot_is_decode_error() {
        assert!(matches!(
            TextDocument::from_snapshot(b"definitely not an oplog"),
            Err(DocumentError::Decode(_))
        ));
    }
}

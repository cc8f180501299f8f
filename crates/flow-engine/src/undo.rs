//! Undo/redo system using compressed snapshots
//!
//! Diagram history is kept as compressed immutable snapshots rather than a
//! command log: there is no inverse operation to implement for each graph
//! mutation, any combination of edits is captured, and zstd keeps the
//! snapshots small.

use std::collections::VecDeque;

use crate::diagram::Diagram;
use crate::error::{FlowError, Result};

/// Undo/redo stack of compressed diagram snapshots
pub struct UndoStack {
    /// Compressed diagram states (zstd)
    snapshots: VecDeque<Vec<u8>>,
    /// Current position in the stack
    current: usize,
    /// Maximum number of snapshots to keep
    max_snapshots: usize,
}

impl UndoStack {
    /// Create a new undo stack with the specified maximum size
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            current: 0,
            max_snapshots: max_snapshots.max(1), // At least 1 snapshot
        }
    }

    /// Push a new snapshot onto the stack
    ///
    /// This truncates any redo history (snapshots after current position).
    pub fn push(&mut self, diagram: &Diagram) -> Result<()> {
        let json = serde_json::to_vec(diagram)?;
        let compressed =
            zstd::encode_all(&json[..], 3).map_err(|e| FlowError::Compression(e.to_string()))?;

        // Truncate any redo history
        while self.snapshots.len() > self.current + 1 {
            self.snapshots.pop_back();
        }

        // Add new snapshot
        self.snapshots.push_back(compressed);
        self.current = self.snapshots.len() - 1;

        // Trim old snapshots if over limit
        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
            if self.current > 0 {
                self.current -= 1;
            }
        }

        Ok(())
    }

    /// Undo: move back one snapshot
    ///
    /// Returns the previous diagram state, or None if at the beginning.
    pub fn undo(&mut self) -> Option<Result<Diagram>> {
        if self.current > 0 {
            self.current -= 1;
            Some(self.decompress(self.current))
        } else {
            None
        }
    }

    /// Redo: move forward one snapshot
    ///
    /// Returns the next diagram state, or None if at the end.
    pub fn redo(&mut self) -> Option<Result<Diagram>> {
        if self.current + 1 < self.snapshots.len() {
            self.current += 1;
            Some(self.decompress(self.current))
        } else {
            None
        }
    }

    /// Get the current diagram state without modifying the stack
    pub fn current(&self) -> Option<Result<Diagram>> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.decompress(self.current))
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.snapshots.len()
    }

    /// Get the number of snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Clear all snapshots
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.current = 0;
    }

    /// Get the total compressed size of all snapshots
    pub fn compressed_size(&self) -> usize {
        self.snapshots.iter().map(|s| s.len()).sum()
    }

    /// Decompress a snapshot at the given index
    fn decompress(&self, index: usize) -> Result<Diagram> {
        let compressed = &self.snapshots[index];
        let json =
            zstd::decode_all(&compressed[..]).map_err(|e| FlowError::Compression(e.to_string()))?;
        let diagram: Diagram = serde_json::from_slice(&json)?;
        Ok(diagram)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(100) // Default to 100 snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_diagram(name: &str) -> Diagram {
        Diagram {
            name: name.to_string(),
            nodes: vec![json!({"id": "node-1", "type": "data-source", "label": name})],
            edges: vec![],
        }
    }

    #[test]
    fn test_push_and_undo() {
        let mut stack = UndoStack::new(10);

        stack.push(&make_diagram("first")).unwrap();
        stack.push(&make_diagram("second")).unwrap();
        stack.push(&make_diagram("third")).unwrap();

        // Should be at "third"
        let current = stack.current().unwrap().unwrap();
        assert_eq!(current.name, "third");

        // Undo to "second"
        let undone = stack.undo().unwrap().unwrap();
        assert_eq!(undone.name, "second");

        // Undo to "first"
        let undone = stack.undo().unwrap().unwrap();
        assert_eq!(undone.name, "first");

        // Can't undo further
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_redo() {
        let mut stack = UndoStack::new(10);

        stack.push(&make_diagram("first")).unwrap();
        stack.push(&make_diagram("second")).unwrap();

        stack.undo(); // Go to "first"

        // Redo to "second"
        let redone = stack.redo().unwrap().unwrap();
        assert_eq!(redone.name, "second");

        // Can't redo further
        assert!(stack.redo().is_none());
    }

    #[test]
    fn test_push_truncates_redo() {
        let mut stack = UndoStack::new(10);

        stack.push(&make_diagram("first")).unwrap();
        stack.push(&make_diagram("second")).unwrap();
        stack.undo(); // Go to "first"

        // Push new diagram - should truncate "second"
        stack.push(&make_diagram("third")).unwrap();

        // Can't redo anymore
        assert!(!stack.can_redo());

        // Current is "third"
        let current = stack.current().unwrap().unwrap();
        assert_eq!(current.name, "third");
    }

    #[test]
    fn test_max_snapshots() {
        let mut stack = UndoStack::new(3);

        for i in 0..5 {
            stack.push(&make_diagram(&format!("diagram_{}", i))).unwrap();
        }

        // Should only have 3 snapshots
        assert_eq!(stack.len(), 3);

        // Should have diagram_2, diagram_3, diagram_4 (oldest trimmed)
        let current = stack.current().unwrap().unwrap();
        assert_eq!(current.name, "diagram_4");

        // Can only undo twice (to diagram_3 and diagram_2)
        stack.undo();
        stack.undo();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_can_undo_redo() {
        let mut stack = UndoStack::new(10);

        assert!(!stack.can_undo());
        assert!(!stack.can_redo());

        stack.push(&make_diagram("first")).unwrap();
        assert!(!stack.can_undo()); // Only one snapshot
        assert!(!stack.can_redo());

        stack.push(&make_diagram("second")).unwrap();
        assert!(stack.can_undo());
        assert!(!stack.can_redo());

        stack.undo();
        assert!(!stack.can_undo());
        assert!(stack.can_redo());
    }

    #[test]
    fn test_clear_and_size() {
        let mut stack = UndoStack::new(10);
        stack.push(&make_diagram("first")).unwrap();
        assert!(!stack.is_empty());
        assert!(stack.compressed_size() > 0);

        stack.clear();
        assert!(stack.is_empty());
        assert!(stack.current().is_none());
    }
}

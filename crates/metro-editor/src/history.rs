//! Undo history of whole-document snapshots.
//!
//! Every committed mutation pushes a deep copy of the document as it was
//! before the change. Undo pops the latest snapshot and swaps it in; there
//! is no redo. The stack is bounded and evicts its oldest entry first.
//!
//! Drag gestures use **batching**: the document is captured when the
//! gesture starts and pushed once when it ends, and only if the gesture
//! actually changed something.

use metro_core::MapDocument;
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_DEPTH: usize = 50;

pub struct History {
    snapshots: VecDeque<MapDocument>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Document captured at the start of the outermost batch.
    batch_snapshot: Option<MapDocument>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(max_depth),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
        }
    }

    /// Push the pre-mutation document. Ignored while batching; the batch
    /// snapshot covers the whole gesture.
    pub fn record(&mut self, before: MapDocument) {
        if self.batch_depth > 0 {
            return;
        }
        self.push(before);
    }

    fn push(&mut self, doc: MapDocument) {
        self.snapshots.push_back(doc);
        while self.snapshots.len() > self.max_depth {
            self.snapshots.pop_front();
        }
    }

    pub fn begin_batch(&mut self, current: &MapDocument) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(current.clone());
        }
        self.batch_depth += 1;
    }

    /// Close a batch. When the outermost batch closes and the document
    /// differs from the captured one, one snapshot is pushed.
    /// Returns whether an entry was added.
    pub fn end_batch(&mut self, current: &MapDocument) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }
        match self.batch_snapshot.take() {
            Some(before) if before != *current => {
                self.push(before);
                true
            }
            _ => false,
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    pub fn pop(&mut self) -> Option<MapDocument> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> MapDocument {
        let mut d = MapDocument::skeleton();
        d.info.name = Some(name.into());
        d
    }

    #[test]
    fn evicts_oldest_first() {
        let mut h = History::new(3);
        for i in 0..5 {
            h.record(doc(&i.to_string()));
        }
        assert_eq!(h.len(), 3);
        let names: Vec<_> = std::iter::from_fn(|| h.pop())
            .map(|d| d.info.name.unwrap_or_default())
            .collect();
        assert_eq!(names, ["4", "3", "2"]);
    }

    #[test]
    fn batch_pushes_once_when_changed() {
        let mut h = History::default();
        let start = doc("start");
        h.begin_batch(&start);
        h.record(doc("ignored"));
        h.begin_batch(&start);
        assert!(!h.end_batch(&doc("mid")));
        assert!(h.end_batch(&doc("end")));
        assert_eq!(h.len(), 1);
        assert_eq!(h.pop().and_then(|d| d.info.name), Some("start".into()));
    }

    #[test]
    fn unchanged_batch_adds_nothing() {
        let mut h = History::default();
        let d = doc("same");
        h.begin_batch(&d);
        assert!(!h.end_batch(&d));
        assert!(h.is_empty());
        assert!(!h.end_batch(&d), "unbalanced end is ignored");
    }
}

//! Bounded undo/redo over whole-collection snapshots.
//!
//! Every mutation records the collection as it was *before* the change.
//! Undo and redo compare the stack top with the current state and drop
//! entries that would restore nothing.

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct HistoryManager<S> {
    undo_stack: Vec<S>,
    redo_stack: Vec<S>,
    max_entries: usize,
}

impl<S: Clone + PartialEq> Default for HistoryManager<S> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<S: Clone + PartialEq> HistoryManager<S> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the state before a mutation. Clears redo.
    pub fn snapshot_before_change(&mut self, current: &S) {
        push_bounded(&mut self.undo_stack, current.clone(), self.max_entries);
        self.redo_stack.clear();
    }

    /// State to restore, if any. A top entry equal to `current` is
    /// discarded without restoring.
    pub fn undo(&mut self, current: &S) -> Option<S> {
        let top = self.undo_stack.pop()?;
        if &top == current {
            return None;
        }
        push_bounded(&mut self.redo_stack, current.clone(), self.max_entries);
        Some(top)
    }

    pub fn redo(&mut self, current: &S) -> Option<S> {
        let top = self.redo_stack.pop()?;
        if &top == current {
            return None;
        }
        push_bounded(&mut self.undo_stack, current.clone(), self.max_entries);
        Some(top)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn push_bounded<S>(stack: &mut Vec<S>, entry: S, max: usize) {
    stack.push(entry);
    if stack.len() > max {
        stack.remove(0);
    }
}

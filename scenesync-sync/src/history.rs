//! Linear undo/redo history of rendered states.
//!
//! Entries are ordered oldest first; the cursor points at the entry whose
//! image is on screen. Pushing after an undo discards the redo tail.

use std::collections::VecDeque;

use scenesync_client::PersistedHistory;
use scenesync_core::HistoryEntry;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct HistoryController {
    entries: VecDeque<HistoryEntry>,
    /// `None` exactly when `entries` is empty.
    cursor: Option<usize>,
    capacity: usize,
}

impl Default for HistoryController {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryController {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|idx| self.entries.get(idx))
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(idx) if idx + 1 < self.entries.len())
    }

    /// Record a new state: truncate after the cursor, append, advance.
    pub fn push(&mut self, entry: HistoryEntry) {
        let keep = self.cursor.map_or(0, |idx| idx + 1);
        let discarded = self.entries.len().saturating_sub(keep);
        if discarded > 0 {
            tracing::debug!(discarded, "redo branch discarded");
        }
        self.entries.truncate(keep);
        self.entries.push_back(entry);
        self.cursor = Some(self.entries.len() - 1);
        self.enforce_capacity();
    }

    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        let idx = self.cursor? - 1;
        self.cursor = Some(idx);
        self.entries.get(idx)
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        let idx = self.cursor? + 1;
        self.cursor = Some(idx);
        self.entries.get(idx)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            self.cursor = self.cursor.map(|idx| idx.saturating_sub(1));
        }
    }

    // -----------------------------------------------------------------------
    // Server-side reconciliation
    // -----------------------------------------------------------------------

    pub fn to_persisted(&self) -> PersistedHistory {
        PersistedHistory {
            entries: self.entries.iter().cloned().collect(),
            cursor: self.cursor,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Rebuild from server state. Flags are derived locally from entries and
    /// cursor; the server's flags are only compared and logged.
    pub fn from_persisted(state: PersistedHistory, capacity: usize) -> Self {
        let PersistedHistory {
            entries,
            cursor,
            can_undo,
            can_redo,
        } = state;

        let mut history = Self::new(capacity);
        history.entries = entries.into();
        history.cursor = match (history.entries.len(), cursor) {
            (0, _) => None,
            (len, None) => Some(len - 1),
            (len, Some(idx)) if idx >= len => {
                tracing::warn!(cursor = idx, entries = len, "persisted cursor out of range; clamping");
                Some(len - 1)
            }
            (_, Some(idx)) => Some(idx),
        };
        history.enforce_capacity();

        if history.can_undo() != can_undo || history.can_redo() != can_redo {
            tracing::warn!(
                server_can_undo = can_undo,
                server_can_redo = can_redo,
                local_can_undo = history.can_undo(),
                local_can_redo = history.can_redo(),
                "persisted undo/redo flags disagree with entries; using local values",
            );
        }
        history
    }
}

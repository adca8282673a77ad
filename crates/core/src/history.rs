//! Edit history: bounded past, present and future of recorded actions.
//!
//! Each entry holds the manager state captured right after its action, so
//! stepping back or forward is a matter of restoring the snapshot of the
//! entry that becomes present.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document_manager::ManagerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Baseline entry for a freshly opened or created document.
    Open,
    AddPage,
    DeletePage,
    RotatePage,
    ReorderPages,
    Merge,
    AddElement,
    UpdateElement,
    DeleteElement,
    Paste,
    Cut,
    AddWatermark,
    RemoveWatermark,
    SetMetadata,
    RestoreOriginal,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::AddPage => "Add Page",
            Self::DeletePage => "Delete Page",
            Self::RotatePage => "Rotate Page",
            Self::ReorderPages => "Reorder Pages",
            Self::Merge => "Merge Document",
            Self::AddElement => "Add Element",
            Self::UpdateElement => "Edit Element",
            Self::DeleteElement => "Delete",
            Self::Paste => "Paste",
            Self::Cut => "Cut",
            Self::AddWatermark => "Add Watermark",
            Self::RemoveWatermark => "Remove Watermark",
            Self::SetMetadata => "Edit Properties",
            Self::RestoreOriginal => "Revert to Original",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub kind: ActionKind,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    /// What changed, for display and logging.
    pub detail: serde_json::Value,
    snapshot: Arc<ManagerSnapshot>,
}

impl HistoryEntry {
    pub fn new(kind: ActionKind, detail: serde_json::Value, snapshot: ManagerSnapshot) -> Self {
        Self { kind, label: kind.label().to_owned(), timestamp: Utc::now(), detail, snapshot: Arc::new(snapshot) }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn snapshot(&self) -> &ManagerSnapshot {
        &self.snapshot
    }
}

#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<HistoryEntry>,
    present: Option<HistoryEntry>,
    future: VecDeque<HistoryEntry>,
    limit: usize,
}

impl History {
    /// `limit` bounds the number of undoable steps; it is at least one.
    pub fn new(limit: usize) -> Self {
        Self { past: VecDeque::new(), present: None, future: VecDeque::new(), limit: limit.max(1) }
    }

    /// Forgets everything and starts over from `baseline`.
    pub fn reset(&mut self, baseline: HistoryEntry) {
        self.clear();
        self.present = Some(baseline);
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.present = None;
        self.future.clear();
    }

    /// Makes `entry` the present. The previous present becomes undoable and
    /// anything that could have been redone is dropped.
    pub fn record(&mut self, entry: HistoryEntry) {
        log::debug!("history: {}", entry.label);
        if let Some(previous) = self.present.take() {
            self.past.push_back(previous);
            while self.past.len() > self.limit {
                self.past.pop_front();
            }
        }
        self.present = Some(entry);
        self.future.clear();
    }

    /// Steps back one entry and returns the new present. Does nothing when
    /// there is no past.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        let previous = self.past.pop_back()?;
        if let Some(current) = self.present.replace(previous) {
            self.future.push_front(current);
        }
        self.present.as_ref()
    }

    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let next = self.future.pop_front()?;
        if let Some(current) = self.present.replace(next) {
            self.past.push_back(current);
        }
        self.present.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Label of the action `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.present.as_ref().filter(|_| self.can_undo()).map(|entry| entry.label.as_str())
    }

    /// Label of the action `redo` would reapply.
    pub fn redo_label(&self) -> Option<&str> {
        self.future.front().map(|entry| entry.label.as_str())
    }

    pub fn present(&self) -> Option<&HistoryEntry> {
        self.present.as_ref()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

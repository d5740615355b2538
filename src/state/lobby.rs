//! Matchmaking queue.
//!
//! Anonymous players wait here in arrival order until someone else joins.
//! The queue is the only ordering key: the oldest entry is always paired
//! first.

use std::collections::VecDeque;

use super::connection::Handle;

/// A player waiting for an opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingEntry {
    /// Connection handle
    pub handle: Handle,

    /// Display name
    pub name: String,

    /// When the player started waiting
    pub queued_at: chrono::DateTime<chrono::Utc>,
}

impl WaitingEntry {
    pub fn new(handle: impl Into<Handle>, name: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            name: name.into(),
            queued_at: chrono::Utc::now(),
        }
    }
}

/// FIFO queue of waiting players.
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: VecDeque<WaitingEntry>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a player at the back of the queue.
    pub fn push(&mut self, entry: WaitingEntry) {
        self.entries.push_back(entry);
    }

    /// Take the player who has waited longest.
    pub fn pop_oldest(&mut self) -> Option<WaitingEntry> {
        self.entries.pop_front()
    }

    /// Remove a handle wherever it sits in the queue.
    ///
    /// Returns `None` if the handle was not queued.
    pub fn remove(&mut self, handle: &str) -> Option<WaitingEntry> {
        let index = self.entries.iter().position(|e| e.handle == handle)?;
        self.entries.remove(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every waiting entry, returning their handles.
    pub fn clear(&mut self) -> Vec<Handle> {
        self.entries.drain(..).map(|e| e.handle).collect()
    }
}

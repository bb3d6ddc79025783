//! Per-user scratch notes
//!
//! Notes are kept in memory only. Once a user holds more than `max_notes`
//! entries their list is wiped.

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::info;

/// In-memory notes keyed by user id
pub struct NotesStore {
    notes: Mutex<HashMap<String, Vec<String>>>,
    max_notes: usize,
}

impl NotesStore {
    /// Create a store that clears a user's notes past `max_notes`
    pub fn new(max_notes: usize) -> Self {
        Self {
            notes: Mutex::new(HashMap::new()),
            max_notes,
        }
    }

    /// Append a note; returns how many notes the user holds afterwards
    pub fn add(&self, user_id: &str, note: impl Into<String>) -> usize {
        let mut notes = self.notes.lock();
        let user_notes = notes.entry(user_id.to_string()).or_default();
        user_notes.push(note.into());

        if user_notes.len() > self.max_notes {
            info!(user_id = %user_id, cleared = user_notes.len(), "Note limit exceeded, clearing notes");
            user_notes.clear();
        }
        user_notes.len()
    }

    /// Copy of the user's notes, oldest first
    pub fn get(&self, user_id: &str) -> Vec<String> {
        self.notes.lock().get(user_id).cloned().unwrap_or_default()
    }
}

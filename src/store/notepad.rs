//! Per-user notepad persistence.
//!
//! One JSON file per user under `<data_dir>/notepads/`, holding the ordered
//! list of saved snippets. Entries have no identity beyond their 1-based
//! position, which shifts on deletion.

use crate::error::{BotError, CommandError, Result};
use std::path::PathBuf;

/// Durable store of per-user notepads.
#[derive(Debug, Clone)]
pub struct NotepadStore {
    dir: PathBuf,
}

impl NotepadStore {
    /// Create a store rooted at `<data_dir>/notepads`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: data_dir.into().join("notepads"),
        }
    }

    fn record_path(&self, user_id: u64) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    /// Load a user's notepad.
    ///
    /// A missing or corrupt record reads as empty; it is never an error. An
    /// empty record that exists on disk is a valid state distinct from no
    /// record at all, and also reads as empty.
    #[must_use]
    pub fn load(&self, user_id: u64) -> Vec<String> {
        let path = self.record_path(user_id);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(_) => return Vec::new(),
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!("corrupt notepad record at {}: {e}", path.display());
            Vec::new()
        })
    }

    /// Rewrite a user's complete notepad record.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be created or the
    /// record cannot be written.
    pub fn save(&self, user_id: u64, entries: &[String]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| BotError::Store(format!("cannot serialize notepad: {e}")))?;
        std::fs::write(self.record_path(user_id), json)?;
        Ok(())
    }

    /// Append `text` to the end of a user's notepad and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn append(&self, user_id: u64, text: impl Into<String>) -> Result<()> {
        let mut entries = self.load(user_id);
        entries.push(text.into());
        self.save(user_id, &entries)
    }

    /// Delete the entry at a 1-based index and persist.
    ///
    /// Index `0` and any index past the end fail with
    /// [`CommandError::IndexOutOfRange`], leaving the notepad untouched.
    /// Persistence failures after a successful delete are logged, not
    /// surfaced to the user.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::IndexOutOfRange`] for an invalid index.
    pub fn delete_at(
        &self,
        user_id: u64,
        one_based_index: usize,
    ) -> std::result::Result<(), CommandError> {
        let mut entries = self.load(user_id);
        if one_based_index == 0 || one_based_index > entries.len() {
            return Err(CommandError::IndexOutOfRange);
        }
        entries.remove(one_based_index - 1);
        if let Err(e) = self.save(user_id, &entries) {
            tracing::error!("failed to persist notepad for user {user_id}: {e}");
        }
        Ok(())
    }

    /// Replace a user's notepad with the empty sequence and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails.
    pub fn clear(&self, user_id: u64) -> Result<()> {
        self.save(user_id, &[])
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, NotepadStore) {
        let dir = TempDir::new().unwrap();
        let store = NotepadStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn load_missing_record_is_empty() {
        let (_dir, store) = store();
        assert!(store.load(1).is_empty());
    }

    #[test]
    fn append_then_load() {
        let (_dir, store) = store();
        store.append(1, "buy milk").unwrap();
        let entries = store.load(1);
        assert_eq!(entries, vec!["buy milk".to_owned()]);

        store.append(1, "walk dog").unwrap();
        let entries = store.load(1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.last().unwrap(), "walk dog");
    }

    #[test]
    fn notepads_are_per_user() {
        let (_dir, store) = store();
        store.append(1, "mine").unwrap();
        store.append(2, "theirs").unwrap();
        assert_eq!(store.load(1), vec!["mine".to_owned()]);
        assert_eq!(store.load(2), vec!["theirs".to_owned()]);
    }

    #[test]
    fn delete_shifts_later_entries() {
        let (_dir, store) = store();
        store.append(1, "a").unwrap();
        store.append(1, "b").unwrap();
        store.delete_at(1, 1).unwrap();
        assert_eq!(store.load(1), vec!["b".to_owned()]);
    }

    #[test]
    fn delete_out_of_range_leaves_notepad_unchanged() {
        let (_dir, store) = store();
        store.append(1, "a").unwrap();
        store.append(1, "b").unwrap();
        assert_eq!(store.delete_at(1, 5), Err(CommandError::IndexOutOfRange));
        assert_eq!(store.delete_at(1, 0), Err(CommandError::IndexOutOfRange));
        assert_eq!(store.load(1).len(), 2);
    }

    #[test]
    fn clear_persists_an_empty_record() {
        let (_dir, store) = store();
        store.append(1, "a").unwrap();
        store.clear(1).unwrap();
        assert!(store.load(1).is_empty());
        // The record still exists on disk, holding an empty list.
        let path = store.record_path(1);
        assert!(path.exists());
        let entries: Vec<String> =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn corrupt_record_reads_as_empty() {
        let (_dir, store) = store();
        store.append(1, "a").unwrap();
        std::fs::write(store.record_path(1), b"not json").unwrap();
        assert!(store.load(1).is_empty());
    }
}

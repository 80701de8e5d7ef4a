//! Process-wide durable registry of pending reminders.
//!
//! The full set lives in memory behind a mutex and is rewritten to
//! `<data_dir>/timers.json` on every addition. Two commands finishing at the
//! same instant must not lose each other's write, so all mutation goes
//! through the lock.

use crate::error::{BotError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

/// A pending reminder: when to fire, and which message to reply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Absolute UTC instant the reminder is due.
    pub fire_at: DateTime<Utc>,
    /// Chat message the reminder replies to.
    pub message_id: u64,
}

/// Durable set of pending reminders.
#[derive(Debug)]
pub struct TimerRegistry {
    path: PathBuf,
    timers: Mutex<Vec<TimerRecord>>,
}

impl TimerRegistry {
    /// Create a registry persisted at `<data_dir>/timers.json`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("timers.json"),
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Append a record to the in-memory set and rewrite the full durable set.
    ///
    /// # Errors
    ///
    /// Returns an error if the set cannot be serialized or written. The
    /// in-memory set keeps the record either way, so an armed timer still
    /// fires in this process even when the disk write failed.
    pub fn add_and_persist(&self, record: TimerRecord) -> Result<()> {
        let snapshot = {
            let mut timers = self
                .timers
                .lock()
                .map_err(|_| BotError::Store("timer registry lock poisoned".to_owned()))?;
            timers.push(record);
            timers.clone()
        };
        self.persist(&snapshot)
    }

    /// Read the durable set, drop anything already due, and adopt the rest.
    ///
    /// A missing, unreadable, or invalid file yields no pending timers;
    /// startup never fails on registry state. A record whose `fire_at` is at
    /// or before `now` is dropped, never fired retroactively.
    pub fn reload_at_startup(&self, now: DateTime<Utc>) -> Vec<TimerRecord> {
        let pending = self.read_pending(now);
        if let Ok(mut timers) = self.timers.lock() {
            *timers = pending.clone();
        }
        pending
    }

    /// Current in-memory set (for diagnostics and tests).
    #[must_use]
    pub fn pending(&self) -> Vec<TimerRecord> {
        self.timers.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn read_pending(&self, now: DateTime<Utc>) -> Vec<TimerRecord> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(_) => return Vec::new(),
        };

        let stored: Vec<TimerRecord> = match serde_json::from_slice(&bytes) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("invalid timer registry at {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        let (pending, expired): (Vec<_>, Vec<_>) =
            stored.into_iter().partition(|t| t.fire_at > now);
        if !expired.is_empty() {
            tracing::info!("dropping {} expired timer(s) at reload", expired.len());
        }
        pending
    }

    fn persist(&self, timers: &[TimerRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(timers)
            .map_err(|e| BotError::Store(format!("cannot serialize timer registry: {e}")))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn registry() -> (TempDir, TimerRegistry) {
        let dir = TempDir::new().unwrap();
        let registry = TimerRegistry::new(dir.path());
        (dir, registry)
    }

    #[test]
    fn add_and_persist_round_trips_through_a_fresh_registry() {
        let (dir, registry) = registry();
        let record = TimerRecord {
            fire_at: Utc::now() + TimeDelta::hours(1),
            message_id: 42,
        };
        registry.add_and_persist(record).unwrap();

        let fresh = TimerRegistry::new(dir.path());
        let pending = fresh.reload_at_startup(Utc::now());
        assert_eq!(pending, vec![record]);
        assert_eq!(fresh.pending(), vec![record]);
    }

    #[test]
    fn reload_drops_already_due_records() {
        let (dir, registry) = registry();
        let now = Utc::now();
        let expired = TimerRecord {
            fire_at: now - TimeDelta::seconds(1),
            message_id: 1,
        };
        let future = TimerRecord {
            fire_at: now + TimeDelta::hours(1),
            message_id: 2,
        };
        registry.add_and_persist(expired).unwrap();
        registry.add_and_persist(future).unwrap();

        let fresh = TimerRegistry::new(dir.path());
        let pending = fresh.reload_at_startup(now);
        assert_eq!(pending, vec![future]);
    }

    #[test]
    fn reload_with_missing_file_is_empty() {
        let (_dir, registry) = registry();
        assert!(registry.reload_at_startup(Utc::now()).is_empty());
    }

    #[test]
    fn reload_with_invalid_contents_is_empty() {
        let (dir, registry) = registry();
        std::fs::write(dir.path().join("timers.json"), b"{\"not\": \"a list\"}").unwrap();
        assert!(registry.reload_at_startup(Utc::now()).is_empty());
    }

    #[test]
    fn additions_rewrite_the_whole_set() {
        let (dir, registry) = registry();
        let now = Utc::now();
        for id in 0..3 {
            registry
                .add_and_persist(TimerRecord {
                    fire_at: now + TimeDelta::minutes(5 + id as i64),
                    message_id: id,
                })
                .unwrap();
        }
        let stored: Vec<TimerRecord> =
            serde_json::from_slice(&std::fs::read(dir.path().join("timers.json")).unwrap())
                .unwrap();
        assert_eq!(stored.len(), 3);
    }
}

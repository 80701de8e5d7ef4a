//! Durable state: per-user notepads and the process-wide timer registry.
//!
//! Both stores follow the same discipline: every mutation rewrites the
//! complete record, and an unreadable record degrades to the empty default
//! instead of failing.

mod notepad;
mod timers;

pub use notepad::NotepadStore;
pub use timers::{TimerRecord, TimerRegistry};

//! Notepad: a Stack Exchange chat bot with per-user notepads and reminders.
//!
//! # Architecture
//!
//! Inbound chat events flow through a single serial dispatch loop:
//! transport → [`engine::CommandEngine`] → notepad/timer stores → one
//! outbound message (or none). Reminders are one-shot tokio tasks armed by
//! [`scheduler::ReminderScheduler`] and persisted in
//! [`store::TimerRegistry`], which is reloaded at startup so outstanding
//! reminders survive a restart (expired ones are dropped, never fired late).

pub mod chat;
pub mod config;
pub mod duration;
pub mod engine;
pub mod error;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod transport;

pub use chat::{ChatClient, InboundMessage, MessageRef};
pub use config::BotConfig;
pub use engine::{CommandEngine, EngineSignal};
pub use error::{BotError, CommandError, Result};
pub use scheduler::ReminderScheduler;
pub use store::{NotepadStore, TimerRecord, TimerRegistry};

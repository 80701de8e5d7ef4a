//! One-shot reminder scheduling and startup recovery.
//!
//! Each armed reminder is its own spawned task that sleeps until the due
//! instant and posts a threaded reply to the target message. Timers share no
//! lock with command processing; the registry serializes its own writes.
//! There is no cancellation: a snooze arms an additional, independent timer.

use crate::chat::ChatClient;
use crate::duration::DurationSpec;
use crate::error::{BotError, Result};
use crate::store::{TimerRecord, TimerRegistry};
use chrono::{DateTime, TimeDelta, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Fixed reply posted when a reminder fires. Snooze relies on finding this
/// message in the reply chain, threaded under the original.
pub const DUE_MESSAGE: &str = "Reminder for this message is due.";

/// Schedules one-shot reminder deliveries and persists them for recovery.
pub struct ReminderScheduler {
    registry: Arc<TimerRegistry>,
    chat: Arc<dyn ChatClient>,
}

impl ReminderScheduler {
    pub fn new(registry: Arc<TimerRegistry>, chat: Arc<dyn ChatClient>) -> Self {
        Self { registry, chat }
    }

    /// Run `deliver` once after `delay`, on its own task.
    ///
    /// The due instant is fixed here, not at the task's first poll, so the
    /// delay is measured from the call and never drifts by scheduling lag.
    pub fn schedule(&self, delay: Duration, deliver: impl Future<Output = ()> + Send + 'static) {
        let due = tokio::time::Instant::now() + delay;
        tokio::spawn(async move {
            tokio::time::sleep_until(due).await;
            deliver.await;
        });
    }

    /// Persist a new reminder on `message_id` and arm its timer.
    ///
    /// # Errors
    ///
    /// Returns an error when the due instant cannot be represented or the
    /// registry write fails. The timer is only armed after a successful
    /// persist, so a reminder never fires without surviving a restart first.
    pub fn add_reminder(&self, spec: &DurationSpec, message_id: u64) -> Result<()> {
        let delay = spec.total();
        let delta = TimeDelta::from_std(delay)
            .map_err(|e| BotError::Scheduler(format!("duration out of range: {e}")))?;
        let record = TimerRecord {
            fire_at: Utc::now() + delta,
            message_id,
        };
        self.registry.add_and_persist(record)?;

        tracing::info!("reminder armed for message {message_id} in {spec}");
        self.schedule(delay, Self::deliver(Arc::clone(&self.chat), message_id));
        Ok(())
    }

    /// Re-arm reminders reloaded from the registry at startup.
    ///
    /// A record whose target message can no longer be resolved is logged and
    /// dropped; recovery never fails.
    pub async fn rearm_pending(&self, records: &[TimerRecord], now: DateTime<Utc>) {
        for record in records {
            match self.chat.resolve(record.message_id).await {
                Ok(message) => {
                    let delay = (record.fire_at - now).to_std().unwrap_or(Duration::ZERO);
                    self.schedule(delay, Self::deliver(Arc::clone(&self.chat), message.id));
                    tracing::info!(
                        "re-armed reminder for message {} due at {}",
                        message.id,
                        record.fire_at
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "dropping reminder for unresolvable message {}: {e}",
                        record.message_id
                    );
                }
            }
        }
    }

    async fn deliver(chat: Arc<dyn ChatClient>, message_id: u64) {
        if let Err(e) = chat.reply(message_id, DUE_MESSAGE).await {
            tracing::warn!("reminder delivery to message {message_id} failed: {e}");
        }
    }
}

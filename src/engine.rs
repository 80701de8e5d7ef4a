//! Command dispatch: the state machine behind every inbound chat event.
//!
//! One event is handled fully before the next begins, which keeps
//! read-modify-write on a user's notepad record race-free without locks.
//! Reserved control phrases short-circuit before notepad dispatch; notepad
//! verbs take exactly one branch each.

use crate::chat::{ChatClient, InboundMessage};
use crate::config::BotConfig;
use crate::duration::{self, DurationSpec};
use crate::error::{BotError, CommandError, DurationError};
use crate::report;
use crate::scheduler::ReminderScheduler;
use crate::store::NotepadStore;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Control-phrase outcome that must be handled by the process, not the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSignal {
    /// `reboot notepad`: exit so the supervisor restarts the bot.
    Reboot,
    /// `update notepad`: pull the latest revision, then restart.
    Update,
}

/// Snooze without an argument defaults to five minutes.
const SNOOZE_DEFAULT: DurationSpec = DurationSpec {
    weeks: 0,
    days: 0,
    hours: 0,
    minutes: 5,
};

/// Emoji that trigger the train easter egg.
const TRAINS: [&str; 3] = ["🚂", "🚆", "🚄"];

const HELP_MESSAGE: &str = "    add `message`:        Add `message` to your notepad\n    \
    rm  `idx`:            Delete the message at `idx`\n    \
    rma:                  Clear your notepad\n    \
    show:                 Show your messages\n    \
    remindme `m` [...]:   Reminds you of this message in `m` minutes\n    \
    snooze [`m`]:         Re-schedules a delivered reminder (default 5m)\n    \
    reboot notepad:       Reboot this bot";

/// A failure inside a command branch.
///
/// `User` failures render as their fixed reply text; `Internal` failures are
/// logged in full and rendered generically. Neither crashes the event loop.
#[derive(Debug)]
enum DispatchError {
    User(CommandError),
    Internal(BotError),
}

impl From<CommandError> for DispatchError {
    fn from(e: CommandError) -> Self {
        Self::User(e)
    }
}

impl From<DurationError> for DispatchError {
    fn from(e: DurationError) -> Self {
        Self::User(CommandError::InvalidDuration(e))
    }
}

impl From<BotError> for DispatchError {
    fn from(e: BotError) -> Self {
        Self::Internal(e)
    }
}

/// The command state machine.
pub struct CommandEngine {
    config: BotConfig,
    bot_user_id: u64,
    store: NotepadStore,
    scheduler: ReminderScheduler,
    chat: Arc<dyn ChatClient>,
    http: reqwest::Client,
}

impl CommandEngine {
    pub fn new(
        config: BotConfig,
        bot_user_id: u64,
        store: NotepadStore,
        scheduler: ReminderScheduler,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            config,
            bot_user_id,
            store,
            scheduler,
            chat,
            http: reqwest::Client::new(),
        }
    }

    /// Process inbound events serially until the stream ends or a control
    /// phrase asks for a restart.
    pub async fn run(&self, mut events: mpsc::Receiver<InboundMessage>) -> Option<EngineSignal> {
        while let Some(event) = events.recv().await {
            if let Some(signal) = self.handle_event(&event).await {
                return Some(signal);
            }
        }
        None
    }

    /// Handle one inbound event. Returns a signal only for restart phrases.
    pub async fn handle_event(&self, event: &InboundMessage) -> Option<EngineSignal> {
        if event.room_id != self.config.room_id {
            return None;
        }

        if TRAINS.contains(&event.content.trim()) {
            self.send(&format!("[🚃]({})", self.config.project_url)).await;
            return None;
        }

        if event.target_user_id != Some(self.bot_user_id) {
            return None;
        }

        let command = strip_mention(&event.content);
        if command.is_empty() {
            return None;
        }

        // Reserved control phrases short-circuit before notepad dispatch.
        match command.to_lowercase().as_str() {
            "reboot notepad" => return Some(EngineSignal::Reboot),
            "update notepad" => return Some(EngineSignal::Update),
            "help" => {
                self.send("Try `commands <botname>`, e.g. `commands notepad`.")
                    .await;
                return None;
            }
            "a" | "alive" => {
                self.send("[notepad] Yes.").await;
                return None;
            }
            "commands" => {
                self.send("[notepad] Try `commands notepad`").await;
                return None;
            }
            "commands notepad" => {
                self.send(HELP_MESSAGE).await;
                return None;
            }
            _ => {}
        }

        match self.dispatch(event, &command).await {
            Ok(Some(reply)) => self.send(&reply).await,
            Ok(None) => {}
            Err(DispatchError::User(e)) => self.send(&e.to_string()).await,
            Err(DispatchError::Internal(e)) => {
                tracing::error!("command `{command}` from user {} failed: {e}", event.sender_id);
                self.send(&format!("Error occurred: {e}")).await;
            }
        }
        None
    }

    /// Single-branch verb dispatch. Returns the reply to post, if any.
    async fn dispatch(
        &self,
        event: &InboundMessage,
        command: &str,
    ) -> Result<Option<String>, DispatchError> {
        let words: Vec<&str> = command.split_whitespace().collect();
        let Some(verb) = words.first() else {
            return Ok(None);
        };
        let user = event.sender_id;

        let reply = match verb.to_lowercase().as_str() {
            "add" => {
                self.store.append(user, words[1..].join(" "))?;
                Some("Added message to your notepad.".to_owned())
            }
            "rm" => {
                let index: usize = words
                    .get(1)
                    .and_then(|w| w.parse().ok())
                    .ok_or(CommandError::IndexOutOfRange)?;
                self.store.delete_at(user, index)?;
                Some("Message deleted.".to_owned())
            }
            "rma" => {
                self.store.clear(user)?;
                Some("All messages deleted.".to_owned())
            }
            // show never reaches the trailing persist.
            "show" => return self.show(user).await.map(Some),
            "remindme" => {
                let arg = words.get(1).ok_or(CommandError::MissingDuration)?;
                let spec = duration::parse(arg)?;
                self.scheduler.add_reminder(&spec, event.message_id)?;
                Some(format!("I will remind you of this message in {spec}."))
            }
            "snooze" => {
                let spec = match words.get(1) {
                    Some(arg) => duration::parse(arg)?,
                    None => SNOOZE_DEFAULT,
                };
                let original_id = self.snooze_target(event).await?;
                self.scheduler.add_reminder(&spec, original_id)?;
                Some(format!("Snoozed, I will remind you again in {spec}."))
            }
            // Unrecognized verbs perform no action but still fall through to
            // the persist below.
            _ => None,
        };

        // Whole-record rewrite at the end of every handled command, even when
        // nothing changed.
        let entries = self.store.load(user);
        if let Err(e) = self.store.save(user, &entries) {
            tracing::warn!("post-command persist for user {user} failed: {e}");
        }

        Ok(reply)
    }

    /// Walk the reply chain for `snooze` and return the original message ID.
    ///
    /// The invoking message must reply to a bot reminder-delivery message,
    /// which must itself reply to the original; the original's author must be
    /// the invoking user. At most two resolve hops.
    async fn snooze_target(&self, event: &InboundMessage) -> Result<u64, DispatchError> {
        let delivery_id = event.parent_id.ok_or(CommandError::BrokenReplyChain)?;
        let delivery = self
            .chat
            .resolve(delivery_id)
            .await
            .map_err(|_| CommandError::BrokenReplyChain)?;
        if delivery.author_id != self.bot_user_id {
            return Err(CommandError::BrokenReplyChain.into());
        }

        let original_id = delivery.parent_id.ok_or(CommandError::BrokenReplyChain)?;
        let original = self
            .chat
            .resolve(original_id)
            .await
            .map_err(|_| CommandError::BrokenReplyChain)?;
        if original.author_id != event.sender_id {
            return Err(CommandError::OwnershipMismatch.into());
        }

        Ok(original.id)
    }

    /// Build and submit the notepad report, returning the reply text.
    async fn show(&self, user: u64) -> Result<String, DispatchError> {
        let entries = self.store.load(user);
        if entries.is_empty() {
            return Err(CommandError::EmptyNotepad.into());
        }

        let payload = report::build_report(&entries, &self.config.project_url);
        let url = report::submit(&self.http, &self.config.report_url, &payload)
            .await
            .map_err(|e| {
                tracing::warn!("report submission for user {user} failed: {e}");
                CommandError::ReportSubmissionFailed
            })?;
        Ok(format!("Opened your notepad [here]({url})."))
    }

    async fn send(&self, text: &str) {
        if let Err(e) = self.chat.send(&self.config.room_id, text).await {
            tracing::warn!("send to room {} failed: {e}", self.config.room_id);
        }
    }
}

/// Drop the leading mention token and return the rest of the message.
fn strip_mention(content: &str) -> String {
    let mut words = content.split_whitespace();
    let _mention = words.next();
    words.collect::<Vec<_>>().join(" ")
}

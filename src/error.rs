//! Error types for the notepad bot.

/// Top-level error type for infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Persisted state read/write error.
    #[error("store error: {0}")]
    Store(String),

    /// Reminder scheduling error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Chat transport error (send, resolve, websocket).
    #[error("chat error: {0}")]
    Chat(String),

    /// Report endpoint error.
    #[error("report error: {0}")]
    Report(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, BotError>;

/// Why a duration string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// The text did not match the duration grammar.
    #[error("{0} could not be parsed as duration.")]
    Unparsable(String),

    /// The text parsed, but summed to zero.
    #[error("Duration must be positive.")]
    NonPositive,
}

/// User-visible command failures.
///
/// The `Display` text of each variant is the exact reply sent back to the
/// chat room, so the dispatch boundary can render any of these with a single
/// `to_string()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// `remindme` called without a duration argument.
    #[error("Missing duration argument.")]
    MissingDuration,

    /// The duration argument was rejected.
    #[error(transparent)]
    InvalidDuration(#[from] DurationError),

    /// `rm` index outside the current notepad.
    #[error("Item does not exist.")]
    IndexOutOfRange,

    /// `show` on an empty notepad.
    #[error("You have no saved messages.")]
    EmptyNotepad,

    /// `snooze` on a message that is not a reply to one of the bot's
    /// reminder-delivery messages (or whose delivery message has no parent).
    #[error("That is not a reply to one of my reminders.")]
    BrokenReplyChain,

    /// `snooze` on a reminder whose original message belongs to someone else.
    #[error("That reminder was set on someone else's message.")]
    OwnershipMismatch,

    /// The report endpoint refused or failed the submission.
    #[error("Could not open your notepad, the report service failed.")]
    ReportSubmissionFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_error_renders_offending_input() {
        let err = DurationError::Unparsable("xyz".to_owned());
        assert_eq!(err.to_string(), "xyz could not be parsed as duration.");
    }

    #[test]
    fn invalid_duration_is_transparent() {
        let err = CommandError::from(DurationError::NonPositive);
        assert_eq!(err.to_string(), "Duration must be positive.");
    }

    #[test]
    fn command_errors_have_fixed_replies() {
        assert_eq!(
            CommandError::IndexOutOfRange.to_string(),
            "Item does not exist."
        );
        assert_eq!(
            CommandError::EmptyNotepad.to_string(),
            "You have no saved messages."
        );
    }
}

//! Chat collaborator contract.
//!
//! The engine and scheduler talk to the chat room only through
//! [`ChatClient`]; the Stack Exchange implementation lives in
//! [`crate::transport`], and tests substitute an in-process fake.

use async_trait::async_trait;

/// Inbound chat event as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Chat message ID of the event.
    pub message_id: u64,
    /// Room the message was posted in.
    pub room_id: String,
    /// Author of the message.
    pub sender_id: u64,
    /// User mentioned at the start of the message, if any.
    pub target_user_id: Option<u64>,
    /// Message the author replied to, if any.
    pub parent_id: Option<u64>,
    /// Raw message text, mention included.
    pub content: String,
}

/// A resolved chat message, enough for reply-chain walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Chat message ID.
    pub id: u64,
    /// Author of the message (`0` when the transport cannot recover it).
    pub author_id: u64,
    /// Message this one replies to, if any.
    pub parent_id: Option<u64>,
}

/// Chat transport contract. The engine needs nothing else from the backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a message to a room. Supports `[text](url)` markup.
    async fn send(&self, room_id: &str, text: &str) -> anyhow::Result<()>;

    /// Post a threaded reply to a message.
    async fn reply(&self, message_id: u64, text: &str) -> anyhow::Result<()>;

    /// Resolve a message by ID, e.g. for re-arming reminders after restart.
    async fn resolve(&self, message_id: u64) -> anyhow::Result<MessageRef>;
}

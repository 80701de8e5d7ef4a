//! Stack Exchange chat transport.
//!
//! Implements [`ChatClient`] against the chat.* REST endpoints plus the
//! room websocket for inbound events. This is collaborator glue, outside the
//! core's correctness boundary; only the parsing helpers carry tests.

use crate::chat::{ChatClient, InboundMessage, MessageRef};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// New-message event on the chat websocket.
const EVENT_MESSAGE_POSTED: u64 = 1;

/// Chat client for a single Stack Exchange chat room.
pub struct StackChat {
    host: String,
    room_id: String,
    fkey: String,
    client: reqwest::Client,
    bot_user_id: u64,
    /// Messages observed on the websocket, so `resolve` can recover author
    /// and parent without scraping transcripts.
    seen: Mutex<HashMap<u64, MessageRef>>,
}

impl StackChat {
    /// Log in to the main site, pick up the chat fkey, and identify the bot's
    /// chat user.
    pub async fn login(
        host: &str,
        room_id: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("notepad-bot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let login_url = format!("https://{host}/users/login");
        let login_page = client.get(&login_url).send().await?.text().await?;
        let site_fkey = extract_fkey(&login_page)
            .ok_or_else(|| anyhow::anyhow!("no fkey on login page"))?;

        let response = client
            .post(&login_url)
            .form(&[
                ("fkey", site_fkey.as_str()),
                ("email", email),
                ("password", password),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("login failed with {}", response.status());
        }

        let chat_page = client
            .get(format!("https://chat.{host}/rooms/{room_id}"))
            .send()
            .await?
            .text()
            .await?;
        let fkey = extract_fkey(&chat_page)
            .ok_or_else(|| anyhow::anyhow!("no fkey on chat page, login likely rejected"))?;
        let bot_user_id = extract_chat_user_id(&chat_page)
            .ok_or_else(|| anyhow::anyhow!("no chat user id on chat page"))?;

        tracing::info!("logged in to chat.{host} as user {bot_user_id}");
        Ok(Self {
            host: host.to_owned(),
            room_id: room_id.to_owned(),
            fkey,
            client,
            bot_user_id,
            seen: Mutex::new(HashMap::new()),
        })
    }

    /// The bot's own chat user ID.
    #[must_use]
    pub fn bot_user_id(&self) -> u64 {
        self.bot_user_id
    }

    async fn post_to_room(&self, room_id: &str, text: &str) -> anyhow::Result<()> {
        let url = format!("https://chat.{}/chats/{room_id}/messages/new", self.host);
        let response = self
            .client
            .post(&url)
            .form(&[("text", text), ("fkey", self.fkey.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("chat send failed with {}", response.status());
        }
        Ok(())
    }

    /// Watch the room websocket and forward message events until the socket
    /// closes or the receiver goes away.
    pub async fn watch(&self, inbound_tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let auth: serde_json::Value = self
            .client
            .post(format!("https://chat.{}/ws-auth", self.host))
            .form(&[
                ("roomid", self.room_id.as_str()),
                ("fkey", self.fkey.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;
        let ws_url = auth
            .get("url")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("ws-auth response has no url"))?;

        let (stream, _) =
            tokio_tungstenite::connect_async(format!("{ws_url}?l={}", u64::MAX)).await?;
        let (_write, mut read) = stream.split();
        tracing::info!("watching room {}", self.room_id);

        while let Some(frame) = read.next().await {
            let raw = match frame {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Close(_)) => anyhow::bail!("chat websocket closed"),
                Ok(_) => continue,
                Err(e) => anyhow::bail!("chat websocket error: {e}"),
            };
            let payload: serde_json::Value = match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(_) => continue,
            };

            for event in room_events(&payload, &self.room_id) {
                let Some(inbound) = parse_event(event) else {
                    continue;
                };
                self.seen.lock().unwrap_or_else(|p| p.into_inner()).insert(
                    inbound.message_id,
                    MessageRef {
                        id: inbound.message_id,
                        author_id: inbound.sender_id,
                        parent_id: inbound.parent_id,
                    },
                );
                if inbound_tx.send(inbound).await.is_err() {
                    return Ok(());
                }
            }
        }
        anyhow::bail!("chat websocket ended")
    }
}

#[async_trait]
impl ChatClient for StackChat {
    async fn send(&self, room_id: &str, text: &str) -> anyhow::Result<()> {
        self.post_to_room(room_id, text).await
    }

    async fn reply(&self, message_id: u64, text: &str) -> anyhow::Result<()> {
        // A leading `:id` makes the message a threaded reply.
        self.post_to_room(&self.room_id, &format!(":{message_id} {text}"))
            .await
    }

    async fn resolve(&self, message_id: u64) -> anyhow::Result<MessageRef> {
        if let Some(message) = self
            .seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&message_id)
        {
            return Ok(*message);
        }

        // Not seen on this connection (e.g. after a restart): fetch the raw
        // text. Author is unrecoverable this way, parent comes from the
        // reply prefix. Good enough for re-arming reminders.
        let response = self
            .client
            .get(format!(
                "https://chat.{}/message/{message_id}?plain=true",
                self.host
            ))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("message {message_id} not fetchable: {}", response.status());
        }
        let content = response.text().await?;
        Ok(MessageRef {
            id: message_id,
            author_id: 0,
            parent_id: parse_reply_prefix(&content),
        })
    }
}

/// Pull the fkey out of a page's hidden input.
fn extract_fkey(html: &str) -> Option<String> {
    let marker = "name=\"fkey\"";
    let at = html.find(marker)?;
    let rest = &html[at..];
    let value_at = rest.find("value=\"")?;
    let rest = &rest[value_at + "value=\"".len()..];
    let end = rest.find('"')?;
    let fkey = &rest[..end];
    (!fkey.is_empty()).then(|| fkey.to_owned())
}

/// Pull the logged-in chat user ID from a room page (`/users/<id>/...`).
fn extract_chat_user_id(html: &str) -> Option<u64> {
    let marker = "class=\"topbar-menu-links\"";
    let at = html.find(marker)?;
    let rest = &html[at..];
    let link_at = rest.find("/users/")?;
    let rest = &rest[link_at + "/users/".len()..];
    let end = rest.find(|c: char| !c.is_ascii_digit())?;
    rest[..end].parse().ok()
}

/// Events for our room inside a websocket frame (`{"r<room>": {"e": [...]}}`).
fn room_events<'a>(payload: &'a serde_json::Value, room_id: &str) -> Vec<&'a serde_json::Value> {
    payload
        .get(format!("r{room_id}"))
        .and_then(|r| r.get("e"))
        .and_then(serde_json::Value::as_array)
        .map(|events| events.iter().collect())
        .unwrap_or_default()
}

/// Convert a message-posted event into an [`InboundMessage`].
fn parse_event(event: &serde_json::Value) -> Option<InboundMessage> {
    let event_type = event.get("event_type").and_then(serde_json::Value::as_u64)?;
    if event_type != EVENT_MESSAGE_POSTED {
        return None;
    }
    let message_id = event.get("message_id").and_then(serde_json::Value::as_u64)?;
    let sender_id = event.get("user_id").and_then(serde_json::Value::as_u64)?;
    let room_id = event.get("room_id").and_then(serde_json::Value::as_u64)?;
    let content = event
        .get("content")
        .and_then(serde_json::Value::as_str)?
        .to_owned();

    Some(InboundMessage {
        message_id,
        room_id: room_id.to_string(),
        sender_id,
        target_user_id: event
            .get("target_user_id")
            .and_then(serde_json::Value::as_u64),
        parent_id: event.get("parent_id").and_then(serde_json::Value::as_u64),
        content,
    })
}

/// Parent message ID from a raw reply (`:12345 text`), if present.
fn parse_reply_prefix(content: &str) -> Option<u64> {
    let rest = content.strip_prefix(':')?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || !rest[digits.len()..].starts_with(' ') {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_fkey_from_hidden_input() {
        let html = r#"<input type="hidden" name="fkey" value="abc123def" />"#;
        assert_eq!(extract_fkey(html), Some("abc123def".to_owned()));
        assert_eq!(extract_fkey("<html></html>"), None);
    }

    #[test]
    fn extracts_chat_user_id_from_topbar() {
        let html = r#"<div class="topbar-menu-links"><a href="/users/1234567/notepad">notepad</a></div>"#;
        assert_eq!(extract_chat_user_id(html), Some(1_234_567));
    }

    #[test]
    fn parses_message_posted_events() {
        let frame = json!({
            "r111347": {"e": [{
                "event_type": 1,
                "message_id": 500,
                "user_id": 7,
                "target_user_id": 1000,
                "parent_id": 200,
                "room_id": 111347,
                "content": "@notepad snooze"
            }]}
        });
        let events = room_events(&frame, "111347");
        assert_eq!(events.len(), 1);
        let inbound = parse_event(events[0]).unwrap();
        assert_eq!(inbound.message_id, 500);
        assert_eq!(inbound.sender_id, 7);
        assert_eq!(inbound.target_user_id, Some(1000));
        assert_eq!(inbound.parent_id, Some(200));
        assert_eq!(inbound.room_id, "111347");
    }

    #[test]
    fn non_message_events_are_skipped() {
        let event = json!({"event_type": 3, "room_id": 111347, "user_id": 7});
        assert!(parse_event(&event).is_none());
    }

    #[test]
    fn frames_for_other_rooms_are_empty() {
        let frame = json!({"r999": {"e": [{"event_type": 1}]}});
        assert!(room_events(&frame, "111347").is_empty());
    }

    #[test]
    fn reply_prefix_recovers_the_parent() {
        assert_eq!(parse_reply_prefix(":100 hello"), Some(100));
        assert_eq!(parse_reply_prefix("plain message"), None);
        assert_eq!(parse_reply_prefix(":abc nope"), None);
        assert_eq!(parse_reply_prefix(":100"), None);
    }
}

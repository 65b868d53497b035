//! Telegram channel — long-polls the Bot API for posts on the source channel.
//!
//! Native Rust Telegram Bot API implementation over `reqwest`, adapted to the
//! relay's Channel trait (MessageStream, send, channel_info).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Channel, ChannelInfo, IncomingMessage, MessageStream};
use crate::config::{Credentials, DEFAULT_API_BASE, RelayConfig};
use crate::error::ChannelError;
use crate::pipeline::links::canonical_handle;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Back-off after a failed poll.
const POLL_ERROR_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    token: SecretString,
    source: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: SecretString, source: impl Into<String>) -> Self {
        Self {
            token,
            source: source.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn from_config(config: &RelayConfig, credentials: &Credentials) -> Self {
        Self::new(credentials.session.clone(), config.source_channel.clone())
            .with_api_base(config.api_base.clone())
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.api_base, &self.token, method)
    }

    /// Whether a Bot API `chat` object is the configured source channel.
    pub fn is_source_chat(&self, chat: &Value) -> bool {
        chat_matches(&self.source, chat)
    }

    /// Call a Bot API method and unwrap its `result`.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, ChannelError> {
        call_api(&self.client, &self.api_url(method), method, body).await
    }

    /// Offset just past the newest pending update, so only posts published
    /// after startup are relayed.
    async fn initial_offset(&self) -> i64 {
        let body = serde_json::json!({ "offset": -1, "timeout": 0 });
        match self.call("getUpdates", &body).await {
            Ok(result) => result
                .as_array()
                .and_then(|updates| updates.last())
                .and_then(|u| u.get("update_id"))
                .and_then(Value::as_i64)
                .map_or(0, |id| id + 1),
            Err(e) => {
                tracing::warn!("Telegram: could not skip pending updates: {e}");
                0
            }
        }
    }

    /// Send a plain-text message, split to fit Telegram's 4096 char limit.
    async fn send_message(&self, chat: &str, text: &str) -> Result<(), ChannelError> {
        let chat_id = chat_id_value(chat);

        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            self.call("sendMessage", &body)
                .await
                .map_err(|e| ChannelError::SendFailed {
                    name: "telegram".into(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let source = self.source.clone();
        let client = self.client.clone();
        let mut offset = self.initial_offset().await;

        tokio::spawn(async move {
            tracing::info!(source = %source, "Telegram channel listening for posts...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["channel_post", "message"]
                });

                let updates = match call_api(&client, &url, "getUpdates", &body).await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_ERROR_DELAY).await;
                        continue;
                    }
                };

                let Some(updates) = updates.as_array() else {
                    continue;
                };

                for update in updates {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update, &source) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, chat: &str, text: &str) -> Result<(), ChannelError> {
        self.send_message(chat, text).await
    }

    async fn channel_info(&self, chat: &str) -> Result<ChannelInfo, ChannelError> {
        let body = serde_json::json!({ "chat_id": chat_id_value(chat) });
        let result = self.call("getChat", &body).await?;
        parse_chat_info(&result)
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        self.call("getMe", &serde_json::json!({}))
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(api_base: &str, token: &SecretString, method: &str) -> String {
    format!("{api_base}/bot{}/{method}", token.expose_secret())
}

async fn call_api(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    body: &Value,
) -> Result<Value, ChannelError> {
    let resp = client.post(url).json(body).send().await?;
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ChannelError::AuthFailed {
            name: "telegram".into(),
            reason: format!("{method} returned {status}"),
        });
    }

    let data: Value = resp.json().await?;
    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        let description = data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description");
        return Err(ChannelError::Http(format!(
            "{method} returned {status}: {description}"
        )));
    }

    Ok(data.get("result").cloned().unwrap_or(Value::Null))
}

/// Numeric ids go out as numbers, everything else as an `@username`.
fn chat_id_value(chat: &str) -> Value {
    match chat.trim().parse::<i64>() {
        Ok(id) => Value::from(id),
        Err(_) => Value::from(canonical_handle(chat)),
    }
}

/// Match a Bot API `chat` object against a configured source: username
/// (case-insensitive, `@` optional) or numeric id.
fn chat_matches(source: &str, chat: &Value) -> bool {
    let source = source.trim().trim_start_matches('@');
    if source.is_empty() {
        return false;
    }

    let by_username = chat
        .get("username")
        .and_then(Value::as_str)
        .is_some_and(|u| u.eq_ignore_ascii_case(source));
    let by_id = chat
        .get("id")
        .and_then(Value::as_i64)
        .is_some_and(|id| id.to_string() == source);

    by_username || by_id
}

/// Turn one getUpdates entry into an inbound post, if it is a text (or
/// captioned) post from the source channel.
fn parse_update(update: &Value, source: &str) -> Option<IncomingMessage> {
    let post = update
        .get("channel_post")
        .or_else(|| update.get("message"))?;

    let chat = post.get("chat")?;
    if !chat_matches(source, chat) {
        return None;
    }

    let text = post
        .get("text")
        .or_else(|| post.get("caption"))
        .and_then(Value::as_str)?;

    let id = post.get("message_id").and_then(Value::as_i64).unwrap_or_default();
    let chat_name = chat
        .get("username")
        .and_then(Value::as_str)
        .map(String::from)
        .or_else(|| chat.get("id").and_then(Value::as_i64).map(|id| id.to_string()))
        .unwrap_or_default();

    let mut incoming = IncomingMessage::new(id, chat_name, text);
    if let Some(date) = post
        .get("date")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    {
        incoming = incoming.with_received_at(date);
    }
    Some(incoming)
}

fn parse_chat_info(result: &Value) -> Result<ChannelInfo, ChannelError> {
    let id = result
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| ChannelError::InvalidMessage("getChat result has no id".into()))?;

    Ok(ChannelInfo {
        id,
        title: result.get("title").and_then(Value::as_str).map(String::from),
        username: result.get("username").and_then(Value::as_str).map(String::from),
    })
}

/// Split a message into chunks of at most `max_chars` characters.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    loop {
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        // Find a good split point
        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
        if remaining.is_empty() {
            break;
        }
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────

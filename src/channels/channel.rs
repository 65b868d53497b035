//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;

/// A new post observed on the source channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Platform message id.
    pub id: i64,
    /// Channel the post was published in (username or numeric id).
    pub chat: String,
    /// Plain text of the post.
    pub content: String,
    /// When the post was received.
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(id: i64, chat: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            chat: chat.into(),
            content: content.into(),
            received_at: Utc::now(),
        }
    }

    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }
}

/// Channel metadata resolved from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
}

/// Stream of inbound posts from the subscribed source channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A messaging platform connection: subscribe to one source, publish to any chat.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short name for logs ("telegram").
    fn name(&self) -> &str;

    /// Start receiving new posts from the source channel.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Publish a plain-text message to `chat`.
    async fn send(&self, chat: &str, text: &str) -> Result<(), ChannelError>;

    /// Look up a channel's metadata.
    async fn channel_info(&self, chat: &str) -> Result<ChannelInfo, ChannelError>;

    /// Verify the credentials work.
    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

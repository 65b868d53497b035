//! Relay orchestrator — wires the transformation pipeline to the channel.
//!
//! Each inbound post gets its own task. A failed send or a panicking handler
//! is logged and dropped; the loop keeps going. Nothing is retried.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, IncomingMessage};
use crate::config::RelayConfig;
use crate::error::ChannelError;
use crate::pipeline::MessageTransformer;
use crate::pipeline::links::canonical_handle;

/// What happened to one inbound post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No eligibility marker; dropped.
    Ineligible,
    /// Transformed text was blank; nothing sent.
    Empty,
    /// Delivered to the destination channel.
    Sent,
    /// Delivery failed; logged and dropped.
    SendFailed,
}

/// Forwards transformed posts from the source channel to the destination.
#[derive(Clone)]
pub struct Relay {
    channel: Arc<dyn Channel>,
    transformer: Arc<MessageTransformer>,
    destination: String,
}

impl Relay {
    pub fn new(
        channel: Arc<dyn Channel>,
        transformer: MessageTransformer,
        destination: &str,
    ) -> Self {
        Self {
            channel,
            transformer: Arc::new(transformer),
            destination: canonical_handle(destination),
        }
    }

    pub fn from_config(
        channel: Arc<dyn Channel>,
        config: &RelayConfig,
    ) -> crate::error::Result<Self> {
        let transformer = MessageTransformer::from_config(config)?;
        Ok(Self::new(channel, transformer, &config.dest_channel))
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Run one post through the pipeline and send the result.
    pub async fn handle(&self, message: &IncomingMessage) -> RelayOutcome {
        let Some(text) = self.transformer.transform(&message.content) else {
            info!(id = message.id, chat = %message.chat, "Skipped message without eligibility marker");
            return RelayOutcome::Ineligible;
        };

        if text.trim().is_empty() {
            info!(id = message.id, "Transformed message is empty, nothing to send");
            return RelayOutcome::Empty;
        }

        match self.channel.send(&self.destination, &text).await {
            Ok(()) => {
                info!(
                    id = message.id,
                    destination = %self.destination,
                    "Relayed a transformed message"
                );
                RelayOutcome::Sent
            }
            Err(e) => {
                error!(
                    id = message.id,
                    destination = %self.destination,
                    error = %e,
                    "Send failed"
                );
                RelayOutcome::SendFailed
            }
        }
    }

    /// Subscribe to the source channel and handle posts until the inbound
    /// stream ends. In-flight handlers are drained before returning.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut stream = self.channel.start().await?;
        let mut handlers = JoinSet::new();

        info!(
            channel = self.channel.name(),
            destination = %self.destination,
            "Relay loop started"
        );

        loop {
            tokio::select! {
                next = stream.next() => match next {
                    Some(message) => {
                        let relay = self.clone();
                        handlers.spawn(async move { relay.handle(&message).await });
                    }
                    None => break,
                },
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    log_handler_result(joined);
                }
            }
        }

        while let Some(joined) = handlers.join_next().await {
            log_handler_result(joined);
        }

        Err(ChannelError::Disconnected {
            name: self.channel.name().to_string(),
            reason: "inbound stream ended".into(),
        })
    }
}

fn log_handler_result(joined: Result<RelayOutcome, JoinError>) {
    match joined {
        Ok(outcome) => debug!(?outcome, "Message handler finished"),
        Err(e) if e.is_panic() => error!(error = %e, "Message handler panicked"),
        Err(e) => warn!(error = %e, "Message handler cancelled"),
    }
}

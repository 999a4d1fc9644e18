//! Outbound notifications
//!
//! Every alerting path (heartbeat escalation, volume floor, composition change,
//! wallet balance) ends in a single [`Notifier::notify`] call with a plain text
//! message. The [`Dispatcher`] fans that message out to every configured chat
//! channel; [`LogNotifier`] is used when nothing is configured.
//!
//! Delivery is best effort. Callers log failures and move on.

pub mod channels;
pub mod discord;

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::config::WebhookConfig;

pub use channels::Channel;

/// Failure to deliver a notification on one channel
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyError {
    /// The HTTP request could not be sent
    Request { channel: &'static str, message: String },

    /// The channel answered with a non-2xx status
    Rejected { channel: &'static str, status: u16 },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Request { channel, message } => {
                write!(f, "failed to send {channel} message: {message}")
            }
            NotifyError::Rejected { channel, status } => {
                write!(f, "{channel} message failed with status: {status}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// Sends a text message to whoever should hear about it
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes the message to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        warn!("notification (no channel configured): {message}");
        Ok(())
    }
}

/// Fans a message out to all configured channels
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    channels: Vec<Channel>,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, channels: Vec<Channel>) -> Self {
        Self { client, channels }
    }

    /// Build the channel list from the `webhook` config section
    pub fn from_config(client: reqwest::Client, config: &WebhookConfig) -> Self {
        Self::new(client, Channel::from_config(config))
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    /// Attempts every channel, returning the first failure once all were tried
    #[instrument(skip(self, message), fields(channels = self.channels.len()))]
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        if self.channels.is_empty() {
            return LogNotifier.notify(message).await;
        }

        let mut first_error = None;
        for channel in &self.channels {
            match channel.send(&self.client, message).await {
                Ok(()) => debug!("sent notification via {}", channel.name()),
                Err(e) => {
                    error!("{e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("notification delivered to {} channel(s)", self.channels.len());
                Ok(())
            }
        }
    }
}

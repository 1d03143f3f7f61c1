//! # Chat Notification Module
//!
//! Delivery of rendered alerts to a chat destination.
//!
//! ## Contained Modules:
//!
//! - **`telegram`**: `TelegramClient`, a single-attempt `ChatTransport` over the
//!   Bot API `sendMessage` method.
//! - **`notifier`**: `Notifier`, which adds bounded exponential-backoff retries on
//!   top of any transport and exposes the boolean `AlertSink` used by the loop.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use async_trait::async_trait;
use thiserror::Error;

use crate::retrieve::RetrieveError;

/// Retrying front-end over a transport.
pub mod notifier;
/// Telegram Bot API transport.
pub mod telegram;

pub use notifier::Notifier;
pub use telegram::{TelegramClient, DEFAULT_TELEGRAM_URL};

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Timeout or connection failure.
    #[error("network failure: {0}")]
    Network(String),

    /// Non-success HTTP status without an `ok: true` body.
    #[error("http error {status}: {description}")]
    Upstream {
        /// HTTP status.
        status: u16,
        /// Provider description or raw body.
        description: String,
    },

    /// The API answered but reported `ok: false`.
    #[error("chat API error: {description}")]
    Rejected {
        /// Provider description.
        description: String,
    },
}

impl From<RetrieveError> for DeliveryError {
    fn from(err: RetrieveError) -> Self {
        match err {
            RetrieveError::Decode(e) => DeliveryError::Upstream {
                status: 200,
                description: format!("undecodable reply: {}", e),
            },
            other => DeliveryError::Network(other.to_string()),
        }
    }
}

/// One delivery attempt to a chat destination.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Posts `text`; `Ok` only when the provider confirmed the message.
    async fn deliver(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Where the polling loop sends rendered alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Delivers `message`, returning whether it eventually got through.
    async fn send(&self, message: &str) -> bool;
}

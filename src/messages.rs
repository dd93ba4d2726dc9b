//! Diagnostic message channel
//!
//! Human-readable progress and error messages emitted by command handlers.
//! Sending never blocks and never fails from the caller's point of view; if
//! nobody is listening the message is dropped.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Severity of a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Debug,
    Info,
    Warn,
    Success,
}

impl std::fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageLevel::Debug => write!(f, "debug"),
            MessageLevel::Info => write!(f, "info"),
            MessageLevel::Warn => write!(f, "warn"),
            MessageLevel::Success => write!(f, "success"),
        }
    }
}

/// A single diagnostic message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

/// Receiving half of the message channel
pub type MessageReceiver = mpsc::UnboundedReceiver<Message>;

/// Sending half of the message channel
#[derive(Debug, Clone)]
pub struct Messenger {
    tx: mpsc::UnboundedSender<Message>,
}

impl Messenger {
    /// Create a connected messenger/receiver pair
    pub fn channel() -> (Self, MessageReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Send a message at the given level
    pub fn send(&self, level: MessageLevel, text: impl Into<String>) {
        let _ = self.tx.send(Message {
            level,
            text: text.into(),
        });
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.send(MessageLevel::Debug, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.send(MessageLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        self.send(MessageLevel::Warn, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.send(MessageLevel::Success, text);
    }
}

/// Forward every message on the channel into `tracing` until all senders drop
pub async fn drain_to_tracing(mut rx: MessageReceiver) {
    while let Some(message) = rx.recv().await {
        match message.level {
            MessageLevel::Debug => debug!("[MSG] {}", message.text),
            MessageLevel::Info => info!("[MSG] {}", message.text),
            MessageLevel::Warn => warn!("[MSG] {}", message.text),
            MessageLevel::Success => info!("[MSG] [+] {}", message.text),
        }
    }
}

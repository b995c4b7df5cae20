use async_trait::async_trait;

use crate::{
    domain::{ChatId, ExpenseRecord, MessageRef},
    Result,
};

/// Hexagonal port for outbound chat messages.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a plain-text message (no markup parsing).
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}

/// Why the endpoint did not store a record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The endpoint answered and refused the record.
    #[error("{0}")]
    RemoteRejected(String),

    /// Network failure, bad status or unreadable response.
    #[error("{0}")]
    TransportFault(String),
}

/// Hexagonal port for persisting one expense record.
///
/// Implementations make exactly one attempt per call.
#[async_trait]
pub trait ExpenseRecorder: Send + Sync {
    async fn record(&self, record: &ExpenseRecord) -> std::result::Result<(), RecordError>;
}

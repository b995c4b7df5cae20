/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a Telegram message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// One parsed expense line, ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseRecord {
    pub category: String,
    pub description: String,
    pub amount: u64,
    pub method: String,
    /// Empty when the line had only four fields.
    pub note: String,
}

/// Why a line was not recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Wrong number of fields.
    Malformed,
    /// The endpoint answered with `ok: false`.
    Rejected(String),
    /// The request never produced a usable answer.
    Transport(String),
}

/// Result of processing one line of a batch. `index` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Success {
        index: usize,
        record: ExpenseRecord,
    },
    Failure {
        index: usize,
        raw_line: String,
        reason: FailureReason,
    },
}

impl LineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

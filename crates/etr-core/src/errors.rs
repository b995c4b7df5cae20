/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type. Line-level problems
/// (malformed lines, rejected records) are not represented here: they are
/// outcomes reported back to the chat, see [`crate::domain::LineOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

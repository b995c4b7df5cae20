use teloxide::prelude::*;

use etr_core::domain::ChatId;

use crate::router::AppState;

pub async fn handle_text(chat_id: i64, text: &str, state: &AppState) -> ResponseResult<()> {
    if text.trim().is_empty() {
        return Ok(());
    }

    // Each undelivered reply is already logged by the dispatcher; the update is still acknowledged.
    if let Err(e) = state.dispatcher.handle_text(ChatId(chat_id), text).await {
        tracing::debug!(chat_id, "batch finished with undelivered replies: {e}");
    }

    Ok(())
}

//! Telegram update handlers.
//!
//! Only text messages carry expense lines; everything else is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;
mod text;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    let Some(text) = msg.text() else {
        tracing::debug!(chat_id, "ignoring non-text message");
        return Ok(());
    };

    // Sequentialize messages per chat so replies keep the order they were sent in.
    let _guard = state.chat_locks.lock_chat(chat_id).await;
    text::handle_text(chat_id, text, &state).await
}

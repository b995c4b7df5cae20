use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use etr_core::{
    config::Config,
    dispatcher::BatchDispatcher,
    ports::{ExpenseRecorder, MessagingPort},
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<BatchDispatcher>,
    pub chat_locks: Arc<ChatLocks>,
}

/// One async lock per chat, so a chat's messages are handled one after another
/// while different chats proceed concurrently.
///
/// Entries nobody holds or waits on are dropped on the next `lock_chat`, so the
/// map only grows with the number of chats active at the same time.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // Only the map's own reference left: idle.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked_chats(&self) -> usize {
        self.inner.lock().await.len()
    }
}

pub async fn run_polling(
    cfg: Arc<Config>,
    recorder: Arc<dyn ExpenseRecorder>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!("🤖 Bot is running as @{}", me.username()),
        Err(e) => tracing::warn!("🤖 Bot is running (get_me failed: {e})"),
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let dispatcher = Arc::new(BatchDispatcher::new(
        recorder,
        messenger,
        cfg.field_delimiter,
    ));

    let state = Arc::new(AppState {
        dispatcher,
        chat_locks: Arc::new(ChatLocks::default()),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("bot stopped");
    Ok(())
}

//! Telegram side of iris: teloxide-backed messaging, history and command routing.
//!
//! Implements the `iris-core` ports over the Telegram Bot API and wires the
//! bot's commands to them.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{prelude::*, types::ParseMode, ApiError, RequestError};
use tokio::time::sleep;

pub mod handlers;
pub mod history;
pub mod registry;
pub mod router;

use history::{map_err, RecentMessages};
use iris_core::{
    config::TELEGRAM_MESSAGE_LIMIT,
    domain::{ChatId, MessageId, MessageRef},
    messaging::{MessagingCapabilities, MessagingPort},
    Result,
};

/// [`MessagingPort`] over the Bot API. Every message the bot sends is
/// recorded so it can be mass-deleted later.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    recent: Arc<RecentMessages>,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, recent: Arc<RecentMessages>) -> Self {
        Self { bot, recent }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    /// Run `op`, retrying once after a flood-control `RetryAfter`.
    async fn with_retry<T, Fut>(
        &self,
        mut op: impl FnMut() -> Fut,
    ) -> std::result::Result<T, RequestError>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Err(RequestError::RetryAfter(d)) if attempts < MAX_RETRIES => {
                    attempts += 1;
                    tracing::warn!(wait_s = d.as_secs(), "telegram flood limit hit, retrying");
                    sleep(d).await;
                }
                res => return res,
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_edit: true,
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await
            .map_err(map_err)?;

        let message_id = MessageId(msg.id.0);
        self.recent.record(chat_id, message_id, msg.date);
        Ok(MessageRef {
            chat_id,
            message_id,
        })
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        let res = self
            .with_retry(|| {
                self.bot
                    .edit_message_text(
                        Self::tg_chat(msg.chat_id),
                        Self::tg_msg_id(msg.message_id),
                        html.to_string(),
                    )
                    .parse_mode(ParseMode::Html)
            })
            .await;
        match res {
            // Same text as before; nothing to do.
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(map_err(e)),
        }
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await
        .map_err(map_err)?;
        self.recent.forget(msg.chat_id, msg.message_id);
        Ok(())
    }
}

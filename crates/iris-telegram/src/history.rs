//! Message history for mass deletion.
//!
//! The Bot API cannot list a chat's history, so the bot remembers the ids of
//! messages it has seen (its own included) and deletes from that record.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use teloxide::{prelude::*, ApiError, RequestError};

use iris_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    purge::ChannelHistory,
    Result,
};

/// Bots may only delete messages younger than this.
pub fn deletion_window() -> Duration {
    Duration::hours(48)
}

/// Bounded per-chat record of message ids and their send dates.
#[derive(Debug)]
pub struct RecentMessages {
    capacity: usize,
    chats: Mutex<HashMap<ChatId, VecDeque<(MessageId, DateTime<Utc>)>>>,
}

impl RecentMessages {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            chats: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, chat: ChatId, id: MessageId, date: DateTime<Utc>) {
        let Ok(mut chats) = self.chats.lock() else {
            return;
        };
        let log = chats.entry(chat).or_default();
        if log.iter().any(|(seen, _)| *seen == id) {
            return;
        }
        if log.len() == self.capacity {
            log.pop_front();
        }
        log.push_back((id, date));
    }

    pub fn forget(&self, chat: ChatId, id: MessageId) {
        if let Ok(mut chats) = self.chats.lock() {
            if let Some(log) = chats.get_mut(&chat) {
                log.retain(|(seen, _)| *seen != id);
            }
        }
    }

    /// Up to `limit` deletable ids older than `before`, newest first.
    pub fn recent_before(
        &self,
        chat: ChatId,
        before: MessageId,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<MessageId> {
        let Ok(chats) = self.chats.lock() else {
            return Vec::new();
        };
        let Some(log) = chats.get(&chat) else {
            return Vec::new();
        };

        let mut ids: Vec<MessageId> = log
            .iter()
            .filter(|(id, date)| *id < before && now - *date < deletion_window())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.truncate(limit);
        ids
    }

    pub fn len(&self, chat: ChatId) -> usize {
        self.chats
            .lock()
            .map(|c| c.get(&chat).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }
}

/// Platform errors meaning "this message is gone or too old".
pub(crate) fn is_stale(e: &RequestError) -> bool {
    matches!(
        e,
        RequestError::Api(
            ApiError::MessageToDeleteNotFound
                | ApiError::MessageCantBeDeleted
                | ApiError::MessageIdInvalid
        )
    )
}

pub(crate) fn map_err(e: RequestError) -> Error {
    if is_stale(&e) {
        Error::Stale(e.to_string())
    } else {
        Error::External(format!("telegram error: {e}"))
    }
}

/// [`ChannelHistory`] over [`RecentMessages`] and the Bot API.
pub struct TelegramHistory {
    bot: Bot,
    recent: Arc<RecentMessages>,
    /// Deleted by a bulk call that then failed; the one-by-one retry must
    /// still count them.
    deleted_early: Mutex<HashSet<MessageRef>>,
}

impl TelegramHistory {
    pub fn new(bot: Bot, recent: Arc<RecentMessages>) -> Self {
        Self {
            bot,
            recent,
            deleted_early: Mutex::new(HashSet::new()),
        }
    }

    async fn delete(&self, msg: MessageRef) -> Result<()> {
        let res = self
            .bot
            .delete_message(
                teloxide::types::ChatId(msg.chat_id.0),
                teloxide::types::MessageId(msg.message_id.0),
            )
            .await;
        // Gone either way; stop offering it.
        if res.is_ok() || res.as_ref().is_err_and(is_stale) {
            self.recent.forget(msg.chat_id, msg.message_id);
        }
        res.map(|_| ()).map_err(map_err)
    }
}

#[async_trait]
impl ChannelHistory for TelegramHistory {
    async fn pinned(&self, chat: ChatId) -> Result<Vec<MessageId>> {
        let info = self
            .bot
            .get_chat(teloxide::types::ChatId(chat.0))
            .await
            .map_err(map_err)?;
        Ok(info
            .pinned_message
            .map(|m| vec![MessageId(m.id.0)])
            .unwrap_or_default())
    }

    async fn recent_before(
        &self,
        chat: ChatId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<MessageId>> {
        Ok(self.recent.recent_before(chat, before, limit, Utc::now()))
    }

    /// No bulk endpoint is used; messages are deleted in order and the first
    /// stale one aborts the batch.
    async fn delete_bulk(&self, chat: ChatId, ids: &[MessageId]) -> Result<()> {
        let mut done = Vec::new();
        for &message_id in ids {
            let msg = MessageRef {
                chat_id: chat,
                message_id,
            };
            match self.delete(msg).await {
                Ok(()) => done.push(msg),
                Err(e @ Error::Stale(_)) => {
                    if let Ok(mut early) = self.deleted_early.lock() {
                        early.extend(done);
                    }
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn delete_one(&self, msg: MessageRef) -> Result<()> {
        let already = self
            .deleted_early
            .lock()
            .map(|mut early| early.remove(&msg))
            .unwrap_or(false);
        if already {
            return Ok(());
        }
        self.delete(msg).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hours_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(hours_ago)
    }

    #[test]
    fn offers_only_recent_messages_newest_first() {
        let now = Utc::now();
        let recent = RecentMessages::new(10);
        let chat = ChatId(-100);
        recent.record(chat, MessageId(1), at(72, now));
        recent.record(chat, MessageId(2), at(47, now));
        recent.record(chat, MessageId(3), at(1, now));
        recent.record(chat, MessageId(4), at(0, now));
        recent.record(ChatId(5), MessageId(3), at(0, now));

        assert_eq!(
            recent.recent_before(chat, MessageId(4), 10, now),
            vec![MessageId(3), MessageId(2)]
        );
        assert_eq!(
            recent.recent_before(chat, MessageId(10), 1, now),
            vec![MessageId(4)]
        );
        assert!(recent.recent_before(ChatId(9), MessageId(10), 10, now).is_empty());
    }

    #[test]
    fn capacity_drops_oldest() {
        let now = Utc::now();
        let recent = RecentMessages::new(2);
        let chat = ChatId(1);
        for id in 1..=3 {
            recent.record(chat, MessageId(id), now);
        }
        recent.record(chat, MessageId(3), now);

        assert_eq!(recent.len(chat), 2);
        assert_eq!(
            recent.recent_before(chat, MessageId(100), 10, now),
            vec![MessageId(3), MessageId(2)]
        );

        recent.forget(chat, MessageId(3));
        assert_eq!(recent.len(chat), 1);
    }

    #[test]
    fn classifies_stale_errors() {
        assert!(is_stale(&RequestError::Api(ApiError::MessageToDeleteNotFound)));
        assert!(matches!(
            map_err(RequestError::Api(ApiError::MessageCantBeDeleted)),
            Error::Stale(_)
        ));
        assert!(matches!(
            map_err(RequestError::Api(ApiError::BotBlocked)),
            Error::External(_)
        ));
    }
}

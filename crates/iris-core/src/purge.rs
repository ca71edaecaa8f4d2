//! Mass deletion of recent chat messages.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::MessagingPort,
    Error, Result,
};

/// Messages fetched per round when deleting without a limit.
pub const BATCH_SIZE: usize = 100;

pub const ALREADY_RUNNING_REPLY: &str = "Deletion already in progress, be patient.";
pub const STOPPED_REPLY: &str = "Stopped message deletion process.";
pub const NOT_RUNNING_REPLY: &str = "No message deletion in progress in this channel.";

/// Read and delete access to a chat's message history.
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    async fn pinned(&self, chat: ChatId) -> Result<Vec<MessageId>>;

    /// Up to `limit` message ids older than `before`, newest first.
    async fn recent_before(
        &self,
        chat: ChatId,
        before: MessageId,
        limit: usize,
    ) -> Result<Vec<MessageId>>;

    /// Fails with [`Error::Stale`] if any message can no longer be deleted.
    async fn delete_bulk(&self, chat: ChatId, ids: &[MessageId]) -> Result<()>;

    async fn delete_one(&self, msg: MessageRef) -> Result<()>;
}

// ============== Registry ==============

#[derive(Debug, Default)]
struct Running {
    next_id: u64,
    chats: HashMap<ChatId, (u64, CancellationToken)>,
}

/// At most one deletion per chat.
#[derive(Clone, Debug, Default)]
pub struct PurgeRegistry {
    inner: Arc<Mutex<Running>>,
}

impl PurgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deletion in `chat`, or `None` if one is already running.
    pub fn begin(&self, chat: ChatId) -> Option<PurgeGuard> {
        let mut running = self.inner.lock().ok()?;
        if running.chats.contains_key(&chat) {
            return None;
        }
        running.next_id += 1;
        let id = running.next_id;
        let token = CancellationToken::new();
        running.chats.insert(chat, (id, token.clone()));

        Some(PurgeGuard {
            registry: Arc::clone(&self.inner),
            chat,
            id,
            token,
        })
    }

    /// Cancel the deletion running in `chat`. Returns whether there was one.
    pub fn stop(&self, chat: ChatId) -> bool {
        let Ok(mut running) = self.inner.lock() else {
            return false;
        };
        match running.chats.remove(&chat) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, chat: ChatId) -> bool {
        self.inner
            .lock()
            .map(|r| r.chats.contains_key(&chat))
            .unwrap_or(false)
    }
}

/// Registration of one running deletion; unregisters on drop.
#[derive(Debug)]
pub struct PurgeGuard {
    registry: Arc<Mutex<Running>>,
    chat: ChatId,
    id: u64,
    token: CancellationToken,
}

impl PurgeGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PurgeGuard {
    fn drop(&mut self) {
        if let Ok(mut running) = self.registry.lock() {
            // A stopped deletion may already have been replaced by a new one.
            if running.chats.get(&self.chat).map(|(id, _)| *id) == Some(self.id) {
                running.chats.remove(&self.chat);
            }
        }
    }
}

// ============== Deletion loop ==============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurgeOutcome {
    AlreadyRunning,
    Finished { deleted: usize },
    Stopped { deleted: usize },
}

fn progress(deleted: usize, limit: Option<usize>) -> String {
    match limit {
        Some(limit) => format!("Deletion in progress ({deleted}/{limit})..."),
        None => format!("Deletion in progress ({deleted}/\u{221e})..."),
    }
}

/// Delete up to `limit` recent messages (all of them for `None`) in `chat`.
///
/// Pinned messages and the progress notice are kept. Progress is reported by
/// editing the notice.
pub async fn purge_channel<P, H>(
    port: &P,
    history: &H,
    registry: &PurgeRegistry,
    chat: ChatId,
    limit: Option<usize>,
) -> Result<PurgeOutcome>
where
    P: MessagingPort + ?Sized,
    H: ChannelHistory + ?Sized,
{
    let Some(guard) = registry.begin(chat) else {
        port.send_html(chat, ALREADY_RUNNING_REPLY).await?;
        return Ok(PurgeOutcome::AlreadyRunning);
    };

    let notice = port.send_html(chat, "Starting mass deletion...").await?;
    let mut keep: HashSet<MessageId> = history.pinned(chat).await?.into_iter().collect();
    keep.insert(notice.message_id);

    tracing::info!(chat = chat.0, ?limit, pinned = keep.len() - 1, "mass deletion started");

    let mut deleted = 0usize;
    while !guard.is_cancelled() {
        port.edit_html(notice, &progress(deleted, limit)).await?;

        let want = match limit {
            Some(limit) => limit.saturating_sub(deleted),
            None => BATCH_SIZE,
        };
        if want == 0 {
            break;
        }

        let batch: Vec<MessageId> = history
            .recent_before(chat, notice.message_id, want)
            .await?
            .into_iter()
            .filter(|id| !keep.contains(id))
            .collect();
        if batch.is_empty() {
            break;
        }

        let removed = delete_batch(history, chat, &batch).await?;
        deleted += removed;
        tracing::debug!(chat = chat.0, removed, deleted, "deleted batch");
        if removed == 0 {
            break;
        }
    }

    let stopped = guard.is_cancelled();
    drop(guard);

    port.edit_html(notice, &format!("Deleted {deleted} messages."))
        .await?;
    tracing::info!(chat = chat.0, deleted, stopped, "mass deletion finished");

    Ok(if stopped {
        PurgeOutcome::Stopped { deleted }
    } else {
        PurgeOutcome::Finished { deleted }
    })
}

/// Bulk delete, falling back to one-by-one when part of the batch is stale.
async fn delete_batch<H>(history: &H, chat: ChatId, batch: &[MessageId]) -> Result<usize>
where
    H: ChannelHistory + ?Sized,
{
    match history.delete_bulk(chat, batch).await {
        Ok(()) => return Ok(batch.len()),
        Err(Error::Stale(reason)) => {
            tracing::debug!(chat = chat.0, %reason, "bulk delete hit stale messages, retrying one by one");
        }
        Err(e) => return Err(e),
    }

    let mut removed = 0usize;
    for &message_id in batch {
        let msg = MessageRef {
            chat_id: chat,
            message_id,
        };
        match history.delete_one(msg).await {
            Ok(()) => removed += 1,
            Err(Error::Stale(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

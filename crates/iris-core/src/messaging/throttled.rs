use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::Mutex,
    time::{sleep, Instant},
};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Minimum spacing between outbound calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Between any two calls (bot-wide flood limit).
    pub global_min_interval: Duration,
    /// Between two calls to the same chat.
    pub per_chat_min_interval: Duration,
}

impl ThrottleConfig {
    pub fn from_millis(global: u64, per_chat: u64) -> Self {
        Self {
            global_min_interval: Duration::from_millis(global),
            per_chat_min_interval: Duration::from_millis(per_chat),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        // ~25 calls/s overall, just under 1 call/s per chat.
        Self::from_millis(40, 1050)
    }
}

/// Hands out evenly spaced time slots.
#[derive(Debug)]
struct Slots {
    interval: Duration,
    next: Instant,
}

impl Slots {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Claim the next free slot; returns how long to wait for it.
    fn claim(&mut self, now: Instant) -> Duration {
        let start = self.next.max(now);
        self.next = start + self.interval;
        start - now
    }
}

/// [`MessagingPort`] decorator spacing calls out to stay under flood limits.
///
/// Slots are claimed in call order, so concurrent callers are served FIFO.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<Slots>,
    per_chat: Mutex<HashMap<ChatId, Slots>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(Slots::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> ThrottleConfig {
        self.cfg
    }

    async fn wait_turn(&self, chat_id: ChatId) {
        let now = Instant::now();
        let global_wait = self.global.lock().await.claim(now);
        let chat_wait = {
            let mut chats = self.per_chat.lock().await;
            chats
                .entry(chat_id)
                .or_insert_with(|| Slots::new(self.cfg.per_chat_min_interval))
                .claim(now)
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            tracing::trace!(chat = chat_id.0, wait_ms = wait.as_millis() as u64, "throttling");
            sleep(wait).await;
        }
    }
}

#[async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.wait_turn(chat_id).await;
        self.inner.send_html(chat_id, html).await
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.wait_turn(msg.chat_id).await;
        self.inner.edit_html(msg, html).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.wait_turn(msg.chat_id).await;
        self.inner.delete_message(msg).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::domain::MessageId;

    /// Records the (paused) instant of every call.
    #[derive(Default)]
    struct Clock {
        calls: StdMutex<Vec<(i64, Instant)>>,
    }

    #[async_trait]
    impl MessagingPort for Clock {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities::default()
        }

        async fn send_html(&self, chat_id: ChatId, _html: &str) -> Result<MessageRef> {
            self.calls.lock().unwrap().push((chat_id.0, Instant::now()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(1),
            })
        }

        async fn edit_html(&self, msg: MessageRef, _html: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((msg.chat_id.0, Instant::now()));
            Ok(())
        }

        async fn delete_message(&self, _msg: MessageRef) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_calls_to_the_same_chat() {
        let clock = Arc::new(Clock::default());
        let throttled = ThrottledMessenger::new(clock.clone(), ThrottleConfig::from_millis(10, 500));
        let start = Instant::now();

        for _ in 0..3 {
            throttled.send_html(ChatId(1), "x").await.unwrap();
        }

        let offsets: Vec<u128> = clock
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, at)| (*at - start).as_millis())
            .collect();
        assert_eq!(offsets, vec![0, 500, 1000]);
    }

    #[tokio::test(start_paused = true)]
    async fn other_chats_only_pay_the_global_interval() {
        let clock = Arc::new(Clock::default());
        let throttled = ThrottledMessenger::new(clock.clone(), ThrottleConfig::from_millis(10, 500));
        let start = Instant::now();

        throttled.send_html(ChatId(1), "x").await.unwrap();
        throttled.send_html(ChatId(2), "x").await.unwrap();
        let msg = MessageRef {
            chat_id: ChatId(3),
            message_id: MessageId(9),
        };
        throttled.edit_html(msg, "y").await.unwrap();

        let calls = clock.calls.lock().unwrap().clone();
        let offsets: Vec<(i64, u128)> = calls
            .iter()
            .map(|(chat, at)| (*chat, (*at - start).as_millis()))
            .collect();
        assert_eq!(offsets, vec![(1, 0), (2, 10), (3, 20)]);
    }

    #[test]
    fn default_matches_telegram_limits() {
        let cfg = ThrottleConfig::default();
        assert_eq!(cfg.global_min_interval, Duration::from_millis(40));
        assert_eq!(cfg.per_chat_min_interval, Duration::from_millis(1050));
    }
}

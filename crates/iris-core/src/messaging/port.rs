use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound messenger port.
///
/// Text is sent in the messenger's rich markup (HTML for Telegram); callers
/// build it with [`crate::formatting::Markup`].
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;
    async fn delete_message(&self, msg: MessageRef) -> Result<()>;
}

/// Send `pages` in order as separate messages.
///
/// Stops at the first failed send; pages already sent stay sent.
pub async fn send_pages<P>(port: &P, chat_id: ChatId, pages: &[String]) -> Result<Vec<MessageRef>>
where
    P: MessagingPort + ?Sized,
{
    let mut sent = Vec::with_capacity(pages.len());
    for (idx, page) in pages.iter().enumerate() {
        tracing::debug!(chat = chat_id.0, page = idx + 1, total = pages.len(), "sending page");
        sent.push(port.send_html(chat_id, page).await?);
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{domain::MessageId, Error};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl MessagingPort for Recorder {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities::default()
        }

        async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_on == Some(sent.len()) {
                return Err(Error::External("boom".to_string()));
            }
            sent.push(html.to_string());
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sent.len() as i32),
            })
        }

        async fn edit_html(&self, _msg: MessageRef, _html: &str) -> Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _msg: MessageRef) -> Result<()> {
            Ok(())
        }
    }

    fn pages() -> Vec<String> {
        vec!["one".to_string(), "two".to_string(), "three".to_string()]
    }

    #[tokio::test]
    async fn sends_pages_in_order() {
        let port = Recorder::default();
        let refs = send_pages(&port, ChatId(7), &pages()).await.unwrap();

        assert_eq!(*port.sent.lock().unwrap(), pages());
        let ids: Vec<i32> = refs.iter().map(|r| r.message_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let port = Recorder {
            fail_on: Some(1),
            ..Recorder::default()
        };
        let err = send_pages(&port, ChatId(7), &pages()).await.unwrap_err();

        assert!(matches!(err, Error::External(_)));
        assert_eq!(*port.sent.lock().unwrap(), vec!["one".to_string()]);
    }
}

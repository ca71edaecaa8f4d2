use crate::domain::{ChatId, UserId};

/// A parsed `/name args` command.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingCommand {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub name: String,
    pub args: String,
}

impl IncomingCommand {
    /// Parse `text` as a command with the given prefix.
    ///
    /// `/cmd@botname` addressing is accepted and the bot name dropped. Command
    /// names are lower-cased; arguments keep their case, trimmed.
    pub fn parse(chat_id: ChatId, user_id: UserId, prefix: &str, text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix(prefix)?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() {
            return None;
        }

        Some(Self {
            chat_id,
            user_id,
            name: name.to_lowercase(),
            args: args.to_string(),
        })
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_edit: bool,
    pub max_message_len: usize,
}

impl Default for MessagingCapabilities {
    fn default() -> Self {
        Self {
            supports_html: true,
            supports_edit: true,
            max_message_len: 4096,
        }
    }
}

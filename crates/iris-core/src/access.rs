//! Who may use the bot, and where.

use regex::Regex;

use crate::Result;

/// Channel names the bot answers in when no whitelist is configured.
pub const DEFAULT_CHANNEL_REGEX: &str = r"^bots?($|[-_].*)";

/// Reply sent when a command needs permissions the caller or the bot lacks.
pub const MISSING_PERMISSIONS_REPLY: &str = "Permissions check failed. Either you're not allowed \
to use that command or the bot is missing a permission required to execute it.";

/// The invoking user and the chat they invoked from.
#[derive(Clone, Debug, Default)]
pub struct Caller {
    /// `None` for chats without a title (private chats).
    pub chat_title: Option<String>,
    pub is_private: bool,
    /// Lower-cased role names.
    pub roles: Vec<String>,
}

impl Caller {
    pub fn new(chat_title: Option<String>, is_private: bool, roles: Vec<String>) -> Self {
        Self {
            chat_title,
            is_private,
            roles: roles.into_iter().map(|r| r.to_lowercase()).collect(),
        }
    }
}

/// Global command gate.
#[derive(Clone, Debug)]
pub struct AccessPolicy {
    pub superuser_roles: Vec<String>,
    pub channel_whitelist: Vec<String>,
    pub channel_blacklist: Vec<String>,
    pub channel_regex: Option<Regex>,
    pub role_whitelist: Vec<String>,
    pub role_blacklist: Vec<String>,
    pub allow_private: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            superuser_roles: Vec::new(),
            channel_whitelist: Vec::new(),
            channel_blacklist: Vec::new(),
            channel_regex: None,
            role_whitelist: Vec::new(),
            role_blacklist: Vec::new(),
            allow_private: true,
        }
    }
}

impl AccessPolicy {
    /// Build a policy, lower-casing every name and compiling `channel_regex`.
    ///
    /// The pattern is anchored at the start of the channel name.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        superuser_roles: Vec<String>,
        channel_whitelist: Vec<String>,
        channel_blacklist: Vec<String>,
        channel_regex: Option<&str>,
        role_whitelist: Vec<String>,
        role_blacklist: Vec<String>,
        allow_private: bool,
    ) -> Result<Self> {
        let channel_regex = match channel_regex.filter(|p| !p.trim().is_empty()) {
            Some(pattern) => Some(Regex::new(&format!("^(?:{pattern})"))?),
            None => None,
        };

        Ok(Self {
            superuser_roles: lower_all(superuser_roles),
            channel_whitelist: lower_all(channel_whitelist),
            channel_blacklist: lower_all(channel_blacklist),
            channel_regex,
            role_whitelist: lower_all(role_whitelist),
            role_blacklist: lower_all(role_blacklist),
            allow_private,
        })
    }

    pub fn is_superuser(&self, caller: &Caller) -> bool {
        caller
            .roles
            .iter()
            .any(|r| self.superuser_roles.contains(r))
    }

    pub fn is_allowed(&self, caller: &Caller) -> bool {
        if self.is_superuser(caller) {
            return true;
        }
        self.channel_allowed(caller) && self.roles_allowed(caller)
    }

    fn channel_allowed(&self, caller: &Caller) -> bool {
        if caller.is_private {
            return self.allow_private;
        }

        let name = caller
            .chat_title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        if !self.channel_whitelist.is_empty() {
            return self.channel_whitelist.contains(&name);
        }
        if self.channel_blacklist.contains(&name) {
            return false;
        }
        match &self.channel_regex {
            Some(re) => re.is_match(&name),
            None => true,
        }
    }

    fn roles_allowed(&self, caller: &Caller) -> bool {
        if !self.role_whitelist.is_empty() {
            return caller.roles.iter().any(|r| self.role_whitelist.contains(r));
        }
        if !self.role_blacklist.is_empty() {
            return !caller.roles.iter().any(|r| self.role_blacklist.contains(r));
        }
        true
    }
}

/// Moderation rights relevant to admin commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Permissions {
    pub delete_messages: bool,
    pub restrict_members: bool,
}

impl Permissions {
    pub const NONE: Self = Self {
        delete_messages: false,
        restrict_members: false,
    };

    pub const ALL: Self = Self {
        delete_messages: true,
        restrict_members: true,
    };

    /// Every right in `required` is also held here.
    pub fn covers(&self, required: Permissions) -> bool {
        (!required.delete_messages || self.delete_messages)
            && (!required.restrict_members || self.restrict_members)
    }
}

/// Both the caller and the bot must hold `required`.
pub fn check_permissions(caller: Permissions, bot: Permissions, required: Permissions) -> bool {
    caller.covers(required) && bot.covers(required)
}

fn lower_all(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    access::{AccessPolicy, DEFAULT_CHANNEL_REGEX},
    errors::Error,
    messaging::ThrottleConfig,
    roles::{DEFAULT_AUTO_ROLE_PREFIX, DEFAULT_OPT_ROLE_PREFIX},
    settings::Settings,
    Result,
};

/// Hard cap on a single Telegram message, in bytes of text.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Typed bot configuration.
///
/// Scalars come from the environment (and `.env`); list-valued settings may
/// also come from the JSON settings file. Environment values win.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub command_prefix: String,
    pub settings_file: PathBuf,

    // Help output
    pub help_page_limit: usize,

    // Access
    pub channel_whitelist: Vec<String>,
    pub channel_blacklist: Vec<String>,
    pub channel_regex: Option<String>,
    pub role_whitelist: Vec<String>,
    pub role_blacklist: Vec<String>,
    pub superuser_roles: Vec<String>,
    pub allow_private: bool,

    // Roles
    pub opt_role_prefix: String,
    pub auto_role_prefix: String,

    // Moderation
    pub delete_default_count: usize,
    pub history_capacity: usize,

    // Outbound rate limiting
    pub throttle: ThrottleConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let settings_file =
            PathBuf::from(env_str("IRIS_SETTINGS_FILE").unwrap_or("iris.json".to_string()));
        let settings = Settings::load(&settings_file)?;

        Self::from_sources(|key| env::var(key).ok(), settings_file, settings)
    }

    /// Build from an environment lookup and already-loaded file settings.
    pub fn from_sources<F>(env: F, settings_file: PathBuf, settings: Settings) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram_bot_token = env("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let command_prefix = env("BOT_COMMAND_PREFIX")
            .and_then(non_empty)
            .unwrap_or("/".to_string());

        let help_page_limit = parse::<usize>(&env, "HELP_PAGE_LIMIT")?
            .unwrap_or(4000)
            .min(TELEGRAM_MESSAGE_LIMIT);
        if help_page_limit == 0 {
            return Err(Error::Config("HELP_PAGE_LIMIT must be positive".to_string()));
        }

        // Lists: env CSV, then settings file, then empty.
        let list = |key: &str, from_file: Option<Vec<String>>| {
            parse_csv(env(key)).or(from_file).unwrap_or_default()
        };
        let channel_whitelist = list("BOT_CHANNEL_WHITELIST", settings.channel_whitelist);
        let channel_blacklist = list("BOT_CHANNEL_BLACKLIST", settings.channel_blacklist);
        let role_whitelist = list("BOT_ROLE_WHITELIST", settings.role_whitelist);
        let role_blacklist = list("BOT_ROLE_BLACKLIST", settings.role_blacklist);
        let superuser_roles = list("BOT_SUPERUSER_ROLES", settings.superuser_roles);

        // An explicitly empty pattern disables the channel check.
        let channel_regex = env("BOT_CHANNEL_REGEX")
            .or(settings.channel_regex)
            .unwrap_or(DEFAULT_CHANNEL_REGEX.to_string());
        let channel_regex = non_empty(channel_regex);

        let allow_private = match env("BOT_ALLOW_PRIVATE") {
            Some(v) => parse_bool(&v),
            None => settings.allow_private.unwrap_or(true),
        };

        let opt_role_prefix = env("OPT_ROLE_PREFIX")
            .or(settings.opt_role_prefix)
            .unwrap_or(DEFAULT_OPT_ROLE_PREFIX.to_string());
        let auto_role_prefix = env("AUTO_ROLE_PREFIX")
            .or(settings.auto_role_prefix)
            .unwrap_or(DEFAULT_AUTO_ROLE_PREFIX.to_string());

        let delete_default_count = parse::<usize>(&env, "DELETE_DEFAULT_COUNT")?.unwrap_or(50);
        let history_capacity = parse::<usize>(&env, "HISTORY_CAPACITY")?.unwrap_or(1000);

        let defaults = ThrottleConfig::default();
        let throttle = ThrottleConfig::from_millis(
            parse::<u64>(&env, "THROTTLE_GLOBAL_MS")?
                .unwrap_or(defaults.global_min_interval.as_millis() as u64),
            parse::<u64>(&env, "THROTTLE_CHAT_MS")?
                .unwrap_or(defaults.per_chat_min_interval.as_millis() as u64),
        );

        let config = Self {
            telegram_bot_token,
            command_prefix,
            settings_file,
            help_page_limit,
            channel_whitelist,
            channel_blacklist,
            channel_regex,
            role_whitelist,
            role_blacklist,
            superuser_roles,
            allow_private,
            opt_role_prefix,
            auto_role_prefix,
            delete_default_count,
            history_capacity,
            throttle,
        };

        // Surface a bad pattern at startup rather than on the first message.
        config.access_policy()?;
        Ok(config)
    }

    pub fn access_policy(&self) -> Result<AccessPolicy> {
        AccessPolicy::new(
            self.superuser_roles.clone(),
            self.channel_whitelist.clone(),
            self.channel_blacklist.clone(),
            self.channel_regex.as_deref(),
            self.role_whitelist.clone(),
            self.role_blacklist.clone(),
            self.allow_private,
        )
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

/// `KEY=value` pairs; blank lines and `#` comments are skipped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }

        out.push((key.to_string(), val.to_string()));
    }
    out
}

fn parse<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = env(key).and_then(non_empty) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} is not a valid number: {raw:?}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `None` when unset, so the settings file can fill in.
fn parse_csv(v: Option<String>) -> Option<Vec<String>> {
    let v = v?;
    Some(
        v.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

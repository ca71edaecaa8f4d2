use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use iris_core::{
    access::AccessPolicy,
    config::Config,
    formatting::Markup,
    help::{HelpFormatter, Registry},
    messaging::{MessagingPort, ThrottledMessenger},
    purge::PurgeRegistry,
};

use crate::{
    handlers,
    history::{RecentMessages, TelegramHistory},
    registry, TelegramMessenger,
};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub policy: Arc<AccessPolicy>,
    pub messenger: Arc<dyn MessagingPort>,
    pub recent: Arc<RecentMessages>,
    pub history: Arc<TelegramHistory>,
    pub purges: PurgeRegistry,
    pub registry: Arc<Registry>,
    pub help: HelpFormatter,
    pub bot_user: teloxide::types::UserId,
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    tracing::info!(username = %me.username(), "iris started");

    let policy = Arc::new(cfg.access_policy()?);
    tracing::info!(
        channel_regex = ?cfg.channel_regex,
        whitelist = cfg.channel_whitelist.len(),
        superuser_roles = cfg.superuser_roles.len(),
        "access policy loaded"
    );

    let registry = Arc::new(registry::build(cfg.delete_default_count, Markup::Html));
    if let Err(e) = bot
        .set_my_commands(registry::bot_commands(&registry))
        .await
    {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    // Throttle outbound calls to stay under Telegram's flood limits; the
    // adapter still retries once on RetryAfter.
    let recent = Arc::new(RecentMessages::new(cfg.history_capacity));
    let raw_messenger: Arc<dyn MessagingPort> =
        Arc::new(TelegramMessenger::new(bot.clone(), recent.clone()));
    let messenger: Arc<dyn MessagingPort> =
        Arc::new(ThrottledMessenger::new(raw_messenger, cfg.throttle));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        policy,
        messenger,
        recent: recent.clone(),
        history: Arc::new(TelegramHistory::new(bot.clone(), recent)),
        purges: PurgeRegistry::new(),
        registry,
        help: HelpFormatter::new(cfg.command_prefix.clone(), Markup::Html, cfg.help_page_limit),
        bot_user: me.id,
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("iris stopped");
    Ok(())
}

use std::sync::Arc;

use teloxide::{prelude::*, types::ChatMember};

use iris_core::{
    access::{check_permissions, Permissions, MISSING_PERMISSIONS_REPLY},
    domain::ChatId,
    formatting::{escape_html, Markup},
    help::admin_help,
    messaging::{send_pages, IncomingCommand},
    paginate::Node,
    purge::{purge_channel, PurgeOutcome, NOT_RUNNING_REPLY, STOPPED_REPLY},
};

use crate::router::AppState;

use super::permissions_of;

const DELETE: Permissions = Permissions {
    delete_messages: true,
    restrict_members: false,
};

const BAN: Permissions = Permissions {
    delete_messages: false,
    restrict_members: true,
};

/// What `/delete <args>` asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeleteRequest {
    Count(usize),
    All,
    Stop,
    Invalid,
}

impl DeleteRequest {
    fn parse(args: &str, default_count: usize) -> Self {
        match args.trim().to_lowercase().as_str() {
            "" => Self::Count(default_count),
            "all" => Self::All,
            "stop" => Self::Stop,
            n => n.parse().map(Self::Count).unwrap_or(Self::Invalid),
        }
    }
}

async fn reply(state: &AppState, chat_id: ChatId, html: &str) {
    if let Err(e) = state.messenger.send_html(chat_id, html).await {
        tracing::warn!(chat = chat_id.0, error = %e, "failed to send reply");
    }
}

async fn reply_pages(state: &AppState, chat_id: ChatId, node: impl Into<Node>) {
    let pages = match state.help.pages(node) {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!(chat = chat_id.0, error = %e, "help output does not fit a message");
            reply(state, chat_id, "Sorry, that help text is too long to display.").await;
            return;
        }
    };
    if let Err(e) = send_pages(state.messenger.as_ref(), chat_id, &pages).await {
        tracing::warn!(chat = chat_id.0, error = %e, "failed to send help pages");
    }
}

/// Both the caller and the bot must hold `required` in this chat.
async fn has_permissions(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    caller: Option<&ChatMember>,
    required: Permissions,
) -> bool {
    if msg.chat.is_private() {
        return false;
    }
    let bot_member = match bot.get_chat_member(msg.chat.id, state.bot_user).await {
        Ok(member) => Some(member),
        Err(e) => {
            tracing::warn!(chat = msg.chat.id.0, error = %e, "failed to fetch bot membership");
            None
        }
    };
    check_permissions(
        permissions_of(caller),
        permissions_of(bot_member.as_ref()),
        required,
    )
}

pub(super) async fn handle_command(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    cmd: IncomingCommand,
    member: Option<ChatMember>,
) -> ResponseResult<()> {
    let chat_id = cmd.chat_id;
    tracing::info!(chat = chat_id.0, user = cmd.user_id.0, command = %cmd.name, "command");

    match cmd.name.as_str() {
        "help" | "start" => {
            let help = state.help.clone().invoked_with(cmd.name.as_str());
            let block = help.resolve(&state.registry, &cmd.args);
            reply_pages(&state, chat_id, block).await;
        }

        "adminhelp" => {
            let block = admin_help(&state.registry, Some(cmd.args.as_str()), Markup::Html);
            reply_pages(&state, chat_id, block).await;
        }

        "delete" => {
            if !has_permissions(&bot, &msg, &state, member.as_ref(), DELETE).await {
                reply(&state, chat_id, MISSING_PERMISSIONS_REPLY).await;
                return Ok(());
            }

            let limit = match DeleteRequest::parse(&cmd.args, state.cfg.delete_default_count) {
                DeleteRequest::Count(n) => Some(n),
                DeleteRequest::All => None,
                DeleteRequest::Stop => {
                    let text = if state.purges.stop(chat_id) {
                        STOPPED_REPLY
                    } else {
                        NOT_RUNNING_REPLY
                    };
                    reply(&state, chat_id, text).await;
                    return Ok(());
                }
                DeleteRequest::Invalid => {
                    let usage = state.help.resolve(&state.registry, "delete");
                    reply_pages(&state, chat_id, usage).await;
                    return Ok(());
                }
            };

            // Updates from one chat are handled in order, so the deletion runs
            // on its own task to let `/delete stop` through.
            let state = state.clone();
            tokio::spawn(async move {
                let outcome = purge_channel(
                    state.messenger.as_ref(),
                    state.history.as_ref(),
                    &state.purges,
                    chat_id,
                    limit,
                )
                .await;
                match outcome {
                    Ok(PurgeOutcome::AlreadyRunning) => {}
                    Ok(done) => tracing::info!(chat = chat_id.0, ?done, "mass deletion done"),
                    Err(e) => tracing::warn!(chat = chat_id.0, error = %e, "mass deletion failed"),
                }
            });
        }

        "ban_id" => {
            if !has_permissions(&bot, &msg, &state, member.as_ref(), BAN).await {
                reply(&state, chat_id, MISSING_PERMISSIONS_REPLY).await;
                return Ok(());
            }

            let arg = cmd.args.trim();
            let Ok(id) = arg.parse::<u64>() else {
                let text = format!("Invalid user ID <code>{}</code>.", escape_html(arg));
                reply(&state, chat_id, &text).await;
                return Ok(());
            };

            match bot.ban_chat_member(msg.chat.id, teloxide::types::UserId(id)).await {
                Ok(_) => reply(&state, chat_id, &format!("Banned user ID {id}.")).await,
                Err(e) => {
                    tracing::warn!(chat = chat_id.0, user = id, error = %e, "ban failed");
                    let text = format!("Could not ban user ID {id}: {}", escape_html(&e.to_string()));
                    reply(&state, chat_id, &text).await;
                }
            }
        }

        other => tracing::debug!(command = other, "no handler for command"),
    }

    Ok(())
}

//! Telegram update handlers.
//!
//! Every message is recorded for mass deletion. Commands then pass the global
//! access policy before being dispatched; denied callers get no reply.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Chat, ChatMember, ChatMemberStatus, Message},
};

use iris_core::{
    access::{Caller, Permissions},
    domain::{ChatId, MessageId, UserId},
    messaging::IncomingCommand,
};

use crate::router::AppState;

mod commands;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    state.recent.record(chat_id, MessageId(msg.id.0), msg.date);

    let (Some(user), Some(text)) = (msg.from(), msg.text()) else {
        return Ok(());
    };
    let Some(cmd) = IncomingCommand::parse(
        chat_id,
        UserId(user.id.0 as i64),
        &state.cfg.command_prefix,
        text,
    ) else {
        return Ok(());
    };
    if state.registry.find_command(&cmd.name).is_none() {
        tracing::debug!(command = %cmd.name, "ignoring unknown command");
        return Ok(());
    }

    let member = if msg.chat.is_private() {
        None
    } else {
        match bot.get_chat_member(msg.chat.id, user.id).await {
            Ok(member) => Some(member),
            Err(e) => {
                tracing::warn!(chat = chat_id.0, error = %e, "failed to fetch caller membership");
                None
            }
        }
    };

    let caller = caller_for(&msg.chat, member.as_ref());
    if !state.policy.is_allowed(&caller) {
        tracing::debug!(chat = chat_id.0, command = %cmd.name, "command denied by access policy");
        return Ok(());
    }

    commands::handle_command(bot, msg, state, cmd, member).await
}

/// Telegram has no custom roles; a member's status stands in for one.
fn status_role(status: ChatMemberStatus) -> &'static str {
    match status {
        ChatMemberStatus::Owner => "owner",
        ChatMemberStatus::Administrator => "administrator",
        ChatMemberStatus::Member => "member",
        ChatMemberStatus::Restricted => "restricted",
        ChatMemberStatus::Left => "left",
        ChatMemberStatus::Banned => "banned",
    }
}

fn caller_for(chat: &Chat, member: Option<&ChatMember>) -> Caller {
    let roles = member
        .map(|m| vec![status_role(m.kind.status()).to_string()])
        .unwrap_or_default();
    Caller::new(chat.title().map(str::to_string), chat.is_private(), roles)
}

pub(crate) fn permissions_of(member: Option<&ChatMember>) -> Permissions {
    match member {
        Some(m) => Permissions {
            delete_messages: m.kind.can_delete_messages(),
            restrict_members: m.kind.can_restrict_members(),
        },
        None => Permissions::NONE,
    }
}

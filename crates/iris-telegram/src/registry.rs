//! The bot's commands, as shown in help and in the Telegram command menu.

use teloxide::types::BotCommand;

use iris_core::{
    formatting::Markup,
    help::{Category, CommandInfo, Param, Registry},
};

pub const ADMIN_CATEGORY: &str = "Admin";

pub fn build(delete_default_count: usize, markup: Markup) -> Registry {
    let admin_notes = format!(
        "Mass deletion only reaches messages the bot has seen while running, and \
Telegram refuses to delete messages older than 48 hours. Pinned messages are \
always kept.\n\n\
Both {} and {} require the caller and the bot to be chat administrators with \
the matching right.",
        markup.code("delete"),
        markup.code("ban_id"),
    );

    Registry::new()
        .category(
            Category::new(ADMIN_CATEGORY)
                .description("Moderation tools for chat administrators.")
                .admin_help(admin_notes)
                .command(
                    CommandInfo::new("delete")
                        .param(Param::with_default(
                            "num_messages",
                            delete_default_count.to_string(),
                        ))
                        .help(
                            "Delete recent messages from this chat.\n\n\
Pinned messages will be skipped. Requires the 'Delete messages' right.",
                        )
                        .subcommand(CommandInfo::new("all").help(
                            "Delete all messages from this chat.\n\n\
Pinned messages will be skipped. Requires the 'Delete messages' right.",
                        ))
                        .subcommand(
                            CommandInfo::new("stop")
                                .help("Stop an in-progress message deletion in this chat."),
                        ),
                )
                .command(
                    CommandInfo::new("ban_id")
                        .param(Param::required("id"))
                        .help(
                            "Bans a user by their Telegram ID.\n\n\
This can be used to preemptively ban a user who hasn't joined this chat yet.",
                        ),
                ),
        )
        .command(
            CommandInfo::new("help")
                .alias("start")
                .param(Param::variadic("query"))
                .help("Shows this message."),
        )
        .command(
            CommandInfo::new("adminhelp")
                .param(Param::optional("category"))
                .help("Gives admin-relevant details about this bot."),
        )
}

/// Entries for `setMyCommands`: every visible top-level command.
pub fn bot_commands(registry: &Registry) -> Vec<BotCommand> {
    registry
        .commands()
        .filter(|c| !c.hidden)
        .map(|c| BotCommand::new(c.name.clone(), c.summary().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use iris_core::{help::HelpFormatter, paginate::Paginable};

    use super::*;

    #[test]
    fn registers_every_command_in_the_menu() {
        let registry = build(50, Markup::Html);
        let names: Vec<String> = bot_commands(&registry)
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(names, vec!["delete", "ban_id", "help", "adminhelp"]);
    }

    #[test]
    fn help_pages_fit_telegram_limit() {
        let registry = build(50, Markup::Html);
        let fmt = HelpFormatter::new("/", Markup::Html, 4000);

        let pages = fmt.pages(fmt.bot_help(&registry)).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("<b>Admin</b>"));
        assert!(pages[0].contains("<code>/delete [num_messages]</code>"));

        let usage = fmt.resolve(&registry, "delete").render();
        assert!(usage.contains("<code>/delete [num_messages=50]</code>"));
        assert!(usage.contains("<code>/delete stop</code>"));
    }
}

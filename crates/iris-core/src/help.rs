//! Help rendering: turns a command registry into a pagination tree.
//!
//! One [`Section`] per category, one [`Leaf`] per command (signature plus
//! summary). The resulting tree is paginated against the page budget and each
//! page is sent as its own message.

use std::sync::Arc;

use crate::{
    formatting::Markup,
    paginate::{render_pages, Block, HeaderStyle, Leaf, Node, Section},
    utils::{pretty_list, ListStyle},
    Result,
};

const OTHER_CATEGORY: &str = "\u{200b}Other";

// ============== Registry ==============

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    Optional { default: Option<String> },
    Variadic,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Required,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Optional { default: None },
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Optional {
                default: Some(default.into()),
            },
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Variadic,
        }
    }
}

/// Static description of a command, as shown in help.
#[derive(Clone, Debug, Default)]
pub struct CommandInfo {
    pub name: String,
    pub aliases: Vec<String>,
    pub params: Vec<Param>,
    /// One-line summary; falls back to the first line of `help`.
    pub brief: Option<String>,
    pub help: Option<String>,
    pub description: Option<String>,
    pub hidden: bool,
    pub subcommands: Vec<CommandInfo>,
}

impl CommandInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn subcommand(mut self, cmd: CommandInfo) -> Self {
        self.subcommands.push(cmd);
        self
    }

    pub fn is_group(&self) -> bool {
        !self.subcommands.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    pub fn summary(&self) -> &str {
        if let Some(brief) = &self.brief {
            return brief;
        }
        self.help
            .as_deref()
            .and_then(|h| h.lines().find(|l| !l.trim().is_empty()))
            .map(str::trim)
            .unwrap_or("")
    }

    pub fn find_subcommand(&self, name: &str) -> Option<&CommandInfo> {
        self.subcommands.iter().find(|c| c.matches(name))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Category {
    pub name: String,
    pub description: Option<String>,
    /// Moderator-facing notes shown by `adminhelp`, already in target markup.
    pub admin_help: Option<String>,
    pub commands: Vec<CommandInfo>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn admin_help(mut self, text: impl Into<String>) -> Self {
        self.admin_help = Some(text.into());
        self
    }

    pub fn command(mut self, cmd: CommandInfo) -> Self {
        self.commands.push(cmd);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    pub categories: Vec<Category>,
    pub uncategorized: Vec<CommandInfo>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn command(mut self, cmd: CommandInfo) -> Self {
        self.uncategorized.push(cmd);
        self
    }

    pub fn find_category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Top-level command by name or alias.
    pub fn find_command(&self, name: &str) -> Option<&CommandInfo> {
        self.commands().find(|c| c.matches(name))
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandInfo> {
        self.categories
            .iter()
            .flat_map(|c| c.commands.iter())
            .chain(self.uncategorized.iter())
    }
}

/// Visible commands, sorted by name.
fn visible_sorted(commands: &[CommandInfo]) -> Vec<&CommandInfo> {
    let mut out: Vec<&CommandInfo> = commands.iter().filter(|c| !c.hidden).collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

// ============== Formatter ==============

#[derive(Clone, Debug)]
pub struct HelpFormatter {
    prefix: String,
    invoked_with: String,
    markup: Markup,
    page_budget: usize,
    style: Arc<HeaderStyle>,
}

impl HelpFormatter {
    pub fn new(prefix: impl Into<String>, markup: Markup, page_budget: usize) -> Self {
        Self {
            prefix: prefix.into(),
            invoked_with: "help".to_string(),
            markup,
            page_budget,
            style: Arc::new(markup.header_style()),
        }
    }

    /// Name the help command was invoked as (used in the ending note).
    pub fn invoked_with(mut self, name: impl Into<String>) -> Self {
        self.invoked_with = name.into();
        self
    }

    pub fn markup(&self) -> Markup {
        self.markup
    }

    pub fn page_budget(&self) -> usize {
        self.page_budget
    }

    fn qualified(&self, parents: &[&str], name: &str) -> String {
        let mut out = self.prefix.clone();
        for parent in parents {
            out.push_str(parent);
            out.push(' ');
        }
        out.push_str(name);
        out
    }

    /// Signature without aliases or defaults: `/delete [num_messages]`.
    pub fn short_signature(&self, cmd: &CommandInfo, parents: &[&str]) -> String {
        let mut parts = vec![self.qualified(parents, &cmd.name)];
        for param in &cmd.params {
            parts.push(match &param.kind {
                ParamKind::Required => format!("<{}>", param.name),
                ParamKind::Optional { .. } => format!("[{}]", param.name),
                ParamKind::Variadic => format!("[{}\u{2026}]", param.name),
            });
        }
        parts.join(" ")
    }

    /// Usage signature with aliases and defaults: `/[help|start] [query]`.
    pub fn full_signature(&self, cmd: &CommandInfo, parents: &[&str]) -> String {
        let name = if cmd.aliases.is_empty() {
            cmd.name.clone()
        } else {
            format!("[{}|{}]", cmd.name, cmd.aliases.join("|"))
        };
        let mut parts = vec![self.qualified(parents, &name)];
        for param in &cmd.params {
            parts.push(match &param.kind {
                ParamKind::Required => format!("<{}>", param.name),
                ParamKind::Optional { default: Some(d) } => format!("[{}={d}]", param.name),
                ParamKind::Optional { default: None } => format!("[{}]", param.name),
                ParamKind::Variadic => format!("[{}...]", param.name),
            });
        }
        parts.join(" ")
    }

    pub fn command_line(&self, cmd: &CommandInfo, parents: &[&str]) -> Leaf {
        let sig = self.short_signature(cmd, parents);
        Leaf::new(format!(
            "\u{2002}{}: {}",
            self.markup.code(&sig),
            self.markup.text(cmd.summary())
        ))
    }

    pub fn section(&self, name: &str, commands: &[&CommandInfo], parents: &[&str]) -> Section {
        let mut section = Section::new(
            Some(self.markup.text(name)),
            None,
            Arc::clone(&self.style),
        );
        for cmd in commands {
            section.append(self.command_line(cmd, parents));
        }
        section.add_blank_line();
        section
    }

    /// Prose with single line breaks unwrapped, one leaf per remaining line.
    pub fn description(&self, text: &str) -> Block {
        let mut block = Block::new();
        for line in unwrap_lines(text).lines() {
            block.add_line(self.markup.text(line));
        }
        block
    }

    pub fn ending_note(&self, has_categories: bool) -> String {
        let p = &self.prefix;
        let name = &self.invoked_with;
        let mut note = format!("Type {p}{name} command for more info on a command.");
        if has_categories {
            note.push_str(&format!(
                " You can also type {p}{name} category for more info on a category."
            ));
        }
        self.markup.text(&note)
    }

    pub fn bot_help(&self, registry: &Registry) -> Block {
        let mut message = Block::new();
        let mut has_note = false;

        let groups = registry
            .categories
            .iter()
            .map(|c| (c.name.as_str(), &c.commands))
            .chain(std::iter::once((OTHER_CATEGORY, &registry.uncategorized)));
        for (name, commands) in groups {
            let commands = visible_sorted(commands);
            if commands.is_empty() {
                continue;
            }
            message.append(self.section(name, &commands, &[]));
            has_note = true;
        }

        if has_note {
            message.add_line(self.ending_note(true));
        }
        message
    }

    pub fn category_help(&self, category: &Category) -> Block {
        let mut message = Block::new();

        if let Some(description) = non_blank(category.description.as_deref()) {
            message.append(self.description(description));
            message.add_blank_line();
        }

        let commands = visible_sorted(&category.commands);
        if !commands.is_empty() {
            message.append(self.section("Commands", &commands, &[]));
            message.add_line(self.ending_note(false));
        }
        message
    }

    fn usage_preamble(&self, cmd: &CommandInfo, parents: &[&str]) -> Block {
        let mut message = Block::new();

        if let Some(description) = non_blank(cmd.description.as_deref()) {
            message.append(self.description(description));
            message.add_blank_line();
        }

        message.add_line_gap(format!(
            "{} {}",
            self.markup.strong("Usage:"),
            self.markup.code(&self.full_signature(cmd, parents))
        ));

        if let Some(help) = non_blank(cmd.help.as_deref()) {
            message.append(self.description(help));
            message.add_blank_line();
        }
        message
    }

    pub fn group_help(&self, cmd: &CommandInfo, parents: &[&str]) -> Block {
        let mut message = self.usage_preamble(cmd, parents);

        let subcommands = visible_sorted(&cmd.subcommands);
        if !subcommands.is_empty() {
            let mut path = parents.to_vec();
            path.push(&cmd.name);
            message.append(self.section("Subcommands", &subcommands, &path));
        }
        message
    }

    pub fn command_help(&self, cmd: &CommandInfo, parents: &[&str]) -> Block {
        self.usage_preamble(cmd, parents)
    }

    pub fn command_not_found(&self, name: &str) -> Block {
        let mut message = Block::new();
        message.add_line(format!("Unknown command {}.", self.markup.code(name)));
        message
    }

    pub fn subcommand_not_found(&self, cmd: &CommandInfo, parents: &[&str], name: &str) -> Block {
        let mut qualified = parents.join(" ");
        if !qualified.is_empty() {
            qualified.push(' ');
        }
        qualified.push_str(&cmd.name);

        let mut message = Block::new();
        message.add_line(format!(
            "Unknown command option {} to command {}.",
            self.markup.code(name),
            self.markup.code(&qualified)
        ));
        message
    }

    /// Help for a free-form query: nothing, a category, or a command path.
    pub fn resolve(&self, registry: &Registry, query: &str) -> Block {
        let query = query.trim();
        if query.is_empty() {
            return self.bot_help(registry);
        }

        if let Some(category) = registry.find_category(query) {
            return self.category_help(category);
        }

        let mut keys = query.split_whitespace();
        let Some(first) = keys.next() else {
            return self.bot_help(registry);
        };
        let first = first.trim_start_matches(self.prefix.as_str());
        let Some(mut cmd) = registry.find_command(first) else {
            return self.command_not_found(first);
        };

        let mut parents: Vec<&str> = Vec::new();
        for key in keys {
            match cmd.find_subcommand(key) {
                Some(sub) => {
                    parents.push(&cmd.name);
                    cmd = sub;
                }
                None => return self.subcommand_not_found(cmd, &parents, key),
            }
        }

        if cmd.is_group() {
            self.group_help(cmd, &parents)
        } else {
            self.command_help(cmd, &parents)
        }
    }

    /// Render `node` as pages that each fit the page budget.
    pub fn pages(&self, node: impl Into<Node>) -> Result<Vec<String>> {
        Ok(render_pages(node, self.page_budget)?)
    }
}

/// Moderator help: the list of categories with notes, or one category's notes.
pub fn admin_help(registry: &Registry, category: Option<&str>, markup: Markup) -> Block {
    let with_notes: Vec<&Category> = registry
        .categories
        .iter()
        .filter(|c| c.admin_help.is_some())
        .collect();

    let Some(query) = category.map(str::trim).filter(|c| !c.is_empty()) else {
        let names: Vec<String> = with_notes.iter().map(|c| c.name.to_lowercase()).collect();
        let mut message = Block::new();
        message.add_line(format!(
            "Select a module to see admin-relevant information about it. Available categories are: {}.",
            pretty_list(&names, ListStyle::default().markup(markup).empty("none"))
        ));
        return message;
    };

    match with_notes
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(query))
        .and_then(|c| c.admin_help.as_deref())
    {
        Some(notes) => Block::from_text(notes),
        None => {
            let mut message = Block::new();
            message.add_line(markup.text(&format!("No admin-specific help for \"{query}\".")));
            message
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Replace every lone line break (`\n`, `\r\n` or `\r` with no line break on
/// either side) with a space. Paragraph breaks survive.
fn unwrap_lines(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let is_break = |c: char| c == '\n' || c == '\r';
    let mut out = String::with_capacity(text.len());

    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if !is_break(c) {
            out.push(c);
            i += 1;
            continue;
        }

        let len = if c == '\r' && chars.get(i + 1) == Some(&'\n') {
            2
        } else {
            1
        };
        let before = i.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i + len).copied();
        let lone = !before.is_some_and(is_break) && !after.is_some_and(is_break);

        if lone {
            out.push(' ');
        } else {
            out.extend(&chars[i..i + len]);
        }
        i += len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::Paginable;

    fn registry() -> Registry {
        Registry::new()
            .category(
                Category::new("Admin")
                    .description("Moderation tools.\nUse with care.")
                    .admin_help("Purges skip pinned messages.")
                    .command(
                        CommandInfo::new("delete")
                            .param(Param::with_default("num_messages", "50"))
                            .help("Delete recent messages from this chat.\n\nPinned messages are skipped.")
                            .subcommand(CommandInfo::new("all").help("Delete all messages."))
                            .subcommand(CommandInfo::new("stop").help("Stop an in-progress deletion.")),
                    )
                    .command(
                        CommandInfo::new("ban_id")
                            .param(Param::required("id"))
                            .help("Bans a user by their id."),
                    ),
            )
            .category(Category::new("Hidden").command(CommandInfo::new("secret").hidden()))
            .command(
                CommandInfo::new("help")
                    .alias("start")
                    .param(Param::variadic("query"))
                    .help("Shows this message."),
            )
    }

    fn fmt() -> HelpFormatter {
        HelpFormatter::new("/", Markup::Markdown, 2000)
    }

    #[test]
    fn short_signature_ignores_aliases_and_defaults() {
        let reg = registry();
        let f = fmt();
        let delete = reg.find_command("delete").unwrap();
        assert_eq!(f.short_signature(delete, &[]), "/delete [num_messages]");
        let help = reg.find_command("start").unwrap();
        assert_eq!(f.short_signature(help, &[]), "/help [query\u{2026}]");
        let all = delete.find_subcommand("all").unwrap();
        assert_eq!(f.short_signature(all, &["delete"]), "/delete all");
    }

    #[test]
    fn full_signature_shows_aliases_and_defaults() {
        let reg = registry();
        let f = fmt();
        assert_eq!(
            f.full_signature(reg.find_command("delete").unwrap(), &[]),
            "/delete [num_messages=50]"
        );
        assert_eq!(
            f.full_signature(reg.find_command("help").unwrap(), &[]),
            "/[help|start] [query...]"
        );
    }

    #[test]
    fn bot_help_lists_visible_categories() {
        let text = fmt().bot_help(&registry()).render();
        assert_eq!(
            text,
            "**Admin**\n\
\u{2002}`/ban_id <id>`: Bans a user by their id.\n\
\u{2002}`/delete [num_messages]`: Delete recent messages from this chat.\n\
\n\
**\u{200b}Other**\n\
\u{2002}`/help [query\u{2026}]`: Shows this message.\n\
\n\
Type /help command for more info on a command. You can also type /help category for more info on a category."
        );
    }

    #[test]
    fn category_help_unwraps_description() {
        let reg = registry();
        let text = fmt().resolve(&reg, "admin").render();
        assert!(text.starts_with("Moderation tools. Use with care.\n\n**Commands**\n"));
        assert!(text.ends_with("Type /help command for more info on a command."));
    }

    #[test]
    fn group_help_has_usage_and_subcommands() {
        let text = fmt().resolve(&registry(), "delete").render();
        assert_eq!(
            text,
            "**Usage:** `/delete [num_messages=50]`\n\
\n\
Delete recent messages from this chat.\n\
\n\
Pinned messages are skipped.\n\
\n\
**Subcommands**\n\
\u{2002}`/delete all`: Delete all messages.\n\
\u{2002}`/delete stop`: Stop an in-progress deletion.\n"
        );
    }

    #[test]
    fn resolves_subcommands_and_misses() {
        let reg = registry();
        let f = fmt();
        assert_eq!(
            f.resolve(&reg, "delete stop").render(),
            "**Usage:** `/delete stop`\n\nStop an in-progress deletion.\n"
        );
        assert_eq!(f.resolve(&reg, "nope").render(), "Unknown command `nope`.");
        assert_eq!(
            f.resolve(&reg, "delete everything").render(),
            "Unknown command option `everything` to command `delete`."
        );
        assert_eq!(
            f.resolve(&reg, "ban_id extra").render(),
            "Unknown command option `extra` to command `ban_id`."
        );
        assert_eq!(f.resolve(&reg, "/ban_id").items().len(), 4);
    }

    #[test]
    fn html_markup_escapes_command_text() {
        let reg = Registry::new().command(CommandInfo::new("x").brief("a < b"));
        let f = HelpFormatter::new("/", Markup::Html, 4000);
        let text = f.bot_help(&reg).render();
        assert!(text.starts_with("<b>\u{200b}Other</b>\n"));
        assert!(text.contains("<code>/x</code>: a &lt; b"));
    }

    #[test]
    fn long_help_is_paginated_with_continuation_headers() {
        let mut category = Category::new("Roles");
        for i in 0..40 {
            category = category.command(
                CommandInfo::new(format!("cmd{i:02}")).brief("does something useful"),
            );
        }
        let reg = Registry::new().category(category);
        let f = HelpFormatter::new("/", Markup::Markdown, 300);

        let pages = f.pages(f.bot_help(&reg)).unwrap();
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|p| p.len() <= 300));
        assert!(pages[0].starts_with("**Roles**\n"));
        assert!(pages[1].starts_with("**Roles**(cont'd)\n"));
        assert_eq!(
            pages.iter().map(|p| p.matches("`/cmd").count()).sum::<usize>(),
            40
        );
    }

    #[test]
    fn tiny_budget_surfaces_pagination_error() {
        let f = HelpFormatter::new("/", Markup::Markdown, 10);
        let err = f.pages(f.bot_help(&registry())).unwrap_err();
        assert!(matches!(err, crate::Error::Pagination(_)));
    }

    #[test]
    fn admin_help_lists_or_shows_notes() {
        let reg = registry();
        assert_eq!(
            admin_help(&reg, None, Markup::Markdown).render(),
            "Select a module to see admin-relevant information about it. Available categories are: **admin**."
        );
        assert_eq!(
            admin_help(&reg, Some("ADMIN"), Markup::Markdown).render(),
            "Purges skip pinned messages."
        );
        assert_eq!(
            admin_help(&reg, Some("roles"), Markup::Markdown).render(),
            "No admin-specific help for \"roles\"."
        );
        assert_eq!(
            admin_help(&Registry::new(), None, Markup::Markdown).render(),
            "Select a module to see admin-relevant information about it. Available categories are: none."
        );
    }

    #[test]
    fn unwraps_only_lone_line_breaks() {
        assert_eq!(unwrap_lines("a\nb"), "a b");
        assert_eq!(unwrap_lines("a\r\nb"), "a b");
        assert_eq!(unwrap_lines("a\n\nb"), "a\n\nb");
        assert_eq!(unwrap_lines("a\nb\n\nc\nd"), "a b\n\nc d");
        assert_eq!(unwrap_lines("trailing\n"), "trailing ");
    }
}

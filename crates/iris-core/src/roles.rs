//! Per-guild role cache keyed by a naming convention.
//!
//! Two conventions are provided: opt-in roles (`In: games`, self-assignable)
//! and automatic roles (`(Auto) a + b`, held by members holding every listed
//! role). The cache is kept current through the `*_updated`/`*_joined` hooks.

use std::{
    borrow::Borrow,
    collections::{BTreeMap, HashMap, HashSet},
    fmt::Debug,
};

use regex::Regex;

use crate::{
    domain::{GuildId, Role, RoleId},
    formatting::Markup,
    utils::{pretty_list, ListStyle},
    Result,
};

pub const DEFAULT_OPT_ROLE_PREFIX: &str = "In:";
pub const DEFAULT_AUTO_ROLE_PREFIX: &str = "(Auto)";

/// Decides which roles are cached, and under which key.
pub trait RoleKey {
    type Key: Clone + Debug + Ord;

    fn key_for_role(&self, role: &Role) -> Option<Self::Key>;
}

type GuildRoles<K> = BTreeMap<K, BTreeMap<RoleId, Role>>;

#[derive(Debug)]
pub struct RoleCache<K: RoleKey> {
    keys: K,
    guilds: HashMap<GuildId, GuildRoles<K::Key>>,
}

impl<K: RoleKey> RoleCache<K> {
    pub fn new(keys: K) -> Self {
        Self {
            keys,
            guilds: HashMap::new(),
        }
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Drop everything known about `guild` and re-read its roles.
    pub fn rebuild(&mut self, guild: GuildId, roles: impl IntoIterator<Item = Role>) {
        self.guilds.remove(&guild);
        for role in roles {
            self.sync_role(role);
        }
    }

    pub fn get_roles<Q>(&self, guild: GuildId, key: &Q) -> Vec<&Role>
    where
        K::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.guilds
            .get(&guild)
            .and_then(|g| g.get(key))
            .map(|group| group.values().collect())
            .unwrap_or_default()
    }

    pub fn get_role<Q>(&self, guild: GuildId, key: &Q) -> Option<&Role>
    where
        K::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.guilds
            .get(&guild)
            .and_then(|g| g.get(key))
            .and_then(|group| group.values().next())
    }

    pub fn roles_by_key(&self, guild: GuildId) -> Vec<(&K::Key, &Role)> {
        self.guilds
            .get(&guild)
            .map(|g| {
                g.iter()
                    .flat_map(|(key, group)| group.values().map(move |role| (key, role)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_roles(&self, guild: GuildId) -> Vec<&Role> {
        self.roles_by_key(guild).into_iter().map(|(_, r)| r).collect()
    }

    pub fn all_keys(&self, guild: GuildId) -> Vec<&K::Key> {
        self.guilds
            .get(&guild)
            .map(|g| g.keys().collect())
            .unwrap_or_default()
    }

    /// Cache `role` if its name yields a key. Returns whether it was cached.
    pub fn sync_role(&mut self, role: Role) -> bool {
        let Some(key) = self.keys.key_for_role(&role) else {
            return false;
        };
        self.guilds
            .entry(role.guild)
            .or_default()
            .entry(key)
            .or_default()
            .insert(role.id, role);
        true
    }

    pub fn remove_role(&mut self, role: &Role) {
        let Some(key) = self.keys.key_for_role(role) else {
            return;
        };
        let Some(guild) = self.guilds.get_mut(&role.guild) else {
            return;
        };
        if let Some(group) = guild.get_mut(&key) {
            group.remove(&role.id);
            if group.is_empty() {
                guild.remove(&key);
            }
        }
    }

    /// A role was renamed or otherwise edited.
    pub fn role_updated(&mut self, old: &Role, new: Role) {
        self.remove_role(old);
        self.sync_role(new);
    }

    pub fn guild_joined(&mut self, roles: impl IntoIterator<Item = Role>) {
        for role in roles {
            self.sync_role(role);
        }
    }

    pub fn guild_removed(&mut self, guild: GuildId) {
        self.guilds.remove(&guild);
    }
}

// ============== Opt-in roles ==============

/// Roles named `<prefix><name>`, keyed by the lower-cased `<name>`.
#[derive(Clone, Debug)]
pub struct OptInRoles {
    prefix: String,
}

impl OptInRoles {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_lowercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Lower-cased role name without the opt-in prefix.
    pub fn pretty_role(&self, role: &Role) -> String {
        let name = role.name.to_lowercase();
        match name.strip_prefix(&self.prefix) {
            Some(rest) => rest.to_string(),
            None => name,
        }
    }

    fn pretty_list(&self, roles: &[&Role], style: ListStyle<'_>) -> String {
        let names: Vec<String> = roles.iter().map(|r| self.pretty_role(r)).collect();
        pretty_list(&names, style)
    }
}

impl Default for OptInRoles {
    fn default() -> Self {
        Self::new(DEFAULT_OPT_ROLE_PREFIX)
    }
}

impl RoleKey for OptInRoles {
    type Key = String;

    fn key_for_role(&self, role: &Role) -> Option<String> {
        let name = role.name.to_lowercase();
        name.strip_prefix(&self.prefix)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

/// Split `roles` into those the member lacks and those they hold.
pub fn partition_roles<'a>(
    roles: impl IntoIterator<Item = &'a Role>,
    member_roles: &[RoleId],
) -> (Vec<&'a Role>, Vec<&'a Role>) {
    roles
        .into_iter()
        .partition(|r| !member_roles.contains(&r.id))
}

/// Look up user-typed role names. Returns `(found, not_found)`.
///
/// A trailing comma is dropped from each name, so `/join a, b` works.
pub fn parse_role_list<'a, S: AsRef<str>>(
    cache: &'a RoleCache<OptInRoles>,
    guild: GuildId,
    names: &[S],
) -> (Vec<&'a Role>, Vec<String>) {
    let mut found = Vec::new();
    let mut not_found = Vec::new();
    for name in names {
        let name = name.as_ref();
        let name = name.strip_suffix(',').unwrap_or(name);
        match cache.get_role(guild, name.to_lowercase().as_str()) {
            Some(role) => found.push(role),
            None => not_found.push(name.to_string()),
        }
    }
    (found, not_found)
}

/// Reply texts for the opt-in role commands.
#[derive(Clone, Debug)]
pub struct OptInReplies<'a> {
    pub roles: &'a OptInRoles,
    pub markup: Markup,
}

pub const NO_JOINABLE_ROLES: &str = "There are no user-joinable roles at this time.";

impl OptInReplies<'_> {
    fn style(&self) -> ListStyle<'static> {
        ListStyle::default().markup(self.markup)
    }

    pub fn list(&self, absent: &[&Role], present: &[&Role]) -> String {
        let available = self.roles.pretty_list(absent, self.style());
        let possessed = self.roles.pretty_list(present, self.style());
        match (available.is_empty(), possessed.is_empty()) {
            (false, false) => {
                format!("Available roles are {available}. (You're currently in {possessed}).")
            }
            (false, true) => format!("Available roles are {available}."),
            (true, false) => format!("You're currently in all the roles ({possessed})."),
            (true, true) => NO_JOINABLE_ROLES.to_string(),
        }
    }

    pub fn joined(&self, absent: &[&Role], present: &[&Role]) -> String {
        if absent.is_empty() {
            return "You're already in all of those roles.".to_string();
        }
        let mut out = format!(
            "Added you to role {}.",
            self.roles.pretty_list(absent, self.style())
        );
        if !present.is_empty() {
            out.push_str(&format!(
                " (You're already in {}.)",
                self.roles.pretty_list(present, self.style())
            ));
        }
        out
    }

    pub fn left(&self, absent: &[&Role], present: &[&Role]) -> String {
        if present.is_empty() {
            return "You aren't in any of those roles.".to_string();
        }
        let mut out = format!(
            "Removed you from role {}.",
            self.roles.pretty_list(present, self.style())
        );
        if !absent.is_empty() {
            out.push_str(&format!(
                " (You weren't in {} in the first place.)",
                self.roles
                    .pretty_list(absent, self.style().conjunction("or"))
            ));
        }
        out
    }

    pub fn no_such_roles<S: AsRef<str>>(&self, names: &[S]) -> String {
        format!(
            "Sorry, there isn't any role named {}.",
            pretty_list(names, self.style().conjunction("or"))
        )
    }

    pub fn admin_help(&self, roles: &[&Role]) -> String {
        let names: Vec<String> = roles.iter().map(|r| self.markup.code(&r.name)).collect();
        format!(
            "This module lets users assign and remove certain roles from themselves. \
Only roles starting with the prefix {} can be assigned this way.\n\n\
Currently recognized opt-in roles: {}.",
            self.markup.code(self.roles.prefix()),
            names.join(", ")
        )
    }
}

// ============== Automatic roles ==============

/// Roles named `<prefix> a + b + ...`, keyed by the required role names.
#[derive(Clone, Debug)]
pub struct AutoRoles {
    prefix: String,
    pattern: Regex,
}

impl AutoRoles {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"(?i)^{} *([^ ].+[^ ] *(\+ *[^ ].+[^ ])*)$",
            regex::escape(prefix)
        ))?;
        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn admin_help(&self, roles: &[&Role], markup: Markup) -> String {
        let names: Vec<String> = roles.iter().map(|r| markup.code(&r.name)).collect();
        let example = format!("{} Cool People + adults", self.prefix);
        format!(
            "This module automatically assigns and removes a role based on the other \
roles of a user. It can be used to create channels only visible to users who \
have {} particular roles.\n\n\
To be automatically assigned, a role should have a name that consists of the \
prefix {} followed by two or more role names separated with {} signs. For \
instance, a role named {} will be applied to users with both the {} role and \
the {} role.\n\n\
Currently recognized auto roles: {}.",
            markup.emphasis("several"),
            markup.code(&self.prefix),
            markup.code("+"),
            markup.code(&example),
            markup.code("cool people"),
            markup.code("adults"),
            pretty_list(&names, ListStyle::default().markup(markup).plain().empty("none"))
        )
    }
}

impl RoleKey for AutoRoles {
    type Key = Vec<String>;

    fn key_for_role(&self, role: &Role) -> Option<Vec<String>> {
        let name = role.name.to_lowercase();
        let caps = self.pattern.captures(&name)?;
        let required = caps.get(1)?.as_str();
        Some(required.split('+').map(|p| p.trim().to_string()).collect())
    }
}

/// Role changes that bring a member in line with the auto roles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutoRolePlan {
    pub to_add: Vec<Role>,
    pub to_remove: Vec<Role>,
}

impl AutoRolePlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// The member's role ids once the plan is applied.
    pub fn apply(&self, member_roles: &[RoleId]) -> Vec<RoleId> {
        let removed: HashSet<RoleId> = self.to_remove.iter().map(|r| r.id).collect();
        let mut out: Vec<RoleId> = member_roles
            .iter()
            .copied()
            .filter(|id| !removed.contains(id))
            .collect();
        for role in &self.to_add {
            if !out.contains(&role.id) {
                out.push(role.id);
            }
        }
        out
    }
}

/// An auto role is added when every required name is held, and removed when
/// held without its requirements.
pub fn plan_auto_roles(
    cache: &RoleCache<AutoRoles>,
    guild: GuildId,
    member_roles: &[Role],
) -> AutoRolePlan {
    let held_names: HashSet<String> = member_roles.iter().map(|r| r.name.to_lowercase()).collect();
    let held_ids: HashSet<RoleId> = member_roles.iter().map(|r| r.id).collect();

    let mut plan = AutoRolePlan::default();
    for (required, role) in cache.roles_by_key(guild) {
        let qualifies = required.iter().all(|name| held_names.contains(name));
        let holds = held_ids.contains(&role.id);
        if qualifies && !holds {
            plan.to_add.push(role.clone());
        } else if !qualifies && holds {
            plan.to_remove.push(role.clone());
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(1);

    fn role(id: u64, name: &str) -> Role {
        Role {
            id: RoleId(id),
            guild: GUILD,
            name: name.to_string(),
        }
    }

    fn opt_in_cache() -> RoleCache<OptInRoles> {
        let mut cache = RoleCache::new(OptInRoles::default());
        cache.rebuild(
            GUILD,
            vec![
                role(1, "In: Games"),
                role(2, "in:music"),
                role(3, "Moderators"),
                role(4, "In:"),
            ],
        );
        cache
    }

    #[test]
    fn opt_in_keys_strip_prefix_and_case() {
        let cache = opt_in_cache();
        let keys: Vec<&String> = cache.all_keys(GUILD);
        assert_eq!(keys, vec![" games", "music"]);
        assert_eq!(cache.get_role(GUILD, "music").map(|r| r.id), Some(RoleId(2)));
        assert!(cache.get_role(GUILD, "moderators").is_none());
        assert!(cache.get_roles(GuildId(99), "music").is_empty());
    }

    #[test]
    fn hooks_keep_the_cache_current() {
        let mut cache = opt_in_cache();
        cache.role_updated(&role(2, "in:music"), role(2, "in:jazz"));
        assert!(cache.get_role(GUILD, "music").is_none());
        assert_eq!(cache.get_role(GUILD, "jazz").map(|r| r.id), Some(RoleId(2)));

        cache.remove_role(&role(2, "in:jazz"));
        assert_eq!(cache.all_roles(GUILD).len(), 1);

        assert!(cache.sync_role(role(5, "In:art")));
        assert!(!cache.sync_role(role(6, "art")));
        assert_eq!(cache.all_roles(GUILD).len(), 2);

        cache.guild_removed(GUILD);
        assert!(cache.all_roles(GUILD).is_empty());

        cache.guild_joined(vec![role(7, "In:chess")]);
        assert_eq!(cache.all_keys(GUILD), vec!["chess"]);
    }

    #[test]
    fn rebuild_forgets_deleted_roles() {
        let mut cache = opt_in_cache();
        cache.rebuild(GUILD, vec![role(2, "In:music")]);
        assert_eq!(cache.all_keys(GUILD), vec!["music"]);
    }

    #[test]
    fn parse_role_list_strips_trailing_commas() {
        let cache = opt_in_cache();
        let (found, missing) = parse_role_list(&cache, GUILD, &["Music,", "dance"]);
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![RoleId(2)]);
        assert_eq!(missing, vec!["dance".to_string()]);
    }

    #[test]
    fn opt_in_replies() {
        let opt = OptInRoles::new("in:");
        let replies = OptInReplies {
            roles: &opt,
            markup: Markup::Markdown,
        };
        let games = role(1, "in:games");
        let music = role(2, "in:music");
        let art = role(3, "in:art");

        assert_eq!(
            replies.list(&[&games], &[&music]),
            "Available roles are **games**. (You're currently in **music**)."
        );
        assert_eq!(replies.list(&[], &[]), NO_JOINABLE_ROLES);
        assert_eq!(
            replies.joined(&[&games, &art], &[&music]),
            "Added you to role **games** and **art**. (You're already in **music**.)"
        );
        assert_eq!(
            replies.left(&[&games, &art], &[&music]),
            "Removed you from role **music**. (You weren't in **games** or **art** in the first place.)"
        );
        assert_eq!(replies.left(&[&games], &[]), "You aren't in any of those roles.");
        assert_eq!(
            replies.no_such_roles(&["a", "b", "c"]),
            "Sorry, there isn't any role named **a**, **b**, or **c**."
        );
    }

    #[test]
    fn partition_by_membership() {
        let roles = [role(1, "a"), role(2, "b"), role(3, "c")];
        let (absent, present) = partition_roles(&roles, &[RoleId(2)]);
        assert_eq!(absent.len(), 2);
        assert_eq!(present[0].id, RoleId(2));
    }

    #[test]
    fn auto_role_keys_list_required_names() {
        let auto = AutoRoles::new(DEFAULT_AUTO_ROLE_PREFIX).unwrap();
        let key = auto.key_for_role(&role(9, "(Auto) Cool People + adults"));
        assert_eq!(key, Some(vec!["cool people".to_string(), "adults".to_string()]));
        assert_eq!(auto.key_for_role(&role(9, "Cool People + adults")), None);
        assert_eq!(auto.key_for_role(&role(9, "(auto)")), None);
    }

    #[test]
    fn plans_auto_role_changes() {
        let mut cache = RoleCache::new(AutoRoles::new("(Auto)").unwrap());
        let combo = role(10, "(Auto) cool people + adults");
        cache.rebuild(GUILD, vec![combo.clone(), role(1, "cool people"), role(2, "adults")]);

        let qualified = vec![role(1, "Cool People"), role(2, "adults")];
        let plan = plan_auto_roles(&cache, GUILD, &qualified);
        assert_eq!(plan.to_add, vec![combo.clone()]);
        assert_eq!(plan.apply(&[RoleId(1), RoleId(2)]), vec![RoleId(1), RoleId(2), RoleId(10)]);

        let stale = vec![role(1, "cool people"), combo.clone()];
        let plan = plan_auto_roles(&cache, GUILD, &stale);
        assert_eq!(plan.to_remove, vec![combo.clone()]);
        assert_eq!(plan.apply(&[RoleId(1), RoleId(10)]), vec![RoleId(1)]);

        let settled = vec![role(1, "cool people"), role(2, "adults"), combo];
        assert!(plan_auto_roles(&cache, GUILD, &settled).is_empty());
    }

    #[test]
    fn auto_admin_help_lists_roles() {
        let auto = AutoRoles::new("(Auto)").unwrap();
        let combo = role(10, "(Auto) a + b");
        let text = auto.admin_help(&[&combo], Markup::Markdown);
        assert!(text.ends_with("Currently recognized auto roles: `(Auto) a + b`."));
        assert!(auto.admin_help(&[], Markup::Markdown).ends_with("auto roles: none."));
    }
}

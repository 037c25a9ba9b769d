//! Commands and routing
//!
//! A [`Command`] is a name, some aliases, a list of [`Check`]s and an async
//! handler. Groups carry subcommands instead of (or next to) a handler.
//! The [`CommandRouter`] resolves `name [sub…] args…` text into a command
//! and its raw argument tail.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::CommandContext;
use crate::error::{Error, Result};
use crate::platform::SlashCommandSpec;

/// Type-erased async command handler
pub type HandlerFn = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

fn boxed<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(handler(ctx)))
}

/// Preconditions evaluated before a handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Invoker owns the guild
    GuildOwner,
    /// Invoker has the administrator permission
    Administrator,
    /// Invoker may manage the guild
    ManageGuild,
    /// Invoker owns the bot
    BotOwner,
    /// Guild owner or administrator
    AdminOnly,
}

impl Check {
    /// Evaluate against an invocation
    ///
    /// # Errors
    ///
    /// Returns `MissingPermissions` for a missing guild permission and
    /// `CheckFailed` otherwise.
    pub fn evaluate(self, ctx: &CommandContext) -> Result<()> {
        let author = ctx.author();
        let is_guild_owner = ctx.guild().is_some_and(|g| g.owner_id == author.id);
        let permissions = author.permissions;

        match self {
            Self::GuildOwner if is_guild_owner => Ok(()),
            Self::GuildOwner => Err(Error::CheckFailed("guild owner".to_string())),
            Self::Administrator if permissions.administrator => Ok(()),
            Self::Administrator => Err(Error::MissingPermissions("administrator".to_string())),
            Self::ManageGuild if permissions.manage_guild || permissions.administrator => Ok(()),
            Self::ManageGuild => Err(Error::MissingPermissions("manage_guild".to_string())),
            Self::BotOwner if ctx.handle().is_owner(author.id) => Ok(()),
            Self::BotOwner => Err(Error::CheckFailed("bot owner".to_string())),
            Self::AdminOnly if is_guild_owner || permissions.administrator => Ok(()),
            Self::AdminOnly => Err(Error::CheckFailed(
                "guild owner or administrator".to_string(),
            )),
        }
    }
}

/// A text and/or slash command
#[derive(Clone)]
pub struct Command {
    name: String,
    aliases: Vec<String>,
    description: String,
    checks: Vec<Check>,
    suppress: bool,
    slash: bool,
    guild_only: bool,
    handler: Option<HandlerFn>,
    subcommands: Vec<Command>,
    cog: Option<String>,
}

impl Command {
    /// Create a command with a handler
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            handler: Some(boxed(handler)),
            ..Self::group(name)
        }
    }

    /// Create a group with no handler of its own
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            checks: Vec::new(),
            suppress: false,
            slash: false,
            guild_only: false,
            handler: None,
            subcommands: Vec::new(),
            cog: None,
        }
    }

    /// Handler run when a group is invoked without a known subcommand
    #[must_use]
    pub fn invoke_without_command<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handler = Some(boxed(handler));
        self
    }

    /// Add an alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the description shown by `help` and on slash sync
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a check
    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Delete the invoking message before running
    #[must_use]
    pub fn suppress(mut self) -> Self {
        self.suppress = true;
        self
    }

    /// Also expose as a slash command
    #[must_use]
    pub fn slash(mut self) -> Self {
        self.slash = true;
        self
    }

    /// Refuse invocations outside a guild
    #[must_use]
    pub fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    /// Add a subcommand
    #[must_use]
    pub fn subcommand(mut self, command: Self) -> Self {
        self.subcommands.push(command);
        self
    }

    /// Command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative names
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Description, empty if none
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Checks in evaluation order
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Whether the invoking message is deleted first
    pub fn is_suppressed(&self) -> bool {
        self.suppress
    }

    /// Whether the command is exposed as a slash command
    pub fn is_slash(&self) -> bool {
        self.slash
    }

    /// Whether the command refuses direct messages
    pub fn is_guild_only(&self) -> bool {
        self.guild_only
    }

    /// Subcommands of a group
    pub fn subcommands(&self) -> &[Self] {
        &self.subcommands
    }

    /// Module that registered the command, `None` for built-ins
    pub fn cog(&self) -> Option<&str> {
        self.cog.as_deref()
    }

    /// Handler, `None` for a bare group
    pub fn handler(&self) -> Option<&HandlerFn> {
        self.handler.as_ref()
    }

    /// Whether `word` is this command's name or one of its aliases
    pub fn matches(&self, word: &str) -> bool {
        self.name == word || self.aliases.iter().any(|a| a == word)
    }

    /// Run checks: guild-only first, then each check in order
    ///
    /// # Errors
    ///
    /// Returns the first failing check's error.
    pub fn run_checks(&self, ctx: &CommandContext) -> Result<()> {
        if self.guild_only && ctx.guild().is_none() {
            return Err(Error::CheckFailed("guild only".to_string()));
        }
        self.checks.iter().try_for_each(|check| check.evaluate(ctx))
    }

    /// Usage line such as `!modules load|l|enable|activate`
    pub fn signature(&self, prefix: &str, parent: Option<&str>) -> String {
        let mut names = vec![self.name.as_str()];
        names.extend(self.aliases.iter().map(String::as_str));
        match parent {
            Some(parent) => format!("{prefix}{parent} {}", names.join("|")),
            None => format!("{prefix}{}", names.join("|")),
        }
    }

    fn with_cog(mut self, cog: Option<&str>) -> Self {
        self.cog = cog.map(str::to_string);
        self.subcommands = self
            .subcommands
            .into_iter()
            .map(|sub| sub.with_cog(cog))
            .collect();
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("checks", &self.checks)
            .field("suppress", &self.suppress)
            .field("slash", &self.slash)
            .field("guild_only", &self.guild_only)
            .field("has_handler", &self.handler.is_some())
            .field("subcommands", &self.subcommands)
            .field("cog", &self.cog)
            .finish()
    }
}

/// A command matched against input text
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The innermost matched command
    pub command: Command,
    /// Space-separated names from the root, e.g. `modules load`
    pub qualified_name: String,
    /// Everything after the command names, leading whitespace trimmed
    pub args: String,
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    text.split_once(char::is_whitespace).unwrap_or((text, ""))
}

/// Registered top-level commands
#[derive(Debug, Default)]
pub struct CommandRouter {
    commands: BTreeMap<String, Command>,
    aliases: HashMap<String, String>,
}

impl CommandRouter {
    /// Create an empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command, tagged with the module that owns it
    ///
    /// # Errors
    ///
    /// Returns `CommandConflict` if its name or an alias is taken.
    pub fn register(&mut self, command: Command, cog: Option<&str>) -> Result<()> {
        let mut names = vec![command.name.as_str()];
        names.extend(command.aliases.iter().map(String::as_str));

        for name in &names {
            if let Some(existing) = self.lookup_name(name) {
                return Err(Error::CommandConflict(format!(
                    "`{name}` is already used by command `{existing}`"
                )));
            }
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(Error::CommandConflict(format!(
                    "`{name}` is listed twice on command `{}`",
                    command.name
                )));
            }
        }

        let command = command.with_cog(cog);
        for alias in &command.aliases {
            self.aliases.insert(alias.clone(), command.name.clone());
        }
        debug!(command = %command.name, cog = ?cog, "Command registered");
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    /// Add several commands, rolling back on the first conflict
    ///
    /// # Errors
    ///
    /// Returns the first `CommandConflict`; none of the commands stay
    /// registered in that case.
    pub fn register_all(&mut self, commands: Vec<Command>, cog: Option<&str>) -> Result<()> {
        let mut added: Vec<String> = Vec::new();
        for command in commands {
            let name = command.name.clone();
            if let Err(e) = self.register(command, cog) {
                for name in added {
                    self.remove(&name);
                }
                return Err(e);
            }
            added.push(name);
        }
        Ok(())
    }

    /// Remove a command by name
    pub fn remove(&mut self, name: &str) -> Option<Command> {
        let command = self.commands.remove(name)?;
        self.aliases.retain(|_, target| target != name);
        Some(command)
    }

    /// Remove every command owned by a module, returning their names
    pub fn remove_cog(&mut self, cog: &str) -> Vec<String> {
        let names: Vec<String> = self
            .commands
            .values()
            .filter(|c| c.cog() == Some(cog))
            .map(|c| c.name.clone())
            .collect();
        for name in &names {
            self.remove(name);
        }
        if !names.is_empty() {
            info!("Removed {} command(s) of module `{}`", names.len(), cog);
        }
        names
    }

    /// Find a command by name or alias
    pub fn get(&self, name: &str) -> Option<&Command> {
        let name = self.aliases.get(name).map_or(name, String::as_str);
        self.commands.get(name)
    }

    /// Resolve `name [sub…] args…`
    pub fn resolve(&self, body: &str) -> Option<Resolved> {
        let (word, mut rest) = split_word(body);
        let mut command = self.get(word)?;
        let mut qualified_name = command.name.clone();

        while !command.subcommands.is_empty() {
            let (word, tail) = split_word(rest);
            let Some(sub) = command.subcommands.iter().find(|s| s.matches(word)) else {
                break;
            };
            command = sub;
            qualified_name.push(' ');
            qualified_name.push_str(&sub.name);
            rest = tail;
        }

        Some(Resolved {
            command: command.clone(),
            qualified_name,
            args: rest.trim_start().to_string(),
        })
    }

    /// Find a slash command by name
    pub fn find_slash(&self, name: &str) -> Option<&Command> {
        self.commands.get(name).filter(|c| c.slash)
    }

    /// Slash commands to push to the platform
    pub fn slash_specs(&self) -> Vec<SlashCommandSpec> {
        self.commands
            .values()
            .filter(|c| c.slash)
            .map(|c| SlashCommandSpec {
                name: c.name.clone(),
                description: if c.description.is_empty() {
                    c.name.clone()
                } else {
                    c.description.clone()
                },
                guild_only: c.guild_only,
            })
            .collect()
    }

    /// Commands sorted by name
    pub fn list(&self) -> Vec<&Command> {
        self.commands.values().collect()
    }

    /// Number of top-level commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn lookup_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.commands.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_ctx: CommandContext) -> Result<()> {
        Ok(())
    }

    fn modules_group() -> Command {
        Command::group("modules")
            .alias("mod")
            .alias("plugins")
            .invoke_without_command(noop)
            .subcommand(Command::new("list", noop).alias("ls"))
            .subcommand(
                Command::new("load", noop)
                    .alias("l")
                    .alias("enable")
                    .alias("activate"),
            )
    }

    #[test]
    fn test_register_and_lookup() {
        let mut router = CommandRouter::new();
        router.register(modules_group(), None).unwrap();

        assert_eq!(router.get("modules").unwrap().name(), "modules");
        assert_eq!(router.get("plugins").unwrap().name(), "modules");
        assert!(router.get("module").is_none());
    }

    #[test]
    fn test_conflicts() {
        let mut router = CommandRouter::new();
        router.register(Command::new("ping", noop), Some("ping")).unwrap();

        let err = router
            .register(Command::new("pong", noop).alias("ping"), None)
            .unwrap_err();
        assert!(matches!(err, Error::CommandConflict(_)));

        let err = router
            .register(Command::new("x", noop).alias("y").alias("y"), None)
            .unwrap_err();
        assert!(matches!(err, Error::CommandConflict(_)));
        assert!(router.get("x").is_none());
    }

    #[test]
    fn test_register_all_rolls_back() {
        let mut router = CommandRouter::new();
        router.register(Command::new("taken", noop), None).unwrap();

        let result = router.register_all(
            vec![Command::new("fresh", noop), Command::new("taken", noop)],
            Some("cog"),
        );
        assert!(result.is_err());
        assert!(router.get("fresh").is_none());
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_resolve_subcommands() {
        let mut router = CommandRouter::new();
        router.register(modules_group(), None).unwrap();

        let resolved = router.resolve("mod l ping  announce").unwrap();
        assert_eq!(resolved.qualified_name, "modules load");
        assert_eq!(resolved.args, "ping  announce");

        let resolved = router.resolve("modules").unwrap();
        assert_eq!(resolved.qualified_name, "modules");
        assert_eq!(resolved.args, "");

        let resolved = router.resolve("modules unknown thing").unwrap();
        assert_eq!(resolved.qualified_name, "modules");
        assert_eq!(resolved.args, "unknown thing");

        assert!(router.resolve("nothing here").is_none());
        assert!(router.resolve("").is_none());
    }

    #[test]
    fn test_remove_cog() {
        let mut router = CommandRouter::new();
        router
            .register_all(
                vec![Command::new("ping", noop).alias("p"), Command::new("pong", noop)],
                Some("ping"),
            )
            .unwrap();
        router.register(modules_group(), None).unwrap();

        let mut removed = router.remove_cog("ping");
        removed.sort();
        assert_eq!(removed, vec!["ping", "pong"]);
        assert!(router.get("p").is_none());
        assert!(router.get("modules").is_some());
        assert_eq!(router.get("modules").unwrap().subcommands()[0].cog(), None);
    }

    #[test]
    fn test_slash_specs() {
        let mut router = CommandRouter::new();
        router
            .register(
                Command::new("announce", noop)
                    .description("Post an announcement")
                    .slash()
                    .guild_only(),
                Some("announce"),
            )
            .unwrap();
        router.register(Command::new("ping", noop), Some("ping")).unwrap();

        let specs = router.slash_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "announce");
        assert!(specs[0].guild_only);
        assert!(router.find_slash("announce").is_some());
        assert!(router.find_slash("ping").is_none());
    }

    #[test]
    fn test_signature() {
        let command = Command::new("list", noop).alias("ls");
        assert_eq!(command.signature("!", Some("modules")), "!modules list|ls");
        assert_eq!(Command::new("ping", noop).signature("?", None), "?ping");
    }

    fn outcome(result: Result<()>) -> &'static str {
        match result {
            Ok(()) => "ok",
            Err(Error::CheckFailed(_)) => "check",
            Err(Error::MissingPermissions(_)) => "perm",
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_check_policy() {
        use crate::bot::testing::{message, owner, test_bot};
        use crate::platform::{Author, MemberPermissions};

        let (bot, _platform, _dir) = test_bot();
        let admin = Author::new(2, "admin").with_permissions(MemberPermissions {
            administrator: true,
            ..MemberPermissions::default()
        });
        let manager = Author::new(3, "manager").with_permissions(MemberPermissions {
            manage_guild: true,
            ..MemberPermissions::default()
        });
        let member = Author::new(4, "member");
        let authors = [owner(), admin, manager, member];

        // Columns: guild and bot owner, administrator, manage_guild, plain member
        let table = [
            (Check::GuildOwner, ["ok", "check", "check", "check"]),
            (Check::Administrator, ["perm", "ok", "perm", "perm"]),
            (Check::ManageGuild, ["perm", "ok", "ok", "perm"]),
            (Check::BotOwner, ["ok", "check", "check", "check"]),
            (Check::AdminOnly, ["ok", "ok", "check", "check"]),
        ];

        for (check, expected) in table {
            for (author, want) in authors.iter().zip(expected) {
                let msg = message(10, author.clone(), "!x");
                let ctx = CommandContext::from_message(bot.clone(), &msg, "!", "x", "");
                assert_eq!(
                    outcome(check.evaluate(&ctx)),
                    want,
                    "{check:?} for {}",
                    author.name
                );
            }
        }
    }

    #[tokio::test]
    async fn test_guild_only_rejects_direct_messages() {
        use crate::bot::testing::{message, owner, test_bot};

        let (bot, _platform, _dir) = test_bot();
        let command = Command::new("x", noop).guild_only();

        let mut msg = message(10, owner(), "!x");
        let ctx = CommandContext::from_message(bot.clone(), &msg, "!", "x", "");
        assert!(command.run_checks(&ctx).is_ok());

        msg.guild = None;
        let ctx = CommandContext::from_message(bot, &msg, "!", "x", "");
        assert!(matches!(command.run_checks(&ctx), Err(Error::CheckFailed(_))));

        // Without a guild nobody is the guild owner
        assert!(matches!(
            Check::GuildOwner.evaluate(&ctx),
            Err(Error::CheckFailed(_))
        ));
        assert!(Check::BotOwner.evaluate(&ctx).is_ok());
    }
}

// File: maowcmd-core/src/services/command.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use maowcmd_common::models::{CommandDeclaration, OptionDeclaration};
use maowcmd_common::traits::platform_traits::ChatPlatform;

use crate::Error;
use crate::config::AccessPolicy;
use crate::services::command_logger::CommandLogger;
use crate::services::command_registry::CommandRegistry;
use crate::services::trigger::{ArgumentMap, Trigger};
use crate::utils::parse_duration;

/// Whether a command callback counts as having succeeded.
///
/// Only success applies the reaction, the command log and the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    Failure,
}

impl From<bool> for CommandOutcome {
    fn from(ok: bool) -> Self {
        if ok { CommandOutcome::Success } else { CommandOutcome::Failure }
    }
}

impl From<()> for CommandOutcome {
    fn from(_: ()) -> Self {
        CommandOutcome::Success
    }
}

/// Read-only view handed to a command callback.
#[derive(Clone)]
pub struct CommandContext {
    pub platform: Arc<dyn ChatPlatform>,
    pub trigger: Arc<Trigger>,
    /// Whitespace-split arguments (text) or option values (interaction).
    pub args: Vec<String>,
    /// Arguments bound to the command's declared options.
    pub argv: ArgumentMap,
    pub prefix: String,
    /// Everything after the command name, untouched.
    pub text: String,
    pub logger: Option<Arc<CommandLogger>>,
    pub commands: Arc<CommandRegistry>,
    pub policy: Arc<AccessPolicy>,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn run(&self, ctx: CommandContext) -> anyhow::Result<CommandOutcome>;
}

/// Adapts an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<CommandOutcome>> + Send,
{
    async fn run(&self, ctx: CommandContext) -> anyhow::Result<CommandOutcome> {
        (self.0)(ctx).await
    }
}

/// How raw text arguments are bound to declared options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentStyle {
    /// The i-th argument binds to the i-th option.
    #[default]
    Positional,
    /// `--name value` flags with aliases; one option may collect the unflagged remainder.
    Flags,
}

/// A registered command. Immutable once built, except for category back-fill at load.
pub struct Command {
    pub(crate) names: Vec<String>,
    pub(crate) description: String,
    pub(crate) category: Option<String>,
    pub(crate) options: Vec<OptionDeclaration>,
    pub(crate) cooldown: Option<u64>,
    pub(crate) global_cooldown: Option<u64>,
    pub(crate) admin_only: bool,
    pub(crate) test_only: bool,
    pub(crate) no_dm: bool,
    pub(crate) no_classic: bool,
    pub(crate) no_interaction: bool,
    pub(crate) min_args: usize,
    pub(crate) max_args: usize,
    pub(crate) blacklist: HashSet<String>,
    pub(crate) react: Option<String>,
    pub(crate) argument_style: ArgumentStyle,
    pub(crate) argv_aliases: HashMap<String, Vec<String>>,
    pub(crate) ephemeral: bool,
    pub(crate) deferred: bool,
    pub(crate) handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn builder<I, S>(names: I) -> CommandBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        CommandBuilder::new(names)
    }

    /// Canonical id: the first name.
    pub fn id(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn options(&self) -> &[OptionDeclaration] {
        &self.options
    }

    /// Per-user cooldown in milliseconds.
    pub fn cooldown(&self) -> Option<u64> {
        self.cooldown
    }

    /// Per-guild cooldown in milliseconds.
    pub fn global_cooldown(&self) -> Option<u64> {
        self.global_cooldown
    }

    pub fn has_cooldown(&self) -> bool {
        self.cooldown.is_some() || self.global_cooldown.is_some()
    }

    pub fn is_admin_only(&self) -> bool {
        self.admin_only
    }

    pub fn is_test_only(&self) -> bool {
        self.test_only
    }

    pub fn is_dm_disallowed(&self) -> bool {
        self.no_dm
    }

    pub fn is_classic_disallowed(&self) -> bool {
        self.no_classic
    }

    pub fn is_interaction_disallowed(&self) -> bool {
        self.no_interaction
    }

    pub fn min_args(&self) -> usize {
        self.min_args
    }

    /// `0` disables the upper bound.
    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn blacklist(&self) -> &HashSet<String> {
        &self.blacklist
    }

    pub fn react(&self) -> Option<&str> {
        self.react.as_deref()
    }

    pub fn argument_style(&self) -> ArgumentStyle {
        self.argument_style
    }

    pub fn argv_aliases(&self) -> &HashMap<String, Vec<String>> {
        &self.argv_aliases
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn handler(&self) -> Arc<dyn CommandHandler> {
        self.handler.clone()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// The slash-command shape used for publishing and diffing.
    pub fn declaration(&self) -> CommandDeclaration {
        CommandDeclaration {
            name: self.id().to_string(),
            description: self.description.clone(),
            options: self.options.clone(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("category", &self.category)
            .field("cooldown", &self.cooldown)
            .field("global_cooldown", &self.global_cooldown)
            .finish_non_exhaustive()
    }
}

/// Builds a [`Command`]. Duration strings are parsed in [`build`](Self::build),
/// so a malformed cooldown fails at construction time.
pub struct CommandBuilder {
    names: Vec<String>,
    description: String,
    category: Option<String>,
    options: Vec<OptionDeclaration>,
    cooldown: Option<String>,
    global_cooldown: Option<String>,
    admin_only: bool,
    test_only: bool,
    no_dm: bool,
    no_classic: bool,
    no_interaction: bool,
    min_args: usize,
    max_args: usize,
    blacklist: HashSet<String>,
    react: Option<String>,
    argument_style: ArgumentStyle,
    argv_aliases: HashMap<String, Vec<String>>,
    ephemeral: bool,
    deferred: bool,
    handler: Option<Arc<dyn CommandHandler>>,
}

impl CommandBuilder {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim().to_lowercase();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self {
            names: unique,
            description: String::new(),
            category: None,
            options: Vec::new(),
            cooldown: None,
            global_cooldown: None,
            admin_only: false,
            test_only: false,
            no_dm: false,
            no_classic: false,
            no_interaction: false,
            min_args: 0,
            max_args: 0,
            blacklist: HashSet::new(),
            react: None,
            argument_style: ArgumentStyle::Positional,
            argv_aliases: HashMap::new(),
            ephemeral: false,
            deferred: false,
            handler: None,
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn option(mut self, option: OptionDeclaration) -> Self {
        self.options.push(option);
        self
    }

    /// Per-user cooldown, e.g. `"10m"`, `"30s"` or `"500"` (milliseconds).
    pub fn cooldown(mut self, duration: &str) -> Self {
        self.cooldown = Some(duration.to_string());
        self
    }

    /// Per-guild cooldown, same grammar as [`cooldown`](Self::cooldown).
    pub fn global_cooldown(mut self, duration: &str) -> Self {
        self.global_cooldown = Some(duration.to_string());
        self
    }

    pub fn admin_only(mut self, yes: bool) -> Self {
        self.admin_only = yes;
        self
    }

    pub fn test_only(mut self, yes: bool) -> Self {
        self.test_only = yes;
        self
    }

    pub fn no_dm(mut self, yes: bool) -> Self {
        self.no_dm = yes;
        self
    }

    pub fn no_classic(mut self, yes: bool) -> Self {
        self.no_classic = yes;
        self
    }

    pub fn no_interaction(mut self, yes: bool) -> Self {
        self.no_interaction = yes;
        self
    }

    pub fn min_args(mut self, min: usize) -> Self {
        self.min_args = min;
        self
    }

    pub fn max_args(mut self, max: usize) -> Self {
        self.max_args = max;
        self
    }

    pub fn blacklist<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn react(mut self, emoji: &str) -> Self {
        self.react = Some(emoji.to_string());
        self
    }

    pub fn argument_style(mut self, style: ArgumentStyle) -> Self {
        self.argument_style = style;
        self
    }

    /// Aliases for a flag-style option. An alias of `"_"` makes the option
    /// receive every unflagged argument.
    pub fn argv_alias<I, S>(mut self, option: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv_aliases
            .entry(option.to_lowercase())
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn ephemeral(mut self, yes: bool) -> Self {
        self.ephemeral = yes;
        self
    }

    pub fn deferred(mut self, yes: bool) -> Self {
        self.deferred = yes;
        self
    }

    pub fn handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the callback from an async closure.
    pub fn run<F, Fut>(self, f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<CommandOutcome>> + Send + 'static,
    {
        self.handler(Arc::new(FnHandler(f)))
    }

    pub fn build(self) -> Result<Command, Error> {
        if self.names.is_empty() || self.names.iter().any(|n| n.is_empty()) {
            return Err(Error::Config("a command needs at least one non-empty name".into()));
        }
        let id = self.names[0].clone();

        let cooldown = parse_optional(self.cooldown.as_deref(), "cooldown", &id)?;
        let global_cooldown = parse_optional(self.global_cooldown.as_deref(), "global cooldown", &id)?;

        let handler = self
            .handler
            .ok_or_else(|| Error::Config(format!("command {} has no callback", id)))?;

        Ok(Command {
            names: self.names,
            description: self.description,
            category: self.category,
            options: self.options,
            cooldown,
            global_cooldown,
            admin_only: self.admin_only,
            test_only: self.test_only,
            no_dm: self.no_dm,
            no_classic: self.no_classic,
            no_interaction: self.no_interaction,
            min_args: self.min_args,
            max_args: self.max_args,
            blacklist: self.blacklist,
            react: self.react,
            argument_style: self.argument_style,
            argv_aliases: self.argv_aliases,
            ephemeral: self.ephemeral,
            deferred: self.deferred,
            handler,
        })
    }
}

fn parse_optional(raw: Option<&str>, what: &str, command: &str) -> Result<Option<u64>, Error> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_duration(raw).map(Some).map_err(|_| {
            Error::DurationParse(format!("{} ({} for command {})", raw, what, command))
        }),
    }
}

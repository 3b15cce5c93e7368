// maowcmd-core/src/config.rs

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::Error;

/// Top-level handler configuration, usually loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    /// Prefix for text commands, e.g. `!`.
    pub prefix: String,

    #[serde(default)]
    pub admins: Vec<String>,

    /// Guilds where test-only commands may run and test declarations are published.
    #[serde(default)]
    pub test_guilds: Vec<String>,

    /// User or guild ids barred from every command.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Keyword reactions applied to any text message containing the keyword.
    #[serde(default)]
    pub triggers: Vec<ReactionTrigger>,

    pub help: Option<HelpSettings>,

    pub logging: Option<LoggerSettings>,

    /// Command name (without prefix) that toggles the paused state.
    pub pause_command: Option<String>,

    #[serde(default)]
    pub ignore_bots: bool,

    /// Publish every slash declaration to the test guilds only.
    #[serde(default)]
    pub test_mode: bool,

    #[serde(default)]
    pub messages: DenyMessages,

    /// Interval for the periodic expired-cooldown sweep. `None` sweeps only at start-up.
    pub prune_interval_secs: Option<u64>,
}

impl HandlerConfig {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            admins: Vec::new(),
            test_guilds: Vec::new(),
            blacklist: Vec::new(),
            triggers: Vec::new(),
            help: None,
            logging: None,
            pause_command: None,
            ignore_bots: false,
            test_mode: false,
            messages: DenyMessages::default(),
            prune_interval_secs: None,
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let config: HandlerConfig = toml::from_str(content)?;
        if config.prefix.is_empty() {
            return Err(Error::Config("prefix must not be empty".into()));
        }
        Ok(config)
    }

    /// The subset the validator and registry consult on every request.
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            prefix: self.prefix.clone(),
            admins: self.admins.iter().cloned().collect(),
            test_guilds: self.test_guilds.iter().cloned().collect(),
            blacklist: self.blacklist.iter().cloned().collect(),
            messages: self.messages.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionTrigger {
    pub keyword: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelpSettings {
    pub names: Vec<String>,
    pub title: Option<String>,
    /// Group the listing by category.
    #[serde(default = "default_true")]
    pub categories: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerSettings {
    pub channels: Vec<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "$authorTag$ used `$content$` in $channelTag$ ($serverName$) at $timestamp$".to_string()
}

/// User-facing denial texts. `{prefix}`, `{command}` and `{time}` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DenyMessages {
    pub too_few_args: String,
    pub too_many_args: String,
    pub no_admin: String,
    #[serde(rename = "noDM")]
    pub no_dm: String,
    pub blacklist: String,
    pub cooldown: String,
    pub global_cooldown: String,
}

impl Default for DenyMessages {
    fn default() -> Self {
        Self {
            too_few_args: "Not enough args. For more info, see: {prefix}help {command}".into(),
            too_many_args: "Too many args. For more info, see: {prefix}help {command}".into(),
            no_admin: "You can't run this command!".into(),
            no_dm: "You can't use this command in the dms".into(),
            blacklist: "You've been blacklisted from using this command".into(),
            cooldown: "This command is on cooldown for another {time}.".into(),
            global_cooldown: "This command is on cooldown for the entire server for another {time}.".into(),
        }
    }
}

/// Process-wide policy: who is an admin, which guilds are test guilds, who is blacklisted.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub prefix: String,
    pub admins: HashSet<String>,
    pub test_guilds: HashSet<String>,
    pub blacklist: HashSet<String>,
    pub messages: DenyMessages,
}

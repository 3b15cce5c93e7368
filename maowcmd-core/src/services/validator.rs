// File: maowcmd-core/src/services/validator.rs
//
// Ordered policy checks deciding whether a trigger may run a command.

use std::fmt;

use maowcmd_common::models::GuildCooldownRecord;

use crate::config::{AccessPolicy, DenyMessages};
use crate::services::command::Command;
use crate::services::trigger::Trigger;
use crate::utils::format_duration_long;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    TooFewArgs,
    TooManyArgs,
    /// Test-only command outside a test guild. Logged, never shown to the user.
    TestGuildOnly,
    NoAdmin,
    NoDm,
    Blacklisted,
    Cooldown { remaining_ms: i64 },
    GuildCooldown { remaining_ms: i64 },
}

impl DenyReason {
    /// The user-facing message, or `None` for silent denials.
    pub fn render(&self, messages: &DenyMessages, prefix: &str, command: &str) -> Option<String> {
        let (template, time) = match self {
            DenyReason::TooFewArgs => (&messages.too_few_args, None),
            DenyReason::TooManyArgs => (&messages.too_many_args, None),
            DenyReason::TestGuildOnly => return None,
            DenyReason::NoAdmin => (&messages.no_admin, None),
            DenyReason::NoDm => (&messages.no_dm, None),
            DenyReason::Blacklisted => (&messages.blacklist, None),
            DenyReason::Cooldown { remaining_ms } => (&messages.cooldown, Some(*remaining_ms)),
            DenyReason::GuildCooldown { remaining_ms } => (&messages.global_cooldown, Some(*remaining_ms)),
        };
        let mut text = template.replace("{prefix}", prefix).replace("{command}", command);
        if let Some(ms) = time {
            text = text.replace("{time}", &format_duration_long(ms));
        }
        Some(text)
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::TooFewArgs => write!(f, "too few arguments"),
            DenyReason::TooManyArgs => write!(f, "too many arguments"),
            DenyReason::TestGuildOnly => write!(f, "test guild only"),
            DenyReason::NoAdmin => write!(f, "admin only"),
            DenyReason::NoDm => write!(f, "not allowed in direct messages"),
            DenyReason::Blacklisted => write!(f, "blacklisted"),
            DenyReason::Cooldown { remaining_ms } => write!(f, "user cooldown ({} ms left)", remaining_ms),
            DenyReason::GuildCooldown { remaining_ms } => write!(f, "guild cooldown ({} ms left)", remaining_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// True when [`validate`] will consult the guild's cooldown record for this trigger.
pub fn needs_cooldown_record(command: &Command, trigger: &Trigger) -> bool {
    command.has_cooldown() && trigger.guild_id().is_some()
}

/// Runs the checks in order, stopping at the first failure:
/// argument bounds (text only), test guild, admin, DM, blacklist, cooldown
/// (user before guild-wide).
///
/// `record` is the guild's cooldown record when [`needs_cooldown_record`] holds.
pub fn validate(
    command: &Command,
    trigger: &Trigger,
    policy: &AccessPolicy,
    record: Option<&GuildCooldownRecord>,
    now_ms: i64,
) -> Verdict {
    let author = &trigger.author().id;
    let guild = trigger.guild_id();

    if trigger.is_text() {
        let count = trigger.args().len();
        if count < command.min_args() {
            return Verdict::Deny(DenyReason::TooFewArgs);
        }
        if command.max_args() > 0 && count > command.max_args() {
            return Verdict::Deny(DenyReason::TooManyArgs);
        }
    }

    if command.is_test_only() && !guild.is_some_and(|g| policy.test_guilds.contains(g)) {
        return Verdict::Deny(DenyReason::TestGuildOnly);
    }

    if command.is_admin_only() && !policy.admins.contains(author) {
        return Verdict::Deny(DenyReason::NoAdmin);
    }

    if command.is_dm_disallowed() && guild.is_none() {
        return Verdict::Deny(DenyReason::NoDm);
    }

    let barred = |id: &str| policy.blacklist.contains(id) || command.blacklist().contains(id);
    if barred(author.as_str()) || guild.is_some_and(|g| barred(g)) {
        return Verdict::Deny(DenyReason::Blacklisted);
    }

    if needs_cooldown_record(command, trigger) {
        if let Some(record) = record {
            if command.cooldown().is_some() {
                if let Some(cd) = record.active_user_cooldown(author, command.id(), now_ms) {
                    return Verdict::Deny(DenyReason::Cooldown {
                        remaining_ms: cd.expires - now_ms,
                    });
                }
            }
            if command.global_cooldown().is_some() {
                if let Some(cd) = record.active_guild_cooldown(command.id(), now_ms) {
                    return Verdict::Deny(DenyReason::GuildCooldown {
                        remaining_ms: cd.expires - now_ms,
                    });
                }
            }
        }
    }

    Verdict::Allow
}

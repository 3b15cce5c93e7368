use serde::{Deserialize, Serialize};

/// A per-user cooldown on one command. `expires` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCooldown {
    pub user: String,
    pub command: String,
    pub expires: i64,
}

/// A guild-wide cooldown on one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildCooldown {
    pub command: String,
    pub expires: i64,
}

/// The persisted cooldown document for a single guild.
///
/// Read and written as a whole: callers load it, mutate it, and save it back.
/// An entry whose `expires <= now` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildCooldownRecord {
    #[serde(default)]
    pub cooldowns: Vec<UserCooldown>,
    #[serde(default)]
    pub global_cooldowns: Vec<GuildCooldown>,
}

impl GuildCooldownRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cooldowns.is_empty() && self.global_cooldowns.is_empty()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn prune_expired(&mut self, now_ms: i64) -> usize {
        let before = self.cooldowns.len() + self.global_cooldowns.len();
        self.cooldowns.retain(|cd| cd.expires > now_ms);
        self.global_cooldowns.retain(|cd| cd.expires > now_ms);
        before - (self.cooldowns.len() + self.global_cooldowns.len())
    }

    /// The unexpired cooldown for `(user, command)`, if any.
    pub fn active_user_cooldown(&self, user: &str, command: &str, now_ms: i64) -> Option<&UserCooldown> {
        self.cooldowns
            .iter()
            .find(|cd| cd.user == user && cd.command == command && cd.expires > now_ms)
    }

    /// The unexpired guild-wide cooldown for `command`, if any.
    pub fn active_guild_cooldown(&self, command: &str, now_ms: i64) -> Option<&GuildCooldown> {
        self.global_cooldowns
            .iter()
            .find(|cd| cd.command == command && cd.expires > now_ms)
    }

    /// Inserts or replaces the `(user, command)` entry. Never leaves duplicates.
    pub fn set_user_cooldown(&mut self, user: &str, command: &str, expires: i64) {
        self.cooldowns.retain(|cd| !(cd.user == user && cd.command == command));
        self.cooldowns.push(UserCooldown {
            user: user.to_string(),
            command: command.to_string(),
            expires,
        });
    }

    /// Inserts or replaces the guild-wide entry for `command`.
    pub fn set_guild_cooldown(&mut self, command: &str, expires: i64) {
        self.global_cooldowns.retain(|cd| cd.command != command);
        self.global_cooldowns.push(GuildCooldown {
            command: command.to_string(),
            expires,
        });
    }

    /// Removes the `(user, command)` entry. When `expected_expiry` is given the
    /// entry is only removed if it still carries that expiry.
    pub fn remove_user_cooldown(&mut self, user: &str, command: &str, expected_expiry: Option<i64>) -> bool {
        let idx = self.cooldowns.iter().position(|cd| {
            cd.user == user
                && cd.command == command
                && expected_expiry.map_or(true, |e| cd.expires == e)
        });
        match idx {
            Some(i) => {
                self.cooldowns.remove(i);
                true
            }
            None => false,
        }
    }

    /// Guild-wide counterpart of [`remove_user_cooldown`](Self::remove_user_cooldown).
    pub fn remove_guild_cooldown(&mut self, command: &str, expected_expiry: Option<i64>) -> bool {
        let idx = self.global_cooldowns.iter().position(|cd| {
            cd.command == command && expected_expiry.map_or(true, |e| cd.expires == e)
        });
        match idx {
            Some(i) => {
                self.global_cooldowns.remove(i);
                true
            }
            None => false,
        }
    }
}

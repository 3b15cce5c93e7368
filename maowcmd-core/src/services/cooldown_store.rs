// File: maowcmd-core/src/services/cooldown_store.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use maowcmd_common::models::GuildCooldownRecord;
use maowcmd_common::traits::repository_traits::CooldownRepository;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::Error;
use crate::utils::Clock;

/// Identifies one cooldown entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CooldownKey {
    User { guild: String, user: String, command: String },
    Guild { guild: String, command: String },
}

impl CooldownKey {
    pub fn guild(&self) -> &str {
        match self {
            CooldownKey::User { guild, .. } | CooldownKey::Guild { guild, .. } => guild,
        }
    }
}

struct ScheduledExpiry {
    generation: u64,
    handle: AbortHandle,
}

/// Per-guild cooldown records with expiry timers.
///
/// Every mutation is a whole-record read, modify, write against the
/// repository. Persistence failures are logged and the in-memory decision
/// stands. A record that cannot be read is never written back. Each key has at most one live timer: re-activation aborts the
/// previous one, and a timer only removes the entry it was scheduled for.
pub struct CooldownStore {
    repo: Arc<dyn CooldownRepository>,
    clock: Arc<dyn Clock>,
    timers: DashMap<CooldownKey, ScheduledExpiry>,
    generation: AtomicU64,
}

impl CooldownStore {
    pub fn new(repo: Arc<dyn CooldownRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            timers: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Start-up sweep: prunes every stored record and schedules timers for
    /// the entries that are still running. Returns the number pruned.
    pub async fn initialize(self: &Arc<Self>) -> Result<usize, Error> {
        let now = self.clock.now_millis();
        let mut pruned = 0;
        for guild in self.repo.list_guild_ids().await? {
            let Some(mut record) = self.load_logged(&guild).await else {
                continue;
            };
            let removed = record.prune_expired(now);
            if removed > 0 {
                pruned += removed;
                self.save_logged(&guild, &record).await;
            }
            for cd in &record.cooldowns {
                let key = CooldownKey::User {
                    guild: guild.clone(),
                    user: cd.user.clone(),
                    command: cd.command.clone(),
                };
                self.schedule(key, cd.expires);
            }
            for cd in &record.global_cooldowns {
                let key = CooldownKey::Guild {
                    guild: guild.clone(),
                    command: cd.command.clone(),
                };
                self.schedule(key, cd.expires);
            }
        }
        info!("Cooldown store initialized ({} expired entries pruned)", pruned);
        Ok(pruned)
    }

    /// Prunes expired entries in every stored record.
    pub async fn prune_all(&self) -> Result<usize, Error> {
        let now = self.clock.now_millis();
        let mut pruned = 0;
        for guild in self.repo.list_guild_ids().await? {
            if let Some(mut record) = self.load_logged(&guild).await {
                let removed = record.prune_expired(now);
                if removed > 0 {
                    pruned += removed;
                    self.save_logged(&guild, &record).await;
                }
            }
        }
        debug!("Pruned {} expired cooldown entries", pruned);
        Ok(pruned)
    }

    /// The guild's record with expired entries dropped. A missing or
    /// unreadable record is empty.
    pub async fn fetch(&self, guild: &str) -> GuildCooldownRecord {
        let Some(mut record) = self.load_logged(guild).await else {
            return GuildCooldownRecord::new();
        };
        if record.prune_expired(self.clock.now_millis()) > 0 {
            self.save_logged(guild, &record).await;
        }
        record
    }

    /// Starts the per-user and/or guild-wide cooldown for `command` and
    /// schedules the expiry timers. Durations are milliseconds.
    pub async fn activate(
        self: &Arc<Self>,
        guild: &str,
        user: &str,
        command: &str,
        user_ms: Option<u64>,
        guild_ms: Option<u64>,
    ) {
        if user_ms.is_none() && guild_ms.is_none() {
            return;
        }
        let Some(mut record) = self.load_for_update(guild).await else {
            warn!("Skipping cooldown activation of {} in guild {}", command, guild);
            return;
        };
        let now = self.clock.now_millis();
        let mut scheduled = Vec::new();

        if let Some(ms) = user_ms {
            let expires = now.saturating_add(i64::try_from(ms).unwrap_or(i64::MAX));
            record.set_user_cooldown(user, command, expires);
            let key = CooldownKey::User {
                guild: guild.to_string(),
                user: user.to_string(),
                command: command.to_string(),
            };
            scheduled.push((key, expires));
        }
        if let Some(ms) = guild_ms {
            let expires = now.saturating_add(i64::try_from(ms).unwrap_or(i64::MAX));
            record.set_guild_cooldown(command, expires);
            let key = CooldownKey::Guild {
                guild: guild.to_string(),
                command: command.to_string(),
            };
            scheduled.push((key, expires));
        }

        self.save_logged(guild, &record).await;
        for (key, expires) in scheduled {
            debug!("Cooldown {:?} active until {}", key, expires);
            self.schedule(key, expires);
        }
    }

    /// Removes a user's cooldown before it runs out. Returns whether one existed.
    pub async fn reset_user(&self, guild: &str, user: &str, command: &str) -> bool {
        let key = CooldownKey::User {
            guild: guild.to_string(),
            user: user.to_string(),
            command: command.to_string(),
        };
        self.cancel(&key);
        let Some(mut record) = self.load_for_update(guild).await else {
            return false;
        };
        let removed = record.remove_user_cooldown(user, command, None);
        if removed {
            self.save_logged(guild, &record).await;
        }
        removed
    }

    /// Removes a guild-wide cooldown before it runs out.
    pub async fn reset_guild(&self, guild: &str, command: &str) -> bool {
        let key = CooldownKey::Guild {
            guild: guild.to_string(),
            command: command.to_string(),
        };
        self.cancel(&key);
        let Some(mut record) = self.load_for_update(guild).await else {
            return false;
        };
        let removed = record.remove_guild_cooldown(command, None);
        if removed {
            self.save_logged(guild, &record).await;
        }
        removed
    }

    /// Number of expiry timers still waiting to fire.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Aborts every pending timer. Stored entries are left for the next start-up sweep.
    pub fn shutdown(&self) {
        for entry in self.timers.iter() {
            entry.value().handle.abort();
        }
        self.timers.clear();
    }

    fn schedule(self: &Arc<Self>, key: CooldownKey, expires: i64) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let delay = Duration::from_millis(expires.saturating_sub(self.clock.now_millis()).max(0) as u64);

        // The shard stays locked until the handle is stored, so the task
        // cannot observe the map before its own entry exists.
        let entry = self.timers.entry(key.clone());
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            store.expire(&key, expires, generation).await;
        })
        .abort_handle();

        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(ScheduledExpiry { generation, handle });
                previous.handle.abort();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(ScheduledExpiry { generation, handle });
            }
        }
    }

    fn cancel(&self, key: &CooldownKey) {
        if let Some((_, scheduled)) = self.timers.remove(key) {
            scheduled.handle.abort();
        }
    }

    /// Timer body. A no-op when the entry was reset or re-activated meanwhile.
    async fn expire(&self, key: &CooldownKey, expires: i64, generation: u64) {
        self.timers.remove_if(key, |_, scheduled| scheduled.generation == generation);

        let guild = key.guild();
        let Some(mut record) = self.load_logged(guild).await else {
            return;
        };
        let removed = match key {
            CooldownKey::User { user, command, .. } => record.remove_user_cooldown(user, command, Some(expires)),
            CooldownKey::Guild { command, .. } => record.remove_guild_cooldown(command, Some(expires)),
        };
        let pruned = record.prune_expired(self.clock.now_millis());
        if removed || pruned > 0 {
            debug!("Cooldown {:?} expired", key);
            self.save_logged(guild, &record).await;
        }
    }

    /// The pruned record to mutate, or `None` when it could not be read.
    /// A guild with no stored record starts empty.
    async fn load_for_update(&self, guild: &str) -> Option<GuildCooldownRecord> {
        match self.repo.load_guild_record(guild).await {
            Ok(record) => {
                let mut record = record.unwrap_or_default();
                record.prune_expired(self.clock.now_millis());
                Some(record)
            }
            Err(e) => {
                warn!("Failed to load cooldowns for guild {}: {:?}", guild, e);
                None
            }
        }
    }

    async fn load_logged(&self, guild: &str) -> Option<GuildCooldownRecord> {
        match self.repo.load_guild_record(guild).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to load cooldowns for guild {}: {:?}", guild, e);
                None
            }
        }
    }

    async fn save_logged(&self, guild: &str, record: &GuildCooldownRecord) {
        if let Err(e) = self.repo.save_guild_record(guild, record).await {
            warn!("Failed to save cooldowns for guild {}: {:?}", guild, e);
        }
    }
}

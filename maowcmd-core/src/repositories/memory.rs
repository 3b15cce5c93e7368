// src/repositories/memory.rs

use async_trait::async_trait;
use dashmap::DashMap;
use maowcmd_common::models::GuildCooldownRecord;
use maowcmd_common::traits::repository_traits::CooldownRepository;

use crate::Error;

/// Keeps guild records in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryCooldownRepository {
    records: DashMap<String, GuildCooldownRecord>,
}

impl InMemoryCooldownRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored copy of a record, bypassing the trait.
    pub fn snapshot(&self, guild_id: &str) -> Option<GuildCooldownRecord> {
        self.records.get(guild_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl CooldownRepository for InMemoryCooldownRepository {
    async fn load_guild_record(&self, guild_id: &str) -> Result<Option<GuildCooldownRecord>, Error> {
        Ok(self.snapshot(guild_id))
    }

    async fn save_guild_record(&self, guild_id: &str, record: &GuildCooldownRecord) -> Result<(), Error> {
        self.records.insert(guild_id.to_string(), record.clone());
        Ok(())
    }

    async fn list_guild_ids(&self) -> Result<Vec<String>, Error> {
        let mut ids: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}

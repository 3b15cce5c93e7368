use async_trait::async_trait;

use crate::error::Error;
use crate::models::GuildCooldownRecord;

/// Persistence for guild cooldown documents.
///
/// Records are always read and written whole; the store layer accepts
/// last-writer-wins between concurrent read-modify-write cycles.
#[async_trait]
pub trait CooldownRepository: Send + Sync {
    async fn load_guild_record(&self, guild_id: &str) -> Result<Option<GuildCooldownRecord>, Error>;
    async fn save_guild_record(&self, guild_id: &str, record: &GuildCooldownRecord) -> Result<(), Error>;

    /// Every guild that has a stored record. Used by the prune sweep.
    async fn list_guild_ids(&self) -> Result<Vec<String>, Error>;
}

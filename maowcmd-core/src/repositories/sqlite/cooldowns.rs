// src/repositories/sqlite/cooldowns.rs

use async_trait::async_trait;
use chrono::Utc;
use maowcmd_common::models::GuildCooldownRecord;
use maowcmd_common::traits::repository_traits::CooldownRepository;
use sqlx::Row;

use crate::Error;

/// One row per guild; the two entry lists are stored as JSON arrays.
#[derive(Clone)]
pub struct SqliteCooldownRepository {
    pub pool: sqlx::Pool<sqlx::Sqlite>,
}

impl SqliteCooldownRepository {
    pub fn new(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CooldownRepository for SqliteCooldownRepository {
    async fn load_guild_record(&self, guild_id: &str) -> Result<Option<GuildCooldownRecord>, Error> {
        let row = sqlx::query(
            r#"
            SELECT cooldowns, global_cooldowns
            FROM guild_cooldowns
            WHERE guild_id = ?
            "#,
        )
        .bind(guild_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row {
            let cooldowns: String = r.try_get("cooldowns")?;
            let global_cooldowns: String = r.try_get("global_cooldowns")?;
            Ok(Some(GuildCooldownRecord {
                cooldowns: serde_json::from_str(&cooldowns)?,
                global_cooldowns: serde_json::from_str(&global_cooldowns)?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn save_guild_record(&self, guild_id: &str, record: &GuildCooldownRecord) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO guild_cooldowns (guild_id, cooldowns, global_cooldowns, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE
            SET cooldowns = excluded.cooldowns,
                global_cooldowns = excluded.global_cooldowns,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(guild_id)
        .bind(serde_json::to_string(&record.cooldowns)?)
        .bind(serde_json::to_string(&record.global_cooldowns)?)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_guild_ids(&self) -> Result<Vec<String>, Error> {
        let rows = sqlx::query("SELECT guild_id FROM guild_cooldowns ORDER BY guild_id")
            .fetch_all(&self.pool)
            .await?;
        let mut ids = Vec::with_capacity(rows.len());
        for r in rows {
            ids.push(r.try_get("guild_id")?);
        }
        Ok(ids)
    }
}

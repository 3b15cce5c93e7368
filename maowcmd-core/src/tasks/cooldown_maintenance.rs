// maowcmd-core/src/tasks/cooldown_maintenance.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::services::cooldown_store::CooldownStore;

/// Spawns a background task that periodically prunes expired cooldowns from every stored guild record.
pub fn spawn_cooldown_prune_task(store: Arc<CooldownStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match store.prune_all().await {
                Ok(n) if n > 0 => debug!("Periodic sweep pruned {} cooldowns", n),
                Ok(_) => {}
                Err(e) => error!("Periodic cooldown sweep failed: {:?}", e),
            }
        }
    })
}

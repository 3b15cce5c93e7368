use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use maowcmd_common::traits::repository_traits::CooldownRepository;
use maowcmd_core::platforms::discord::{DiscordGateway, DiscordPlatform};
use maowcmd_core::repositories::{InMemoryCooldownRepository, SqliteCooldownRepository};
use maowcmd_core::services::{CooldownStore, Dispatcher};
use maowcmd_core::tasks::spawn_cooldown_prune_task;
use maowcmd_core::utils::SystemClock;
use maowcmd_core::{Database, Error, HandlerConfig};

mod commands;

#[derive(Parser, Debug, Clone)]
#[command(name = "maowcmd")]
#[command(author, version, about = "maowcmd - Discord command handler with persistent cooldowns")]
struct Args {
    /// Handler configuration (TOML).
    #[arg(long, default_value = "maowcmd.toml")]
    config: String,

    /// SQLite connection URL. Falls back to `DATABASE_URL`.
    #[arg(long)]
    database_url: Option<String>,

    /// Keep cooldowns in memory only.
    #[arg(long, default_value = "false")]
    memory_store: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive("maowcmd=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("maowcmd starting. config={}", args.config);

    if let Err(e) = run(args).await {
        error!("Server error: {:?}", e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> Result<(), Error> {
    let config = HandlerConfig::load(&args.config)?;
    let token = std::env::var("DISCORD_TOKEN").map_err(|_| Error::Config("DISCORD_TOKEN is not set".into()))?;

    // 1) Cooldown persistence
    let repo: Arc<dyn CooldownRepository> = if args.memory_store {
        warn!("Using in-memory cooldown store; cooldowns will not survive a restart");
        Arc::new(InMemoryCooldownRepository::new())
    } else {
        let db_url = args
            .database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| "sqlite://maowcmd.db?mode=rwc".to_string());
        let db = Database::new(&db_url).await?;
        db.migrate().await?;
        Arc::new(SqliteCooldownRepository::new(db.pool().clone()))
    };

    let store = Arc::new(CooldownStore::new(repo, Arc::new(SystemClock)));
    store.initialize().await?;
    let prune_task = config
        .prune_interval_secs
        .map(|secs| spawn_cooldown_prune_task(store.clone(), Duration::from_secs(secs)));

    // 2) Discord
    let platform = Arc::new(DiscordPlatform::connect(&token).await?);
    let self_id = platform.current_user_id().await?;
    let (gateway, events) = DiscordGateway::connect(&token, platform.http()).await?;

    // 3) Load commands and start dispatching
    let entries = commands::builtin_commands(&config, store.clone())?;
    let dispatcher = Arc::new(Dispatcher::new(config, platform, store.clone()).with_self_user_id(self_id));
    let summary = dispatcher.load(entries).await?;
    info!(
        "Loaded {} commands ({} global, {} test-guild declarations, {} scopes published)",
        summary.commands, summary.global_declarations, summary.test_guild_declarations, summary.published_scopes
    );
    let listener = dispatcher.listen(events);

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received; shutting down");

    gateway.shutdown().await;
    if let Some(task) = listener {
        task.abort();
    }
    if let Some(task) = prune_task {
        task.abort();
    }
    store.shutdown();
    Ok(())
}

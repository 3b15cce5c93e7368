// File: maowcmd-core/src/services/publisher.rs

use maowcmd_common::models::{CommandDeclaration, PublishScope};
use maowcmd_common::traits::platform_traits::ChatPlatform;
use tracing::{debug, info};

use crate::Error;
use crate::services::command_registry::CommandRegistry;

/// Slash declarations split by where they are published.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub global: Vec<CommandDeclaration>,
    /// Published to every test guild.
    pub test_guilds: Vec<CommandDeclaration>,
}

/// Partitions every interaction-capable command. Test-only commands, and all
/// commands in test mode, go to the test guilds.
pub fn plan(registry: &CommandRegistry, test_mode: bool) -> Result<PublishPlan, Error> {
    let mut plan = PublishPlan::default();
    for command in registry.iter().filter(|c| !c.is_interaction_disallowed()) {
        if command.description().trim().is_empty() {
            return Err(Error::Config(format!(
                "command {} can be invoked as an interaction but has no description",
                command.id()
            )));
        }
        if test_mode || command.is_test_only() {
            plan.test_guilds.push(command.declaration());
        } else {
            plan.global.push(command.declaration());
        }
    }
    Ok(plan)
}

/// Order-insensitive over commands; option order is significant.
pub fn declarations_changed(published: &[CommandDeclaration], desired: &[CommandDeclaration]) -> bool {
    if published.len() != desired.len() {
        return true;
    }
    let mut a: Vec<&CommandDeclaration> = published.iter().collect();
    let mut b: Vec<&CommandDeclaration> = desired.iter().collect();
    a.sort_by(|x, y| x.name.cmp(&y.name));
    b.sort_by(|x, y| x.name.cmp(&y.name));
    a != b
}

/// Publishes `desired` to `scope` unless it already matches. Returns whether a publish call was made.
pub async fn sync_scope(
    platform: &dyn ChatPlatform,
    scope: &PublishScope,
    desired: &[CommandDeclaration],
) -> Result<bool, Error> {
    let published = platform.fetch_published_commands(scope).await?;
    if !declarations_changed(&published, desired) {
        debug!("Declarations for {:?} are up to date", scope);
        return Ok(false);
    }
    match scope {
        PublishScope::Global => platform.publish_global_commands(desired).await?,
        PublishScope::Guild(guild) => platform.publish_guild_commands(guild, desired).await?,
    }
    info!("Published {} declarations to {:?}", desired.len(), scope);
    Ok(true)
}

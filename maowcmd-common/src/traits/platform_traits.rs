use async_trait::async_trait;

use crate::error::Error;
use crate::models::{CommandDeclaration, InteractionRef, MessageRef, PublishScope, SentMessage};

/// Everything the dispatcher needs from a chat platform client.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<SentMessage, Error>;
    async fn reply_to_message(&self, origin: &MessageRef, content: &str) -> Result<SentMessage, Error>;
    async fn edit_message(&self, message: &MessageRef, content: &str) -> Result<SentMessage, Error>;
    async fn react(&self, origin: &MessageRef, emoji: &str) -> Result<(), Error>;

    async fn defer_response(&self, interaction: &InteractionRef, ephemeral: bool) -> Result<(), Error>;
    async fn respond_to_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), Error>;
    async fn edit_interaction_response(&self, interaction: &InteractionRef, content: &str) -> Result<SentMessage, Error>;
    async fn follow_up_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> Result<SentMessage, Error>;
    async fn fetch_interaction_response(&self, interaction: &InteractionRef) -> Result<SentMessage, Error>;

    async fn publish_global_commands(&self, commands: &[CommandDeclaration]) -> Result<(), Error>;
    async fn publish_guild_commands(&self, guild_id: &str, commands: &[CommandDeclaration]) -> Result<(), Error>;
    async fn fetch_published_commands(&self, scope: &PublishScope) -> Result<Vec<CommandDeclaration>, Error>;
}

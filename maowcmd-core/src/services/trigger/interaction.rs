// File: maowcmd-core/src/services/trigger/interaction.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use maowcmd_common::models::{IncomingInteraction, InteractionRef, SentMessage};
use maowcmd_common::traits::platform_traits::ChatPlatform;

use crate::Error;
use crate::services::command::Command;
use crate::services::trigger::arguments::ArgumentMap;

/// Trigger backed by a structured command interaction.
pub struct InteractionTrigger {
    interaction: IncomingInteraction,
    argv: ArgumentMap,
    args: Vec<String>,
    content: String,
    ephemeral: bool,
    deferred: AtomicBool,
    responded: AtomicBool,
    platform: Arc<dyn ChatPlatform>,
}

impl InteractionTrigger {
    pub fn new(interaction: IncomingInteraction, command: &Command, platform: Arc<dyn ChatPlatform>) -> Self {
        let args: Vec<String> = interaction.options.iter().map(|(_, v)| v.to_string()).collect();
        let content = if args.is_empty() {
            format!("/{}", interaction.command_name)
        } else {
            format!("/{} {}", interaction.command_name, args.join(" "))
        };
        let argv = ArgumentMap::from_pairs(interaction.options.clone());
        Self {
            interaction,
            argv,
            args,
            content,
            ephemeral: command.is_ephemeral(),
            deferred: AtomicBool::new(false),
            responded: AtomicBool::new(false),
            platform,
        }
    }

    pub fn interaction(&self) -> &IncomingInteraction {
        &self.interaction
    }

    pub fn argv(&self) -> &ArgumentMap {
        &self.argv
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `/name value value ...`
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred.load(Ordering::SeqCst)
    }

    pub fn has_responded(&self) -> bool {
        self.responded.load(Ordering::SeqCst)
    }

    fn handle(&self) -> InteractionRef {
        InteractionRef {
            id: self.interaction.id.clone(),
            token: self.interaction.token.clone(),
        }
    }

    /// Acknowledges the interaction without content.
    pub async fn defer(&self) -> Result<(), Error> {
        self.platform.defer_response(&self.handle(), self.ephemeral).await?;
        self.deferred.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// First reply answers the interaction. After a deferral it fills in the
    /// deferred response; after an answer it becomes a follow-up.
    pub async fn reply(&self, content: &str) -> Result<Option<SentMessage>, Error> {
        if self.has_responded() {
            return self.follow_up(content).await.map(Some);
        }
        if self.is_deferred() {
            let sent = self.platform.edit_interaction_response(&self.handle(), content).await?;
            self.responded.store(true, Ordering::SeqCst);
            return Ok(Some(sent));
        }
        self.platform
            .respond_to_interaction(&self.handle(), content, self.ephemeral)
            .await?;
        self.responded.store(true, Ordering::SeqCst);
        Ok(None)
    }

    pub async fn edit(&self, content: &str) -> Result<SentMessage, Error> {
        if !self.has_responded() && !self.is_deferred() {
            return Err(Error::NotResponded);
        }
        let sent = self.platform.edit_interaction_response(&self.handle(), content).await?;
        self.responded.store(true, Ordering::SeqCst);
        Ok(sent)
    }

    pub async fn follow_up(&self, content: &str) -> Result<SentMessage, Error> {
        self.platform
            .follow_up_interaction(&self.handle(), content, self.ephemeral)
            .await
    }

    pub async fn fetch_reply(&self) -> Result<Option<SentMessage>, Error> {
        if !self.has_responded() && !self.is_deferred() {
            return Ok(None);
        }
        self.platform.fetch_interaction_response(&self.handle()).await.map(Some)
    }

    /// Private notice to the invoking user, used for denials.
    pub async fn notify(&self, content: &str) -> Result<(), Error> {
        if self.has_responded() || self.is_deferred() {
            self.platform.follow_up_interaction(&self.handle(), content, true).await?;
            return Ok(());
        }
        self.platform.respond_to_interaction(&self.handle(), content, true).await?;
        self.responded.store(true, Ordering::SeqCst);
        Ok(())
    }
}

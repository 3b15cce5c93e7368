// File: maowcmd-core/src/test_utils/mod.rs
//
// In-process stand-ins for the chat platform and the wall clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maowcmd_common::models::{
    Author, CommandDeclaration, IncomingInteraction, IncomingMessage, InteractionRef, MessageRef, OptionValue,
    PublishScope, SentMessage,
};
use maowcmd_common::traits::platform_traits::ChatPlatform;
use parking_lot::Mutex;

use crate::Error;
use crate::utils::Clock;

/// Every outbound call a [`RecordingPlatform`] received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Send { channel_id: String, content: String },
    Reply { origin: MessageRef, content: String },
    Edit { message: MessageRef, content: String },
    React { origin: MessageRef, emoji: String },
    Defer { interaction_id: String, ephemeral: bool },
    Respond { interaction_id: String, content: String, ephemeral: bool },
    EditResponse { interaction_id: String, content: String },
    FollowUp { interaction_id: String, content: String, ephemeral: bool },
    FetchResponse { interaction_id: String },
    PublishGlobal(Vec<CommandDeclaration>),
    PublishGuild { guild_id: String, commands: Vec<CommandDeclaration> },
    FetchPublished(PublishScope),
}

/// A [`ChatPlatform`] that records calls and remembers published declarations.
#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    published: Mutex<HashMap<PublishScope, Vec<CommandDeclaration>>>,
    next_id: AtomicU64,
    fail_publish: AtomicBool,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Text of every message-like call (send, reply, edit, interaction responses), in order.
    pub fn texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Send { content, .. }
                | PlatformCall::Reply { content, .. }
                | PlatformCall::Edit { content, .. }
                | PlatformCall::Respond { content, .. }
                | PlatformCall::EditResponse { content, .. }
                | PlatformCall::FollowUp { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn reactions(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::React { emoji, .. } => Some(emoji.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn publish_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PlatformCall::PublishGlobal(_) | PlatformCall::PublishGuild { .. }))
            .count()
    }

    pub fn published(&self, scope: &PublishScope) -> Vec<CommandDeclaration> {
        self.published.lock().get(scope).cloned().unwrap_or_default()
    }

    pub fn set_published(&self, scope: PublishScope, commands: Vec<CommandDeclaration>) {
        self.published.lock().insert(scope, commands);
    }

    /// Makes every publish call fail with a platform error.
    pub fn fail_publishing(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().push(call);
    }

    fn sent(&self, channel_id: &str, content: &str) -> SentMessage {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        SentMessage {
            channel_id: channel_id.to_string(),
            message_id: format!("sent-{}", id),
            content: content.to_string(),
        }
    }

    fn check_publish(&self) -> Result<(), Error> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(Error::Platform("publishing disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<SentMessage, Error> {
        self.record(PlatformCall::Send {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        });
        Ok(self.sent(channel_id, content))
    }

    async fn reply_to_message(&self, origin: &MessageRef, content: &str) -> Result<SentMessage, Error> {
        self.record(PlatformCall::Reply {
            origin: origin.clone(),
            content: content.to_string(),
        });
        Ok(self.sent(&origin.channel_id, content))
    }

    async fn edit_message(&self, message: &MessageRef, content: &str) -> Result<SentMessage, Error> {
        self.record(PlatformCall::Edit {
            message: message.clone(),
            content: content.to_string(),
        });
        Ok(SentMessage {
            channel_id: message.channel_id.clone(),
            message_id: message.message_id.clone(),
            content: content.to_string(),
        })
    }

    async fn react(&self, origin: &MessageRef, emoji: &str) -> Result<(), Error> {
        self.record(PlatformCall::React {
            origin: origin.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn defer_response(&self, interaction: &InteractionRef, ephemeral: bool) -> Result<(), Error> {
        self.record(PlatformCall::Defer {
            interaction_id: interaction.id.clone(),
            ephemeral,
        });
        Ok(())
    }

    async fn respond_to_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), Error> {
        self.record(PlatformCall::Respond {
            interaction_id: interaction.id.clone(),
            content: content.to_string(),
            ephemeral,
        });
        Ok(())
    }

    async fn edit_interaction_response(&self, interaction: &InteractionRef, content: &str) -> Result<SentMessage, Error> {
        self.record(PlatformCall::EditResponse {
            interaction_id: interaction.id.clone(),
            content: content.to_string(),
        });
        Ok(SentMessage {
            channel_id: String::new(),
            message_id: format!("response-{}", interaction.id),
            content: content.to_string(),
        })
    }

    async fn follow_up_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> Result<SentMessage, Error> {
        self.record(PlatformCall::FollowUp {
            interaction_id: interaction.id.clone(),
            content: content.to_string(),
            ephemeral,
        });
        Ok(self.sent("", content))
    }

    async fn fetch_interaction_response(&self, interaction: &InteractionRef) -> Result<SentMessage, Error> {
        self.record(PlatformCall::FetchResponse {
            interaction_id: interaction.id.clone(),
        });
        Ok(SentMessage {
            channel_id: String::new(),
            message_id: format!("response-{}", interaction.id),
            content: String::new(),
        })
    }

    async fn publish_global_commands(&self, commands: &[CommandDeclaration]) -> Result<(), Error> {
        self.record(PlatformCall::PublishGlobal(commands.to_vec()));
        self.check_publish()?;
        self.set_published(PublishScope::Global, commands.to_vec());
        Ok(())
    }

    async fn publish_guild_commands(&self, guild_id: &str, commands: &[CommandDeclaration]) -> Result<(), Error> {
        self.record(PlatformCall::PublishGuild {
            guild_id: guild_id.to_string(),
            commands: commands.to_vec(),
        });
        self.check_publish()?;
        self.set_published(PublishScope::Guild(guild_id.to_string()), commands.to_vec());
        Ok(())
    }

    async fn fetch_published_commands(&self, scope: &PublishScope) -> Result<Vec<CommandDeclaration>, Error> {
        self.record(PlatformCall::FetchPublished(scope.clone()));
        Ok(self.published(scope))
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn author(id: &str) -> Author {
    Author {
        id: id.to_string(),
        name: format!("user-{}", id),
        bot: false,
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap_or_default()
}

/// A text message in `guild` (`None` for a DM) posted to channel `c1`.
pub fn text_message(id: &str, author_id: &str, guild: Option<&str>, content: &str) -> IncomingMessage {
    IncomingMessage {
        id: id.to_string(),
        channel_id: "c1".to_string(),
        channel_name: guild.map(|_| "general".to_string()),
        guild_id: guild.map(str::to_string),
        guild_name: guild.map(|_| "Test Server".to_string()),
        author: author(author_id),
        content: content.to_string(),
        created_at: epoch(),
    }
}

pub fn interaction(
    id: &str,
    author_id: &str,
    guild: Option<&str>,
    command: &str,
    options: Vec<(String, OptionValue)>,
) -> IncomingInteraction {
    IncomingInteraction {
        id: id.to_string(),
        token: format!("token-{}", id),
        channel_id: "c1".to_string(),
        guild_id: guild.map(str::to_string),
        author: author(author_id),
        command_name: command.to_string(),
        options,
        created_at: epoch(),
    }
}

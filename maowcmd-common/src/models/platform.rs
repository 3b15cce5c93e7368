use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::options::OptionValue;

/// The user behind an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// Mention markup, e.g. `<@1234>`.
    pub fn tag(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Identifies a message that already exists on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// Identifies a pending interaction (slash command invocation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRef {
    pub id: String,
    pub token: String,
}

/// A message the bot has sent, returned by reply/edit/follow-up calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub channel_id: String,
    pub message_id: String,
    pub content: String,
}

impl SentMessage {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            channel_id: self.channel_id.clone(),
            message_id: self.message_id.clone(),
        }
    }
}

/// Where slash-command declarations are published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublishScope {
    Global,
    Guild(String),
}

/// A free-text chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub channel_name: Option<String>,
    /// `None` for direct messages.
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A structured command interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingInteraction {
    pub id: String,
    pub token: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author: Author,
    pub command_name: String,
    /// Option values in the order the platform supplied them.
    pub options: Vec<(String, OptionValue)>,
    pub created_at: DateTime<Utc>,
}

/// Everything the dispatcher listens to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundEvent {
    Message(IncomingMessage),
    Interaction(IncomingInteraction),
}

impl InboundEvent {
    pub fn id(&self) -> &str {
        match self {
            InboundEvent::Message(m) => &m.id,
            InboundEvent::Interaction(i) => &i.id,
        }
    }

    pub fn guild_id(&self) -> Option<&str> {
        match self {
            InboundEvent::Message(m) => m.guild_id.as_deref(),
            InboundEvent::Interaction(i) => i.guild_id.as_deref(),
        }
    }
}

// File: maowcmd-core/src/services/trigger/mod.rs
//
// One capability surface over the two invocation paths.

pub mod arguments;
pub mod interaction;
pub mod text;

use chrono::{DateTime, Utc};
use maowcmd_common::models::{Author, SentMessage};

use crate::Error;

pub use arguments::{ArgumentMap, Binding, ParsedFlags, bind_flags, bind_positional, coerce, parse_flags};
pub use interaction::InteractionTrigger;
pub use text::{ParsedInvocation, TextTrigger, parse_invocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Text,
    Interaction,
}

/// The event that invoked a command.
pub enum Trigger {
    Text(TextTrigger),
    Interaction(InteractionTrigger),
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Text(_) => TriggerKind::Text,
            Trigger::Interaction(_) => TriggerKind::Interaction,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Trigger::Text(_))
    }

    pub fn is_interaction(&self) -> bool {
        matches!(self, Trigger::Interaction(_))
    }

    /// Platform id of the message or interaction.
    pub fn id(&self) -> &str {
        match self {
            Trigger::Text(t) => &t.message().id,
            Trigger::Interaction(i) => &i.interaction().id,
        }
    }

    pub fn author(&self) -> &Author {
        match self {
            Trigger::Text(t) => &t.message().author,
            Trigger::Interaction(i) => &i.interaction().author,
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            Trigger::Text(t) => &t.message().channel_id,
            Trigger::Interaction(i) => &i.interaction().channel_id,
        }
    }

    pub fn channel_name(&self) -> Option<&str> {
        match self {
            Trigger::Text(t) => t.message().channel_name.as_deref(),
            Trigger::Interaction(_) => None,
        }
    }

    /// `None` in direct messages.
    pub fn guild_id(&self) -> Option<&str> {
        match self {
            Trigger::Text(t) => t.message().guild_id.as_deref(),
            Trigger::Interaction(i) => i.interaction().guild_id.as_deref(),
        }
    }

    /// Only known for text messages.
    pub fn guild_name(&self) -> Option<&str> {
        match self {
            Trigger::Text(t) => t.message().guild_name.as_deref(),
            Trigger::Interaction(_) => None,
        }
    }

    pub fn is_dm(&self) -> bool {
        self.guild_id().is_none()
    }

    /// Raw message text, or `/name values...` for an interaction.
    pub fn content(&self) -> &str {
        match self {
            Trigger::Text(t) => &t.message().content,
            Trigger::Interaction(i) => i.content(),
        }
    }

    /// The name the user typed (or the interaction's command name).
    pub fn invoked_name(&self) -> &str {
        match self {
            Trigger::Text(t) => &t.invocation().name,
            Trigger::Interaction(i) => &i.interaction().command_name,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            Trigger::Text(t) => &t.invocation().args,
            Trigger::Interaction(i) => i.args(),
        }
    }

    pub fn text(&self) -> String {
        match self {
            Trigger::Text(t) => t.invocation().text.clone(),
            Trigger::Interaction(i) => i.args().join(" "),
        }
    }

    pub fn argv(&self) -> &ArgumentMap {
        match self {
            Trigger::Text(t) => &t.binding().argv,
            Trigger::Interaction(i) => i.argv(),
        }
    }

    /// Argument binding failure, if any. Interactions arrive pre-typed and never fail here.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Trigger::Text(t) => t.binding().error.as_ref(),
            Trigger::Interaction(_) => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Trigger::Text(t) => t.message().created_at,
            Trigger::Interaction(i) => i.interaction().created_at,
        }
    }

    /// Replies to the invoker. Returns the sent message when the platform reports one.
    pub async fn reply(&self, content: &str) -> Result<Option<SentMessage>, Error> {
        match self {
            Trigger::Text(t) => t.reply(content).await.map(Some),
            Trigger::Interaction(i) => i.reply(content).await,
        }
    }

    /// Edits the first reply. [`Error::NotResponded`] before any reply exists.
    pub async fn edit(&self, content: &str) -> Result<SentMessage, Error> {
        match self {
            Trigger::Text(t) => t.edit(content).await,
            Trigger::Interaction(i) => i.edit(content).await,
        }
    }

    pub async fn follow_up(&self, content: &str) -> Result<SentMessage, Error> {
        match self {
            Trigger::Text(t) => t.follow_up(content).await,
            Trigger::Interaction(i) => i.follow_up(content).await,
        }
    }

    pub async fn fetch_reply(&self) -> Result<Option<SentMessage>, Error> {
        match self {
            Trigger::Text(t) => Ok(t.fetch_reply()),
            Trigger::Interaction(i) => i.fetch_reply().await,
        }
    }

    /// Delivers a denial: a channel message on the text path, an ephemeral
    /// response on the interaction path.
    pub async fn notify(&self, content: &str) -> Result<(), Error> {
        match self {
            Trigger::Text(t) => t.send(content).await.map(|_| ()),
            Trigger::Interaction(i) => i.notify(content).await,
        }
    }
}

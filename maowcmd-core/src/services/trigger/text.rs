// File: maowcmd-core/src/services/trigger/text.rs

use std::sync::Arc;

use maowcmd_common::models::{IncomingMessage, MessageRef, SentMessage};
use maowcmd_common::traits::platform_traits::ChatPlatform;
use parking_lot::Mutex;

use crate::Error;
use crate::services::command::{ArgumentStyle, Command};
use crate::services::trigger::arguments::{Binding, bind_flags, bind_positional};

/// A prefixed chat message split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation {
    /// Lower-cased command name as typed.
    pub name: String,
    /// Whitespace-split tokens after the name.
    pub args: Vec<String>,
    /// Everything after the name, trimmed, spacing preserved.
    pub text: String,
}

/// Splits `content` into name, args and text. `None` when the content does
/// not start with `prefix` or holds nothing after it.
pub fn parse_invocation(content: &str, prefix: &str) -> Option<ParsedInvocation> {
    let rest = content.strip_prefix(prefix)?.trim();
    let mut tokens = rest.split_whitespace();
    let raw_name = tokens.next()?;
    let args = tokens.map(str::to_string).collect();
    let text = rest[raw_name.len()..].trim().to_string();
    Some(ParsedInvocation {
        name: raw_name.to_lowercase(),
        args,
        text,
    })
}

/// Trigger backed by a free-text message.
pub struct TextTrigger {
    message: IncomingMessage,
    invocation: ParsedInvocation,
    binding: Binding,
    /// The bot's first reply, which `edit` and `fetch_reply` operate on.
    response: Mutex<Option<SentMessage>>,
    platform: Arc<dyn ChatPlatform>,
}

impl TextTrigger {
    pub fn new(
        message: IncomingMessage,
        invocation: ParsedInvocation,
        command: &Command,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        let binding = match command.argument_style() {
            ArgumentStyle::Positional => bind_positional(&invocation.args, command.options()),
            ArgumentStyle::Flags => bind_flags(&invocation.args, command.options(), command.argv_aliases()),
        };
        Self {
            message,
            invocation,
            binding,
            response: Mutex::new(None),
            platform,
        }
    }

    pub fn message(&self) -> &IncomingMessage {
        &self.message
    }

    pub fn invocation(&self) -> &ParsedInvocation {
        &self.invocation
    }

    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn origin(&self) -> MessageRef {
        MessageRef {
            channel_id: self.message.channel_id.clone(),
            message_id: self.message.id.clone(),
        }
    }

    pub async fn reply(&self, content: &str) -> Result<SentMessage, Error> {
        let sent = self.platform.reply_to_message(&self.origin(), content).await?;
        self.response.lock().get_or_insert_with(|| sent.clone());
        Ok(sent)
    }

    /// Edits the first reply. Fails with [`Error::NotResponded`] before any reply.
    pub async fn edit(&self, content: &str) -> Result<SentMessage, Error> {
        let target = self
            .response
            .lock()
            .as_ref()
            .map(SentMessage::message_ref)
            .ok_or(Error::NotResponded)?;
        let sent = self.platform.edit_message(&target, content).await?;
        *self.response.lock() = Some(sent.clone());
        Ok(sent)
    }

    /// Another reply to the origin message, leaving the first reply untouched.
    pub async fn follow_up(&self, content: &str) -> Result<SentMessage, Error> {
        self.platform.reply_to_message(&self.origin(), content).await
    }

    pub fn fetch_reply(&self) -> Option<SentMessage> {
        self.response.lock().clone()
    }

    pub async fn send(&self, content: &str) -> Result<SentMessage, Error> {
        self.platform.send_message(&self.message.channel_id, content).await
    }

    pub async fn react(&self, emoji: &str) -> Result<(), Error> {
        self.platform.react(&self.origin(), emoji).await
    }
}

// File: maowcmd-core/src/services/command_logger.rs

use std::sync::Arc;

use maowcmd_common::traits::platform_traits::ChatPlatform;
use tracing::warn;

use crate::config::LoggerSettings;
use crate::services::trigger::Trigger;

/// Posts a line to the configured log channels for every successful command.
pub struct CommandLogger {
    platform: Arc<dyn ChatPlatform>,
    channels: Vec<String>,
    format: String,
}

impl CommandLogger {
    pub fn new(platform: Arc<dyn ChatPlatform>, settings: &LoggerSettings) -> Self {
        Self {
            platform,
            channels: settings.channels.clone(),
            format: settings.format.clone(),
        }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub async fn log(&self, trigger: &Trigger) {
        let line = self.render(trigger);
        self.send(&line).await;
    }

    /// Reports a command whose callback errored or panicked.
    pub async fn log_failure(&self, trigger: &Trigger, command: &str, detail: &str) {
        let line = format!(
            "Command `{}` used by {} failed: {}",
            command,
            trigger.author().tag(),
            detail
        );
        self.send(&line).await;
    }

    /// Posts free text to every log channel. Failures are logged and skipped.
    pub async fn send(&self, text: &str) {
        for channel in &self.channels {
            if let Err(e) = self.platform.send_message(channel, text).await {
                warn!("Failed to write command log to channel {}: {:?}", channel, e);
            }
        }
    }

    /// Fills `$authorName$`, `$authorTag$`, `$content$`, `$channelName$`,
    /// `$channelTag$`, `$serverName$` and `$timestamp$`.
    pub fn render(&self, trigger: &Trigger) -> String {
        let author = trigger.author();
        let channel_name = match (trigger.channel_name(), trigger.guild_id()) {
            (Some(name), _) => name.to_string(),
            (None, None) => author.name.clone(),
            (None, Some(_)) => trigger.channel_id().to_string(),
        };
        let server = match (trigger.guild_name(), trigger.guild_id()) {
            (Some(name), _) => name.to_string(),
            (None, Some(id)) => id.to_string(),
            (None, None) => author.tag(),
        };

        self.format
            .replace("$authorName$", &author.name)
            .replace("$authorTag$", &author.tag())
            .replace("$content$", trigger.content())
            .replace("$channelName$", &channel_name)
            .replace("$channelTag$", &format!("<#{}>", trigger.channel_id()))
            .replace("$serverName$", &server)
            .replace(
                "$timestamp$",
                &trigger.created_at().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            )
    }
}

// File: maowcmd-core/src/services/help_command.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use maowcmd_common::models::{OptionDeclaration, OptionKind};

use crate::Error;
use crate::config::HelpSettings;
use crate::services::command::{Command, CommandContext, CommandHandler, CommandOutcome};
use crate::services::command_registry::CommandRegistry;

const DEFAULT_TITLE: &str = "Commands";

/// Builds the built-in help command from its settings.
pub fn build_help_command(settings: &HelpSettings) -> Result<Command, Error> {
    Command::builder(&settings.names)
        .description("Display help")
        .category("help")
        .option(OptionDeclaration::new("command", "Command to describe", OptionKind::String))
        .handler(Arc::new(HelpHandler {
            settings: settings.clone(),
        }))
        .build()
}

struct HelpHandler {
    settings: HelpSettings,
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn run(&self, ctx: CommandContext) -> anyhow::Result<CommandOutcome> {
        let text = ctx.text.trim();
        let body = if text.is_empty() {
            let in_test_guild = ctx
                .trigger
                .guild_id()
                .is_some_and(|g| ctx.policy.test_guilds.contains(g));
            render_listing(&self.settings, &ctx.commands, in_test_guild)
        } else {
            match ctx.commands.lookup(text) {
                Some(command) => render_command(&command),
                None => return Ok(CommandOutcome::Success),
            }
        };

        if ctx.trigger.is_text() {
            ctx.platform.send_message(ctx.trigger.channel_id(), &body).await?;
        } else {
            ctx.trigger.reply(&body).await?;
        }
        Ok(CommandOutcome::Success)
    }
}

/// Every visible command, grouped by category when enabled. The help command
/// itself is left out, and test-only commands only show in test guilds.
pub fn render_listing(settings: &HelpSettings, commands: &CommandRegistry, in_test_guild: bool) -> String {
    let own_id = settings.names.first().map(|n| n.to_lowercase());
    let visible = commands
        .iter()
        .filter(|c| Some(c.id()) != own_id.as_deref())
        .filter(|c| !c.is_test_only() || in_test_guild);

    let title = settings.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let mut out = format!("**{}**\n", title);

    if settings.categories {
        let mut groups: BTreeMap<&str, Vec<&Arc<Command>>> = BTreeMap::new();
        for command in visible {
            groups.entry(command.category().unwrap_or_default()).or_default().push(command);
        }
        for (category, members) in groups {
            out.push_str(&format!("\n*{}*\n", capitalise(category)));
            for command in members {
                out.push_str(&entry_line(command));
            }
        }
    } else {
        for command in visible {
            out.push_str(&entry_line(command));
        }
    }
    out.trim_end().to_string()
}

pub fn render_command(command: &Command) -> String {
    let description = if command.description().is_empty() {
        "This command doesn't have a description."
    } else {
        command.description()
    };
    let mut out = format!("**{}**\n{}\nCategory: {}", command.id(), description, command.category().unwrap_or_default());
    if command.names().len() > 1 {
        out.push_str(&format!("\nAliases: {}", command.names()[1..].join(", ")));
    }
    out
}

fn entry_line(command: &Command) -> String {
    if command.description().is_empty() {
        format!("**{}**\n", capitalise(command.id()))
    } else {
        format!("**{}** - {}\n", capitalise(command.id()), command.description())
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

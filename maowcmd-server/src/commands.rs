// maowcmd-server/src/commands.rs
//
// Commands shipped with the stock binary.

use std::sync::Arc;

use maowcmd_common::models::{OptionDeclaration, OptionKind};
use maowcmd_core::Error;
use maowcmd_core::config::HandlerConfig;
use maowcmd_core::services::{ArgumentStyle, Command, CommandEntry, CommandOutcome, CooldownStore};
use rand::Rng;

pub fn builtin_commands(config: &HandlerConfig, store: Arc<CooldownStore>) -> Result<Vec<CommandEntry>, Error> {
    let mut entries = vec![
        CommandEntry::from_path("fun/ping", ping()?),
        CommandEntry::from_path("fun/roll", roll()?),
        CommandEntry::from_path("util/say", say()?),
    ];
    if !config.admins.is_empty() {
        entries.push(CommandEntry::from_path("admin/resetcooldown", reset_cooldown(store)?));
    }
    Ok(entries)
}

fn ping() -> Result<Command, Error> {
    Command::builder(["ping", "p"])
        .description("Check that the bot is alive")
        .cooldown("5s")
        .react("🏓")
        .run(|ctx| async move {
            ctx.trigger.reply("Pong!").await?;
            Ok(CommandOutcome::Success)
        })
        .build()
}

fn roll() -> Result<Command, Error> {
    Command::builder(["roll", "dice"])
        .description("Roll a die")
        .option(OptionDeclaration::new("sides", "Number of sides (default 6)", OptionKind::Integer))
        .max_args(1)
        .global_cooldown("2s")
        .run(|ctx| async move {
            if let Some(e) = ctx.trigger.error() {
                ctx.trigger.reply(&format!("{}", e)).await?;
                return Ok(CommandOutcome::Failure);
            }
            let sides = ctx.argv.get_integer("sides").unwrap_or(6);
            if sides < 2 {
                ctx.trigger.reply("A die needs at least two sides.").await?;
                return Ok(CommandOutcome::Failure);
            }
            let value = rand::rng().random_range(1..=sides);
            ctx.trigger.reply(&format!("🎲 {}", value)).await?;
            Ok(CommandOutcome::Success)
        })
        .build()
}

fn say() -> Result<Command, Error> {
    Command::builder(["say"])
        .description("Repeat a message")
        .option(OptionDeclaration::new("text", "What to say", OptionKind::String).required(true))
        .option(OptionDeclaration::new("loud", "Shout it", OptionKind::Boolean))
        .argument_style(ArgumentStyle::Flags)
        .argv_alias("text", ["_", "t"])
        .argv_alias("loud", ["l"])
        .min_args(1)
        .no_dm(true)
        .run(|ctx| async move {
            let Some(text) = ctx.argv.get_str("text") else {
                return Ok(CommandOutcome::Failure);
            };
            let text = if ctx.argv.get_bool("loud").unwrap_or(false) {
                text.to_uppercase()
            } else {
                text.to_string()
            };
            ctx.trigger.reply(&text).await?;
            Ok(CommandOutcome::Success)
        })
        .build()
}

fn reset_cooldown(store: Arc<CooldownStore>) -> Result<Command, Error> {
    Command::builder(["resetcooldown"])
        .description("Clear a user's cooldown on a command")
        .option(OptionDeclaration::new("user", "Whose cooldown", OptionKind::User).required(true))
        .option(OptionDeclaration::new("command", "Which command", OptionKind::String).required(true))
        .admin_only(true)
        .no_dm(true)
        .min_args(2)
        .max_args(2)
        .run(move |ctx| {
            let store = store.clone();
            async move {
                let (Some(user), Some(name), Some(guild)) = (
                    ctx.argv.get_id("user"),
                    ctx.argv.get_str("command"),
                    ctx.trigger.guild_id(),
                ) else {
                    ctx.trigger.reply("Usage: resetcooldown <@user> <command>").await?;
                    return Ok(CommandOutcome::Failure);
                };
                let Some(command) = ctx.commands.lookup(name) else {
                    ctx.trigger.reply(&format!("No command named {}", name)).await?;
                    return Ok(CommandOutcome::Failure);
                };
                let cleared = store.reset_user(guild, user, command.id()).await;
                let reply = if cleared { "Cooldown cleared." } else { "No active cooldown." };
                ctx.trigger.reply(reply).await?;
                Ok(CommandOutcome::Success)
            }
        })
        .build()
}

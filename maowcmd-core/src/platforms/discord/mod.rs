// File: maowcmd-core/src/platforms/discord/mod.rs

pub mod runtime;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use maowcmd_common::models::{
    CommandDeclaration, InteractionRef, MessageRef, OptionDeclaration, OptionKind, PublishScope, SentMessage,
};
use maowcmd_common::traits::platform_traits::ChatPlatform;
use tracing::{debug, info};
use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_model::application::command::{Command as TwilightCommand, CommandOption, CommandOptionType, CommandType};
use twilight_model::channel::message::{Message, MessageFlags};
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, ChannelMarker, GuildMarker, InteractionMarker, MessageMarker};
use twilight_util::builder::InteractionResponseDataBuilder;
use twilight_util::builder::command::{
    BooleanBuilder, ChannelBuilder, CommandBuilder, IntegerBuilder, MentionableBuilder, NumberBuilder, RoleBuilder,
    StringBuilder, UserBuilder,
};

use crate::Error;

pub use runtime::DiscordGateway;

/// [`ChatPlatform`] over the Discord REST API.
pub struct DiscordPlatform {
    http: Arc<HttpClient>,
    application_id: Id<ApplicationMarker>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<HttpClient>, application_id: Id<ApplicationMarker>) -> Self {
        Self { http, application_id }
    }

    /// Builds the HTTP client and looks up the application id for `token`.
    pub async fn connect(token: &str) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Platform("Discord token is empty".into()));
        }
        let http = Arc::new(
            ClientBuilder::new()
                .token(token.to_string())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        let application = http
            .current_user_application()
            .await
            .map_err(platform_err("fetching application"))?
            .model()
            .await
            .map_err(platform_err("parsing application"))?;
        info!("(DiscordPlatform) Connected as application {}", application.id);
        Ok(Self::new(http, application.id))
    }

    pub fn http(&self) -> Arc<HttpClient> {
        self.http.clone()
    }

    /// The bot user's id, used to ignore its own messages.
    pub async fn current_user_id(&self) -> Result<String, Error> {
        let user = self
            .http
            .current_user()
            .await
            .map_err(platform_err("fetching current user"))?
            .model()
            .await
            .map_err(platform_err("parsing current user"))?;
        Ok(user.id.to_string())
    }

    async fn respond(&self, interaction: &InteractionRef, response: InteractionResponse) -> Result<(), Error> {
        let id: Id<InteractionMarker> = parse_id(&interaction.id, "interaction")?;
        self.http
            .interaction(self.application_id)
            .create_response(id, &interaction.token, &response)
            .await
            .map_err(platform_err("creating interaction response"))?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<SentMessage, Error> {
        let channel: Id<ChannelMarker> = parse_id(channel_id, "channel")?;
        let message = self
            .http
            .create_message(channel)
            .content(content)
            .await
            .map_err(platform_err("sending message"))?
            .model()
            .await
            .map_err(platform_err("parsing sent message"))?;
        Ok(sent(&message))
    }

    async fn reply_to_message(&self, origin: &MessageRef, content: &str) -> Result<SentMessage, Error> {
        let channel: Id<ChannelMarker> = parse_id(&origin.channel_id, "channel")?;
        let reply_to: Id<MessageMarker> = parse_id(&origin.message_id, "message")?;
        let message = self
            .http
            .create_message(channel)
            .content(content)
            .reply(reply_to)
            .await
            .map_err(platform_err("sending reply"))?
            .model()
            .await
            .map_err(platform_err("parsing reply"))?;
        Ok(sent(&message))
    }

    async fn edit_message(&self, target: &MessageRef, content: &str) -> Result<SentMessage, Error> {
        let channel: Id<ChannelMarker> = parse_id(&target.channel_id, "channel")?;
        let message_id: Id<MessageMarker> = parse_id(&target.message_id, "message")?;
        let message = self
            .http
            .update_message(channel, message_id)
            .content(Some(content))
            .await
            .map_err(platform_err("editing message"))?
            .model()
            .await
            .map_err(platform_err("parsing edited message"))?;
        Ok(sent(&message))
    }

    async fn react(&self, origin: &MessageRef, emoji: &str) -> Result<(), Error> {
        let channel: Id<ChannelMarker> = parse_id(&origin.channel_id, "channel")?;
        let message_id: Id<MessageMarker> = parse_id(&origin.message_id, "message")?;
        self.http
            .create_reaction(channel, message_id, &RequestReactionType::Unicode { name: emoji })
            .await
            .map_err(platform_err("adding reaction"))?;
        Ok(())
    }

    async fn defer_response(&self, interaction: &InteractionRef, ephemeral: bool) -> Result<(), Error> {
        let mut data = InteractionResponseDataBuilder::new();
        if ephemeral {
            data = data.flags(MessageFlags::EPHEMERAL);
        }
        self.respond(
            interaction,
            InteractionResponse {
                kind: InteractionResponseType::DeferredChannelMessageWithSource,
                data: Some(data.build()),
            },
        )
        .await
    }

    async fn respond_to_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), Error> {
        let mut data = InteractionResponseDataBuilder::new().content(content);
        if ephemeral {
            data = data.flags(MessageFlags::EPHEMERAL);
        }
        self.respond(
            interaction,
            InteractionResponse {
                kind: InteractionResponseType::ChannelMessageWithSource,
                data: Some(data.build()),
            },
        )
        .await
    }

    async fn edit_interaction_response(&self, interaction: &InteractionRef, content: &str) -> Result<SentMessage, Error> {
        let message = self
            .http
            .interaction(self.application_id)
            .update_response(&interaction.token)
            .content(Some(content))
            .await
            .map_err(platform_err("editing interaction response"))?
            .model()
            .await
            .map_err(platform_err("parsing interaction response"))?;
        Ok(sent(&message))
    }

    async fn follow_up_interaction(
        &self,
        interaction: &InteractionRef,
        content: &str,
        ephemeral: bool,
    ) -> Result<SentMessage, Error> {
        let client = self.http.interaction(self.application_id);
        let mut followup = client.create_followup(&interaction.token).content(content);
        if ephemeral {
            followup = followup.flags(MessageFlags::EPHEMERAL);
        }
        let message = followup
            .await
            .map_err(platform_err("sending follow-up"))?
            .model()
            .await
            .map_err(platform_err("parsing follow-up"))?;
        Ok(sent(&message))
    }

    async fn fetch_interaction_response(&self, interaction: &InteractionRef) -> Result<SentMessage, Error> {
        let message = self
            .http
            .interaction(self.application_id)
            .response(&interaction.token)
            .await
            .map_err(platform_err("fetching interaction response"))?
            .model()
            .await
            .map_err(platform_err("parsing interaction response"))?;
        Ok(sent(&message))
    }

    async fn publish_global_commands(&self, commands: &[CommandDeclaration]) -> Result<(), Error> {
        let commands: Vec<TwilightCommand> = commands.iter().map(to_twilight_command).collect();
        self.http
            .interaction(self.application_id)
            .set_global_commands(&commands)
            .await
            .map_err(platform_err("publishing global commands"))?;
        debug!("(DiscordPlatform) Published {} global commands", commands.len());
        Ok(())
    }

    async fn publish_guild_commands(&self, guild_id: &str, commands: &[CommandDeclaration]) -> Result<(), Error> {
        let guild: Id<GuildMarker> = parse_id(guild_id, "guild")?;
        let commands: Vec<TwilightCommand> = commands.iter().map(to_twilight_command).collect();
        self.http
            .interaction(self.application_id)
            .set_guild_commands(guild, &commands)
            .await
            .map_err(platform_err("publishing guild commands"))?;
        debug!("(DiscordPlatform) Published {} commands to guild {}", commands.len(), guild_id);
        Ok(())
    }

    async fn fetch_published_commands(&self, scope: &PublishScope) -> Result<Vec<CommandDeclaration>, Error> {
        let client = self.http.interaction(self.application_id);
        let commands = match scope {
            PublishScope::Global => client
                .global_commands()
                .await
                .map_err(platform_err("fetching global commands"))?
                .models()
                .await
                .map_err(platform_err("parsing global commands"))?,
            PublishScope::Guild(guild_id) => {
                let guild: Id<GuildMarker> = parse_id(guild_id, "guild")?;
                client
                    .guild_commands(guild)
                    .await
                    .map_err(platform_err("fetching guild commands"))?
                    .models()
                    .await
                    .map_err(platform_err("parsing guild commands"))?
            }
        };
        Ok(commands.iter().filter_map(from_twilight_command).collect())
    }
}

pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<Id<T>, Error> {
    raw.parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| Error::Platform(format!("Invalid {} ID: {}", what, raw)))
}

fn platform_err<E: std::fmt::Debug>(action: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::Platform(format!("Error {}: {:?}", action, e))
}

fn sent(message: &Message) -> SentMessage {
    SentMessage {
        channel_id: message.channel_id.to_string(),
        message_id: message.id.to_string(),
        content: message.content.clone(),
    }
}

pub fn to_twilight_command(declaration: &CommandDeclaration) -> TwilightCommand {
    let mut builder = CommandBuilder::new(
        declaration.name.clone(),
        declaration.description.clone(),
        CommandType::ChatInput,
    );
    for option in &declaration.options {
        let name = option.name.clone();
        let description = option.description.clone();
        let option: CommandOption = match option.kind {
            OptionKind::String => StringBuilder::new(name, description).required(option.required).into(),
            OptionKind::Integer => IntegerBuilder::new(name, description).required(option.required).into(),
            OptionKind::Number => NumberBuilder::new(name, description).required(option.required).into(),
            OptionKind::Boolean => BooleanBuilder::new(name, description).required(option.required).into(),
            OptionKind::User => UserBuilder::new(name, description).required(option.required).into(),
            OptionKind::Channel => ChannelBuilder::new(name, description).required(option.required).into(),
            OptionKind::Role => RoleBuilder::new(name, description).required(option.required).into(),
            OptionKind::Mentionable => MentionableBuilder::new(name, description).required(option.required).into(),
        };
        builder = builder.option(option);
    }
    builder.build()
}

/// `None` for declarations using option types this crate does not model,
/// which makes the diff treat the scope as changed.
pub fn from_twilight_command(command: &TwilightCommand) -> Option<CommandDeclaration> {
    let mut options = Vec::with_capacity(command.options.len());
    for option in &command.options {
        let kind = match option.kind {
            CommandOptionType::String => OptionKind::String,
            CommandOptionType::Integer => OptionKind::Integer,
            CommandOptionType::Number => OptionKind::Number,
            CommandOptionType::Boolean => OptionKind::Boolean,
            CommandOptionType::User => OptionKind::User,
            CommandOptionType::Channel => OptionKind::Channel,
            CommandOptionType::Role => OptionKind::Role,
            CommandOptionType::Mentionable => OptionKind::Mentionable,
            _ => return None,
        };
        options.push(OptionDeclaration {
            name: option.name.clone(),
            description: option.description.clone(),
            kind,
            required: option.required.unwrap_or(false),
        });
    }
    Some(CommandDeclaration {
        name: command.name.clone(),
        description: command.description.clone(),
        options,
    })
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use maowcmd_common::models::{Author, IncomingInteraction, IncomingMessage, InboundEvent, OptionValue};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use twilight_gateway::{self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard, StreamExt};
use twilight_http::Client as HttpClient;
use twilight_model::application::interaction::application_command::CommandOptionValue;
use twilight_model::application::interaction::{Interaction, InteractionData, InteractionType};
use twilight_model::channel::Message;
use twilight_model::gateway::payload::incoming::Ready as ReadyPayload;
use twilight_model::util::Timestamp;

use crate::Error;

/// The shard runner:
///   - calls `shard.next_event(...)`
///   - converts messages and slash-command interactions into `InboundEvent`s
///   - sends them to `tx`.
async fn shard_runner(mut shard: Shard, tx: UnboundedSender<InboundEvent>, http: Arc<HttpClient>) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(EventTypeFlags::all()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };

        let inbound = match event {
            Event::Ready(ready) => {
                let data: &ReadyPayload = ready.as_ref();
                info!("Shard {shard_id} => READY as {} (ID={})", data.user.name, data.user.id);
                continue;
            }
            Event::MessageCreate(msg) => {
                let channel_name = channel_name(&http, &msg.0).await;
                let guild_name = guild_name(&http, &msg.0).await;
                InboundEvent::Message(convert_message(&msg.0, channel_name, guild_name))
            }
            Event::InteractionCreate(interaction) => match convert_interaction(&interaction.0) {
                Some(converted) => InboundEvent::Interaction(converted),
                None => {
                    trace!("Shard {shard_id} => skipping non-command interaction");
                    continue;
                }
            },
            other => {
                trace!("Shard {shard_id} => unhandled event: {:?}", other.kind());
                continue;
            }
        };

        if tx.send(inbound).is_err() {
            warn!("Shard {shard_id} => dispatcher receiver dropped");
            break;
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

async fn channel_name(http: &HttpClient, msg: &Message) -> Option<String> {
    msg.guild_id?;
    match http.channel(msg.channel_id).await {
        Ok(resp) => match resp.model().await {
            Ok(channel) => channel.name,
            Err(e) => {
                error!("Error parsing channel => {e:?}");
                None
            }
        },
        Err(e) => {
            error!("Error fetching channel => {e:?}");
            None
        }
    }
}

async fn guild_name(http: &HttpClient, msg: &Message) -> Option<String> {
    let guild_id = msg.guild_id?;
    match http.guild(guild_id).await {
        Ok(resp) => match resp.model().await {
            Ok(guild) => Some(guild.name),
            Err(e) => {
                error!("Error parsing guild => {e:?}");
                None
            }
        },
        Err(e) => {
            error!("Error fetching guild => {e:?}");
            None
        }
    }
}

fn to_datetime(ts: Timestamp) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_micros(ts.as_micros()).unwrap_or_default()
}

pub fn convert_message(msg: &Message, channel_name: Option<String>, guild_name: Option<String>) -> IncomingMessage {
    IncomingMessage {
        id: msg.id.to_string(),
        channel_id: msg.channel_id.to_string(),
        channel_name,
        guild_id: msg.guild_id.map(|g| g.to_string()),
        guild_name,
        author: Author {
            id: msg.author.id.to_string(),
            name: msg.author.name.clone(),
            bot: msg.author.bot,
        },
        content: msg.content.clone(),
        created_at: to_datetime(msg.timestamp),
    }
}

/// `None` for anything but a chat-input command invocation.
pub fn convert_interaction(interaction: &Interaction) -> Option<IncomingInteraction> {
    if interaction.kind != InteractionType::ApplicationCommand {
        return None;
    }
    let Some(InteractionData::ApplicationCommand(data)) = &interaction.data else {
        return None;
    };
    let user = interaction.author()?;
    let channel_id = interaction.channel.as_ref().map(|c| c.id.to_string())?;

    let options = data
        .options
        .iter()
        .filter_map(|opt| {
            let value = match &opt.value {
                CommandOptionValue::String(s) => OptionValue::String(s.clone()),
                CommandOptionValue::Integer(i) => OptionValue::Integer(*i),
                CommandOptionValue::Number(n) => OptionValue::Number(*n),
                CommandOptionValue::Boolean(b) => OptionValue::Boolean(*b),
                CommandOptionValue::User(id) => OptionValue::User(id.to_string()),
                CommandOptionValue::Channel(id) => OptionValue::Channel(id.to_string()),
                CommandOptionValue::Role(id) => OptionValue::Role(id.to_string()),
                CommandOptionValue::Mentionable(id) => OptionValue::Mentionable(id.to_string()),
                other => {
                    debug!("Skipping unsupported option value {:?}", other);
                    return None;
                }
            };
            Some((opt.name.clone(), value))
        })
        .collect();

    Some(IncomingInteraction {
        id: interaction.id.to_string(),
        token: interaction.token.clone(),
        channel_id,
        guild_id: interaction.guild_id.map(|g| g.to_string()),
        author: Author {
            id: user.id.to_string(),
            name: user.name.clone(),
            bot: user.bot,
        },
        command_name: data.name.clone(),
        options,
        created_at: Utc::now(),
    })
}

/// Running gateway shards feeding one event channel.
pub struct DiscordGateway {
    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,
}

impl DiscordGateway {
    /// Connects the recommended number of shards and returns the event stream.
    pub async fn connect(token: &str, http: Arc<HttpClient>) -> Result<(Self, UnboundedReceiver<InboundEvent>), Error> {
        let (tx, rx) = unbounded_channel::<InboundEvent>();

        let config = Config::new(
            token.to_string(),
            Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::DIRECT_MESSAGES | Intents::MESSAGE_CONTENT,
        );
        let shards = gateway::create_recommended(&http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        let mut gateway = Self {
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
        };
        for shard in shards {
            gateway.shard_senders.push(shard.sender());
            let tx_for_shard = tx.clone();
            let http_for_shard = http.clone();
            gateway
                .shard_tasks
                .push(tokio::spawn(shard_runner(shard, tx_for_shard, http_for_shard)));
        }
        info!("(DiscordGateway) {} shard(s) started", gateway.shard_tasks.len());
        Ok((gateway, rx))
    }

    /// Closes every shard and waits for the runners to finish.
    pub async fn shutdown(mut self) {
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in self.shard_tasks.drain(..) {
            let _ = task.await;
        }
    }
}

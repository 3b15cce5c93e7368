// File: maowcmd-core/src/services/dispatcher.rs

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use maowcmd_common::models::{IncomingInteraction, IncomingMessage, InboundEvent, MessageRef, PublishScope};
use maowcmd_common::traits::platform_traits::ChatPlatform;
use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::Error;
use crate::config::{AccessPolicy, HandlerConfig};
use crate::services::command::{Command, CommandContext, CommandOutcome};
use crate::services::command_logger::CommandLogger;
use crate::services::command_registry::{CommandEntry, CommandRegistry};
use crate::services::cooldown_store::CooldownStore;
use crate::services::help_command::build_help_command;
use crate::services::publisher::{self, PublishPlan};
use crate::services::trigger::{InteractionTrigger, TextTrigger, Trigger, parse_invocation};
use crate::services::validator::{DenyReason, Verdict, needs_cooldown_record, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Loading,
    Listening,
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command, an unknown command, or a kind the command refuses.
    Ignored,
    /// The pause command ran; carries the new paused state.
    PauseToggled(bool),
    Denied(DenyReason),
    Executed { success: bool },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub commands: usize,
    pub global_declarations: usize,
    pub test_guild_declarations: usize,
    /// Scopes that actually received a publish call.
    pub published_scopes: usize,
}

/// Owns the registry, the cooldown store and the command log, and routes
/// every inbound event through validate, execute and post-process.
pub struct Dispatcher {
    config: HandlerConfig,
    policy: Arc<AccessPolicy>,
    platform: Arc<dyn ChatPlatform>,
    store: Arc<CooldownStore>,
    registry: RwLock<Arc<CommandRegistry>>,
    logger: Option<Arc<CommandLogger>>,
    self_user_id: Option<String>,
    listening: AtomicBool,
    paused: AtomicBool,
}

impl Dispatcher {
    pub fn new(config: HandlerConfig, platform: Arc<dyn ChatPlatform>, store: Arc<CooldownStore>) -> Self {
        let logger = config
            .logging
            .as_ref()
            .map(|settings| Arc::new(CommandLogger::new(platform.clone(), settings)));
        Self {
            policy: Arc::new(config.access_policy()),
            config,
            platform,
            store,
            registry: RwLock::new(Arc::new(CommandRegistry::new())),
            logger,
            self_user_id: None,
            listening: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }

    /// The bot's own user id. Messages it authored are never dispatched.
    pub fn with_self_user_id(mut self, id: impl Into<String>) -> Self {
        self.self_user_id = Some(id.into());
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn policy(&self) -> Arc<AccessPolicy> {
        self.policy.clone()
    }

    pub fn store(&self) -> Arc<CooldownStore> {
        self.store.clone()
    }

    pub fn logger(&self) -> Option<Arc<CommandLogger>> {
        self.logger.clone()
    }

    /// Snapshot of the current command set.
    pub fn registry(&self) -> Arc<CommandRegistry> {
        self.registry.read().clone()
    }

    pub fn state(&self) -> DispatcherState {
        if self.listening.load(Ordering::SeqCst) {
            DispatcherState::Listening
        } else {
            DispatcherState::Loading
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Registers `entries` (plus the help command when configured) into a
    /// fresh registry, swaps it in, then publishes slash declarations.
    ///
    /// Any configuration error aborts the load and leaves the previous
    /// registry in place. Publish failures are logged only.
    pub async fn load(&self, entries: Vec<CommandEntry>) -> Result<LoadSummary, Error> {
        let mut registry = CommandRegistry::new();
        for entry in entries {
            if let Some(source) = &entry.source {
                debug!("Loading command from {}", source);
            }
            registry.register(entry.command, &self.policy)?;
        }
        if let Some(help) = &self.config.help {
            registry.register(build_help_command(help)?, &self.policy)?;
        }

        let plan = publisher::plan(&registry, self.config.test_mode)?;
        let commands = registry.len();
        *self.registry.write() = Arc::new(registry);
        info!("Finished loading {} commands.", commands);

        let published_scopes = self.publish(&plan).await;
        Ok(LoadSummary {
            commands,
            global_declarations: plan.global.len(),
            test_guild_declarations: plan.test_guilds.len(),
            published_scopes,
        })
    }

    async fn publish(&self, plan: &PublishPlan) -> usize {
        let mut published = 0;
        let mut targets = vec![(PublishScope::Global, &plan.global)];
        if !plan.test_guilds.is_empty() && self.config.test_guilds.is_empty() {
            warn!(
                "{} declarations target test guilds, but none are configured",
                plan.test_guilds.len()
            );
        }
        for guild in &self.config.test_guilds {
            targets.push((PublishScope::Guild(guild.clone()), &plan.test_guilds));
        }

        for (scope, declarations) in targets {
            match publisher::sync_scope(self.platform.as_ref(), &scope, declarations).await {
                Ok(true) => published += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to publish declarations to {:?}: {:?}", scope, e),
            }
        }
        published
    }

    /// Starts consuming inbound events, one task per event. Only the first
    /// call subscribes; later calls return `None`.
    pub fn listen(self: &Arc<Self>, mut events: UnboundedReceiver<InboundEvent>) -> Option<JoinHandle<()>> {
        if self.listening.swap(true, Ordering::SeqCst) {
            debug!("Dispatcher already listening; ignoring second subscription");
            return None;
        }
        info!("Dispatcher listening for events");

        let dispatcher = Arc::clone(self);
        Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let id = event.id().to_string();
                    if let Err(e) = dispatcher.handle_event(event).await {
                        error!("Failed to dispatch event {}: {:?}", id, e);
                    }
                });
            }
            warn!("Inbound event stream closed");
        }))
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Result<DispatchOutcome, Error> {
        match event {
            InboundEvent::Message(message) => self.handle_message(message).await,
            InboundEvent::Interaction(interaction) => self.handle_interaction(interaction).await,
        }
    }

    async fn handle_message(&self, message: IncomingMessage) -> Result<DispatchOutcome, Error> {
        if self.self_user_id.as_deref() == Some(message.author.id.as_str()) {
            return Ok(DispatchOutcome::Ignored);
        }
        if self.config.ignore_bots && message.author.bot {
            return Ok(DispatchOutcome::Ignored);
        }

        if let Some(pause) = &self.config.pause_command {
            if message.content.trim() == format!("{}{}", self.config.prefix, pause) {
                if !self.policy.admins.contains(&message.author.id) {
                    debug!("{} tried to toggle pause without admin rights", message.author.name);
                    return Ok(DispatchOutcome::Ignored);
                }
                let paused = !self.paused.fetch_xor(true, Ordering::SeqCst);
                info!("Dispatcher {} by {}", if paused { "paused" } else { "resumed" }, message.author.name);
                return Ok(DispatchOutcome::PauseToggled(paused));
            }
        }
        if self.is_paused() {
            return Ok(DispatchOutcome::Ignored);
        }

        self.apply_reaction_triggers(&message).await;

        let Some(invocation) = parse_invocation(&message.content, &self.config.prefix) else {
            return Ok(DispatchOutcome::Ignored);
        };
        let Some(command) = self.registry().lookup(&invocation.name) else {
            return Ok(DispatchOutcome::Ignored);
        };
        if command.is_classic_disallowed() {
            return Ok(DispatchOutcome::Ignored);
        }

        let trigger = Trigger::Text(TextTrigger::new(message, invocation, &command, self.platform.clone()));
        self.run(command, trigger).await
    }

    async fn handle_interaction(&self, interaction: IncomingInteraction) -> Result<DispatchOutcome, Error> {
        let Some(command) = self.registry().lookup(&interaction.command_name) else {
            return Ok(DispatchOutcome::Ignored);
        };
        if command.is_interaction_disallowed() {
            return Ok(DispatchOutcome::Ignored);
        }

        let trigger = Trigger::Interaction(InteractionTrigger::new(interaction, &command, self.platform.clone()));
        self.run(command, trigger).await
    }

    async fn apply_reaction_triggers(&self, message: &IncomingMessage) {
        if self.config.triggers.is_empty() {
            return;
        }
        let content = message.content.to_lowercase();
        let origin = MessageRef {
            channel_id: message.channel_id.clone(),
            message_id: message.id.clone(),
        };
        for trigger in &self.config.triggers {
            if content.contains(&trigger.keyword.to_lowercase()) {
                if let Err(e) = self.platform.react(&origin, &trigger.emoji).await {
                    warn!("Failed to react with {} to message {}: {:?}", trigger.emoji, message.id, e);
                }
            }
        }
    }

    async fn run(&self, command: Arc<Command>, trigger: Trigger) -> Result<DispatchOutcome, Error> {
        let record = match trigger.guild_id() {
            Some(guild) if needs_cooldown_record(&command, &trigger) => Some(self.store.fetch(guild).await),
            _ => None,
        };
        let now = self.store.clock().now_millis();

        if let Verdict::Deny(reason) = validate(&command, &trigger, &self.policy, record.as_ref(), now) {
            match reason.render(&self.policy.messages, &self.config.prefix, command.id()) {
                Some(text) => {
                    if let Err(e) = trigger.notify(&text).await {
                        warn!("Failed to deliver denial for {}: {:?}", command.id(), e);
                    }
                }
                None => info!(
                    "{} tried to use test command: {}",
                    trigger.author().name,
                    command.id()
                ),
            }
            debug!("Denied {} for {}: {}", command.id(), trigger.author().id, reason);
            return Ok(DispatchOutcome::Denied(reason));
        }

        if let Trigger::Interaction(interaction) = &trigger {
            if command.is_deferred() {
                if let Err(e) = interaction.defer().await {
                    warn!("Failed to defer {}: {:?}", command.id(), e);
                }
            }
        }

        let trigger = Arc::new(trigger);
        let ctx = CommandContext {
            platform: self.platform.clone(),
            trigger: trigger.clone(),
            args: trigger.args().to_vec(),
            argv: trigger.argv().clone(),
            prefix: self.config.prefix.clone(),
            text: trigger.text(),
            logger: self.logger.clone(),
            commands: self.registry(),
            policy: self.policy.clone(),
        };

        let handler = command.handler();
        let span = info_span!("command", command = command.id(), invocation = %Uuid::new_v4());
        let success = match AssertUnwindSafe(handler.run(ctx)).catch_unwind().instrument(span).await {
            Ok(Ok(CommandOutcome::Success)) => true,
            Ok(Ok(CommandOutcome::Failure)) => {
                debug!("Command {} reported failure", command.id());
                false
            }
            Ok(Err(e)) => {
                error!("Command {} failed: {:?}", command.id(), e);
                if let Some(logger) = &self.logger {
                    logger.log_failure(&trigger, command.id(), &format!("{e:#}")).await;
                }
                false
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panicked".to_string());
                error!("Command {} panicked: {}", command.id(), detail);
                if let Some(logger) = &self.logger {
                    logger.log_failure(&trigger, command.id(), &detail).await;
                }
                false
            }
        };
        if !success {
            return Ok(DispatchOutcome::Executed { success: false });
        }

        if let (Trigger::Text(text), Some(emoji)) = (trigger.as_ref(), command.react()) {
            if let Err(e) = text.react(emoji).await {
                warn!("Failed to apply success reaction for {}: {:?}", command.id(), e);
            }
        }
        if let Some(logger) = &self.logger {
            logger.log(&trigger).await;
        }
        if let Some(guild) = trigger.guild_id() {
            if command.has_cooldown() {
                self.store
                    .activate(
                        guild,
                        &trigger.author().id,
                        command.id(),
                        command.cooldown(),
                        command.global_cooldown(),
                    )
                    .await;
            }
        }

        Ok(DispatchOutcome::Executed { success: true })
    }
}

// File: src/services/mod.rs

pub mod command;
pub mod command_logger;
pub mod command_registry;
pub mod cooldown_store;
pub mod dispatcher;
pub mod help_command;
pub mod publisher;
pub mod trigger;
pub mod validator;

pub use command::{ArgumentStyle, Command, CommandBuilder, CommandContext, CommandHandler, CommandOutcome};
pub use command_logger::CommandLogger;
pub use command_registry::{CommandEntry, CommandRegistry};
pub use cooldown_store::{CooldownKey, CooldownStore};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherState, LoadSummary};
pub use trigger::{Trigger, TriggerKind};
pub use validator::{DenyReason, Verdict, validate};

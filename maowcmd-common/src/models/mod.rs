// File: maowcmd-common/src/models/mod.rs
pub mod cooldown;
pub mod options;
pub mod platform;

pub use cooldown::{GuildCooldown, GuildCooldownRecord, UserCooldown};
pub use options::{CommandDeclaration, OptionDeclaration, OptionKind, OptionValue};
pub use platform::{
    Author, InboundEvent, IncomingInteraction, IncomingMessage, InteractionRef, MessageRef,
    PublishScope, SentMessage,
};

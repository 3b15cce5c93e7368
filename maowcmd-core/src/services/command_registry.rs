// File: maowcmd-core/src/services/command_registry.rs

use std::path::{Component, Path};
use std::sync::Arc;

use tracing::debug;

use crate::Error;
use crate::config::AccessPolicy;
use crate::services::command::Command;

pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// A command as handed over by a loader, with the location it came from.
pub struct CommandEntry {
    /// Relative source location, e.g. `fun/ping`. Informational only.
    pub source: Option<String>,
    pub command: Command,
}

impl CommandEntry {
    pub fn new(command: Command) -> Self {
        Self { source: None, command }
    }

    /// Entry loaded from `path`. A command without a category takes the first
    /// path segment when the path has more than one segment.
    pub fn from_path(path: impl AsRef<Path>, mut command: Command) -> Self {
        let path = path.as_ref();
        let segments: Vec<String> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if command.category.is_none() && segments.len() > 1 {
            command.category = Some(segments[0].clone());
        }
        Self {
            source: Some(segments.join("/")),
            command,
        }
    }
}

impl From<Command> for CommandEntry {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

/// Commands in registration order, looked up by any of their names.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command, rejecting name collisions and flags the policy cannot satisfy.
    pub fn register(&mut self, mut command: Command, policy: &AccessPolicy) -> Result<Arc<Command>, Error> {
        if let Some(name) = command.names().iter().find(|n| self.lookup(n).is_some()) {
            return Err(Error::DuplicateName(name.clone()));
        }
        if command.is_admin_only() && policy.admins.is_empty() {
            return Err(Error::Config(format!(
                "command {} is admin-only but no admins are configured",
                command.id()
            )));
        }
        if command.is_test_only() && policy.test_guilds.is_empty() {
            return Err(Error::Config(format!(
                "command {} is test-only but no test guilds are configured",
                command.id()
            )));
        }
        if command.category.is_none() {
            command.category = Some(DEFAULT_CATEGORY.to_string());
        }

        debug!("Registered command '{}' (aliases: {:?})", command.id(), &command.names()[1..]);
        let command = Arc::new(command);
        self.commands.push(command.clone());
        Ok(command)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Command>> {
        let name = name.to_lowercase();
        self.commands.iter().find(|c| c.matches(&name)).cloned()
    }

    /// First candidate that resolves wins.
    pub fn lookup_any<S: AsRef<str>>(&self, names: &[S]) -> Option<Arc<Command>> {
        names.iter().find_map(|n| self.lookup(n.as_ref()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

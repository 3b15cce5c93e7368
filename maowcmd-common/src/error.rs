// ================================================================
// File: maowcmd-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    /// Load-time misconfiguration (admin-only without admins, missing description, ...).
    #[error("Config error: {0}")]
    Config(String),

    #[error("Command name '{0}' is being used twice")]
    DuplicateName(String),

    #[error("Duration parse error: '{0}' is not a valid duration")]
    DurationParse(String),

    /// Attached to a trigger when an argument does not fit its declared option.
    #[error("Argument type error: {0}")]
    ArgumentType(String),

    #[error("You haven't responded to this message yet")]
    NotResponded,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// True for every error that aborts loading the command set.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::DuplicateName(_) | Error::DurationParse(_) | Error::Toml(_)
        )
    }

    /// True for persistence failures, which are logged rather than propagated to users.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_) | Error::Database(_) | Error::Migration(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

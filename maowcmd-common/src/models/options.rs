use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a command option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptionKind::String => "string",
            OptionKind::Integer => "integer",
            OptionKind::Number => "number",
            OptionKind::Boolean => "boolean",
            OptionKind::User => "user",
            OptionKind::Channel => "channel",
            OptionKind::Role => "role",
            OptionKind::Mentionable => "mentionable",
        };
        write!(f, "{}", s)
    }
}

/// A resolved option value. Mentions carry the referenced id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(String),
    Channel(String),
    Role(String),
    Mentionable(String),
}

impl OptionValue {
    pub fn kind(&self) -> OptionKind {
        match self {
            OptionValue::String(_) => OptionKind::String,
            OptionValue::Integer(_) => OptionKind::Integer,
            OptionValue::Number(_) => OptionKind::Number,
            OptionValue::Boolean(_) => OptionKind::Boolean,
            OptionValue::User(_) => OptionKind::User,
            OptionValue::Channel(_) => OptionKind::Channel,
            OptionValue::Role(_) => OptionKind::Role,
            OptionValue::Mentionable(_) => OptionKind::Mentionable,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::String(s) => write!(f, "{}", s),
            OptionValue::Integer(i) => write!(f, "{}", i),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::Boolean(b) => write!(f, "{}", b),
            OptionValue::User(id)
            | OptionValue::Channel(id)
            | OptionValue::Role(id)
            | OptionValue::Mentionable(id) => write!(f, "{}", id),
        }
    }
}

/// One option in a command's schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionDeclaration {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
}

impl OptionDeclaration {
    pub fn new(name: &str, description: &str, kind: OptionKind) -> Self {
        Self {
            name: name.to_lowercase(),
            description: description.to_string(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// The publishable shape of a slash command: what gets compared before publishing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandDeclaration {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub options: Vec<OptionDeclaration>,
}

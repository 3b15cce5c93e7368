// File: maowcmd-core/src/services/trigger/arguments.rs

use std::collections::HashMap;
use std::sync::LazyLock;

use maowcmd_common::models::{OptionDeclaration, OptionKind, OptionValue};
use regex::Regex;

use crate::Error;

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@!?(\d{17,20})>$").expect("valid user mention regex"));
static ROLE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@&(\d{17,20})>$").expect("valid role mention regex"));
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<#(\d{17,20})>$").expect("valid channel mention regex"));
static RAW_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{17,20}$").expect("valid id regex"));

/// Option name the flag parser files unflagged arguments under.
pub const POSITIONAL_KEY: &str = "_";

/// Arguments bound to declared options, in declaration (or platform) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentMap {
    values: Vec<(String, OptionValue)>,
}

impl ArgumentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(values: Vec<(String, OptionValue)>) -> Self {
        Self { values }
    }

    pub fn insert(&mut self, name: &str, value: OptionValue) {
        self.values.retain(|(n, _)| n != name);
        self.values.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            OptionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            OptionValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Id behind a user, channel, role or mentionable option.
    pub fn get_id(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            OptionValue::User(id)
            | OptionValue::Channel(id)
            | OptionValue::Role(id)
            | OptionValue::Mentionable(id) => Some(id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Result of binding raw arguments. A type mismatch never aborts binding:
/// the offending option is skipped and the first error is kept.
#[derive(Debug, Default)]
pub struct Binding {
    pub argv: ArgumentMap,
    pub error: Option<Error>,
}

impl Binding {
    fn bind(&mut self, option: &OptionDeclaration, raw: Option<&str>) {
        let result = match raw {
            Some(raw) => coerce(raw, option.kind).map(Some),
            None if option.required => Err(Error::ArgumentType(format!(
                "missing required argument '{}'",
                option.name
            ))),
            None => Ok(None),
        };
        match result {
            Ok(Some(value)) => self.argv.insert(&option.name, value),
            Ok(None) => {}
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e);
                }
            }
        }
    }
}

/// Binds the i-th argument to the i-th declared option.
pub fn bind_positional(args: &[String], options: &[OptionDeclaration]) -> Binding {
    let mut binding = Binding::default();
    for (i, option) in options.iter().enumerate() {
        binding.bind(option, args.get(i).map(String::as_str));
    }
    binding
}

/// Binds `--flag value` style arguments. See [`parse_flags`].
pub fn bind_flags(
    args: &[String],
    options: &[OptionDeclaration],
    aliases: &HashMap<String, Vec<String>>,
) -> Binding {
    let parsed = parse_flags(args, aliases);
    let mut binding = Binding::default();
    for option in options {
        binding.bind(option, parsed.named.get(&option.name).map(String::as_str));
    }
    binding
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    pub named: HashMap<String, String>,
    pub positional: Vec<String>,
}

/// Parses long/short flags with alias expansion.
///
/// * `--name value`, `--name=value`, `-n value`
/// * a flag with no value is `"true"`; `--no-name` is `"false"`
/// * `-abc` sets `a`, `b` and `c`
/// * everything after `--`, and any token that is not a flag, is positional
///
/// The option whose aliases contain `"_"` receives the positional remainder
/// joined by single spaces.
pub fn parse_flags(args: &[String], aliases: &HashMap<String, Vec<String>>) -> ParsedFlags {
    let canonical = |name: &str| -> String {
        let name = name.to_lowercase();
        aliases
            .iter()
            .find(|(key, list)| list.iter().any(|a| a.to_lowercase() == name) && **key != name)
            .map(|(key, _)| key.clone())
            .unwrap_or(name)
    };

    let mut parsed = ParsedFlags::default();
    let mut i = 0;
    while i < args.len() {
        let token = &args[i];

        if token == "--" {
            parsed.positional.extend(args[i + 1..].iter().cloned());
            break;
        }

        if let Some(body) = token.strip_prefix("--").filter(|b| !b.is_empty()) {
            if let Some((name, value)) = body.split_once('=') {
                parsed.named.insert(canonical(name), value.to_string());
            } else if let Some(negated) = body.strip_prefix("no-") {
                parsed.named.insert(canonical(negated), "false".to_string());
            } else if let Some(value) = args.get(i + 1).filter(|next| !is_flag(next)) {
                parsed.named.insert(canonical(body), value.clone());
                i += 1;
            } else {
                parsed.named.insert(canonical(body), "true".to_string());
            }
        } else if is_flag(token) {
            let body = &token[1..];
            if let Some((name, value)) = body.split_once('=') {
                parsed.named.insert(canonical(name), value.to_string());
            } else if body.chars().count() == 1 {
                match args.get(i + 1).filter(|next| !is_flag(next)) {
                    Some(value) => {
                        parsed.named.insert(canonical(body), value.clone());
                        i += 1;
                    }
                    None => {
                        parsed.named.insert(canonical(body), "true".to_string());
                    }
                }
            } else {
                for c in body.chars() {
                    parsed.named.insert(canonical(&c.to_string()), "true".to_string());
                }
            }
        } else {
            parsed.positional.push(token.clone());
        }
        i += 1;
    }

    let catch_all = aliases
        .iter()
        .find(|(_, list)| list.iter().any(|a| a == POSITIONAL_KEY))
        .map(|(key, _)| key.clone());
    if let Some(key) = catch_all {
        if !parsed.positional.is_empty() {
            parsed.named.insert(key, parsed.positional.join(" "));
        }
    }

    parsed
}

/// A token is a flag if it starts with `-`, is longer than that, and is not a number.
fn is_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

/// Converts a raw argument into the declared option type.
pub fn coerce(raw: &str, kind: OptionKind) -> Result<OptionValue, Error> {
    let mismatch = || Error::ArgumentType(format!("'{}' is not a valid {}", raw, kind));
    match kind {
        OptionKind::String => Ok(OptionValue::String(raw.to_string())),
        OptionKind::Integer => raw.parse::<i64>().map(OptionValue::Integer).map_err(|_| mismatch()),
        OptionKind::Number => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(OptionValue::Number(n)),
            _ => Err(mismatch()),
        },
        OptionKind::Boolean => match raw.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(OptionValue::Boolean(true)),
            "false" | "no" | "off" | "0" => Ok(OptionValue::Boolean(false)),
            _ => Err(mismatch()),
        },
        OptionKind::User => mention_id(raw, &USER_MENTION).map(OptionValue::User).ok_or_else(mismatch),
        OptionKind::Channel => mention_id(raw, &CHANNEL_MENTION).map(OptionValue::Channel).ok_or_else(mismatch),
        OptionKind::Role => mention_id(raw, &ROLE_MENTION).map(OptionValue::Role).ok_or_else(mismatch),
        OptionKind::Mentionable => mention_id(raw, &USER_MENTION)
            .or_else(|| mention_id(raw, &ROLE_MENTION))
            .map(OptionValue::Mentionable)
            .ok_or_else(mismatch),
    }
}

fn mention_id(raw: &str, pattern: &Regex) -> Option<String> {
    if let Some(caps) = pattern.captures(raw) {
        return Some(caps[1].to_string());
    }
    RAW_ID.is_match(raw).then(|| raw.to_string())
}

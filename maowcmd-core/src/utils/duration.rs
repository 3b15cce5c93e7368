use std::sync::LazyLock;

use regex::Regex;

use crate::Error;

const SECOND: u64 = 1_000;
const MINUTE: u64 = SECOND * 60;
const HOUR: u64 = MINUTE * 60;
const DAY: u64 = HOUR * 24;
const MAX_MS: u64 = i64::MAX as u64;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(ms|s|m|h|d)?$").expect("duration grammar is a valid regex")
});

/// Parses `\d+(ms|s|m|h|d)` into milliseconds. A bare integer is milliseconds.
///
/// Zero, anything outside the grammar and anything past `i64::MAX`
/// milliseconds are rejected, so a parsed cooldown always fits a timestamp.
pub fn parse_duration(input: &str) -> Result<u64, Error> {
    let trimmed = input.trim();
    let caps = DURATION_RE
        .captures(trimmed)
        .ok_or_else(|| Error::DurationParse(input.to_string()))?;

    let amount: u64 = caps[1]
        .parse()
        .map_err(|_| Error::DurationParse(input.to_string()))?;
    let unit = match caps.get(2).map(|m| m.as_str().to_lowercase()) {
        None => 1,
        Some(u) => match u.as_str() {
            "ms" => 1,
            "s" => SECOND,
            "m" => MINUTE,
            "h" => HOUR,
            "d" => DAY,
            _ => return Err(Error::DurationParse(input.to_string())),
        },
    };

    match amount.checked_mul(unit) {
        Some(ms) if ms > 0 && ms <= MAX_MS => Ok(ms),
        _ => Err(Error::DurationParse(input.to_string())),
    }
}

/// Renders a remaining time the long way round, e.g. `5 seconds`, `1 minute`, `2 days`.
///
/// Rounds to the largest whole unit; a unit is pluralised once the value
/// reaches 1.5 of it.
pub fn format_duration_long(ms: i64) -> String {
    let abs = ms.unsigned_abs();
    for (unit, name) in [(DAY, "day"), (HOUR, "hour"), (MINUTE, "minute"), (SECOND, "second")] {
        if abs >= unit {
            let count = (ms as f64 / unit as f64).round() as i64;
            let plural = abs as f64 >= unit as f64 * 1.5;
            return format!("{} {}{}", count, name, if plural { "s" } else { "" });
        }
    }
    format!("{} ms", ms)
}

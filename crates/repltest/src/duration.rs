// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durations written as `<count><unit>`, e.g. `250ms`, `1.5s`, `2m`.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

static DURATION_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?P<count>.*?)(?P<unit>[a-zA-Z]*)$").ok());

/// A duration string with a bad count, a bad unit, or both.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{input:?} is not a valid duration: {}", reasons(.bad_count.as_deref(), .bad_unit.as_deref()))]
pub struct DurationError {
    pub input: String,
    pub bad_count: Option<String>,
    pub bad_unit: Option<String>,
}

fn reasons(bad_count: Option<&str>, bad_unit: Option<&str>) -> String {
    let mut reasons = Vec::new();
    if let Some(count) = bad_count {
        reasons.push(format!("bad count: {count:?}"));
    }
    if let Some(unit) = bad_unit {
        reasons.push(format!("bad unit: {unit:?}"));
    }
    reasons.join(", ")
}

/// Nanoseconds per unit suffix.
fn unit_nanos(unit: &str) -> Option<f64> {
    Some(match unit {
        "us" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3_600e9,
        "d" => 86_400e9,
        "w" => 604_800e9,
        _ => return None,
    })
}

/// Parse `<count><unit>`. The count is a non-negative decimal number.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let (count_str, unit_str) = DURATION_REGEX
        .as_ref()
        .and_then(|re| re.captures(input))
        .map(|caps| {
            let group = |name| caps.name(name).map_or("", |m| m.as_str());
            (group("count"), group("unit"))
        })
        .unwrap_or((input, ""));

    let count = count_str
        .parse::<f64>()
        .ok()
        .filter(|count| count.is_finite() && *count >= 0.0);
    let unit = unit_nanos(unit_str);

    let duration = match (count, unit) {
        (Some(count), Some(unit)) => Some(count * unit)
            .filter(|nanos| *nanos < u64::MAX as f64)
            .map(|nanos| Duration::from_nanos(nanos.round() as u64)),
        _ => None,
    };

    duration.ok_or_else(|| DurationError {
        input: input.to_string(),
        bad_count: (count.is_none() || (unit.is_some() && duration.is_none()))
            .then(|| count_str.to_string()),
        bad_unit: unit.is_none().then(|| unit_str.to_string()),
    })
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;

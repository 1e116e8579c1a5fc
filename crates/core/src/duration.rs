// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable duration parsing shared by config and the CLI.

use std::time::Duration;

/// Unit suffixes and their size in milliseconds. `ms` must come before
/// `m` and `s`, since suffix matching takes the first hit.
const UNITS: &[(&str, u64)] = &[
    ("ms", 1),
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
];

/// Parse strings like `"100ms"`, `"45s"`, `"5m"`, `"2h"`, `"1d"`.
/// A bare number is taken as whole seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }

    for (unit, millis_per) in UNITS {
        let Some(number) = text.strip_suffix(unit) else {
            continue;
        };
        let number = number.trim_end();
        if number.is_empty() {
            return Err(format!("duration {:?} has no number before {:?}", input, unit));
        }
        let value: u64 = number
            .parse()
            .map_err(|_| format!("cannot parse duration {:?}", input))?;
        let millis = value
            .checked_mul(*millis_per)
            .ok_or_else(|| format!("duration {:?} is out of range", input))?;
        return Ok(Duration::from_millis(millis));
    }

    let seconds: u64 = text
        .parse()
        .map_err(|_| format!("cannot parse duration {:?}", input))?;
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;

use std::sync::OnceLock;

use regex::Regex;

use crate::{errors::Error, Result};

/// Reply sent when a message is not a recognised command.
pub const WRONG_INPUT_REPLY: &str = "Wrong input";

static WATER_RE: OnceLock<Regex> = OnceLock::new();

fn water_re() -> &'static Regex {
    // `[0-9]` rather than `\d`: the latter matches any Unicode digit.
    WATER_RE.get_or_init(|| {
        Regex::new(r"^water the plants for ([0-9]+) seconds$").expect("valid regex")
    })
}

/// Parse a `water the plants for <N> seconds` command.
///
/// The whole text must match, case-sensitively, with no surrounding
/// whitespace. Returns `Ok(None)` when it does not match and
/// `Err(Error::InvalidDuration)` when it matches but `N` does not fit a `u64`.
pub fn parse_water_command(text: &str) -> Result<Option<u64>> {
    let Some(caps) = water_re().captures(text) else {
        return Ok(None);
    };
    let digits = &caps[1];
    digits
        .parse::<u64>()
        .map(Some)
        .map_err(|source| Error::InvalidDuration {
            digits: digits.to_string(),
            source,
        })
}

/// Confirmation sent after a completed watering cycle.
pub fn watered_reply(seconds: u64) -> String {
    format!("Watered the plants for {seconds} seconds.\n")
}

use serde::Deserialize;

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Parses `<integer><unit>` with unit one of `s`, `m`, `h`, `d` (any case)
/// into milliseconds.
///
/// Anything else yields `0`: an unparsable lifetime means an already expired
/// token, never an unbounded one.
pub fn parse_duration_to_ms(value: &str) -> u64 {
    let value = value.trim();
    let Some(unit) = value.chars().last() else {
        return 0;
    };
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    let multiplier = match unit.to_ascii_lowercase() {
        's' => MS_PER_SECOND,
        'm' => MS_PER_MINUTE,
        'h' => MS_PER_HOUR,
        'd' => MS_PER_DAY,
        _ => return 0,
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|amount| amount.checked_mul(multiplier))
        .unwrap_or(0)
}

/// A token lifetime as written in settings: either a duration string such as
/// `"15m"` or a bare number of milliseconds. Environment overrides can hand
/// the number over as text, so all-digit text also counts as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TtlSetting {
    Millis(u64),
    Text(String),
}

impl TtlSetting {
    pub fn to_ms(&self) -> u64 {
        match self {
            TtlSetting::Millis(ms) => *ms,
            TtlSetting::Text(text) => {
                let text = text.trim();
                if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                    text.parse().unwrap_or(0)
                } else {
                    parse_duration_to_ms(text)
                }
            }
        }
    }
}

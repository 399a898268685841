//! Text protocol for the interactive counter message.
//!
//! A counter lives in a section block whose text is exactly `Counter: <n>`.
//! The message itself is the only store of the value: every click re-parses the
//! rendered text, adds the increment and renders it back.

use thiserror::Error;

pub const COUNTER_LABEL: &str = "Counter: ";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("text is not a counter display: `{0}`")]
pub struct NotACounter(pub String);

pub fn parse(display: &str) -> Result<u64, NotACounter> {
    let trimmed = display.trim();
    let digits = trimmed
        .strip_prefix(COUNTER_LABEL)
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()))
        .ok_or_else(|| NotACounter(display.to_owned()))?;

    digits.parse::<u64>().map_err(|_| NotACounter(display.to_owned()))
}

/// Unbounded addition; saturates only where `u64` itself runs out.
pub fn apply_increment(current: u64, increment: u64) -> u64 {
    current.saturating_add(increment)
}

pub fn render(value: u64) -> String {
    format!("{COUNTER_LABEL}{value}")
}

/// Parses, increments and re-renders in one step.
pub fn advance(display: &str, increment: u64) -> Result<String, NotACounter> {
    parse(display).map(|value| render(apply_increment(value, increment)))
}

#[cfg(test)]
mod tests {
    use super::{advance, apply_increment, parse, render, NotACounter};

    #[test]
    fn render_then_parse_is_identity() {
        for value in [0_u64, 1, 9, 10, 42, 1_000_000, u64::MAX] {
            assert_eq!(parse(&render(value)), Ok(value));
        }
    }

    #[test]
    fn increments_survive_a_render_round_trip() {
        for value in [0_u64, 3, 77, 12_345] {
            for increment in [1_u64, 5, 10] {
                let rendered = render(apply_increment(value, increment));
                assert_eq!(parse(&rendered), Ok(value + increment));
            }
        }
    }

    #[test]
    fn advance_rewrites_the_display() {
        assert_eq!(advance("Counter: 3", 5).as_deref(), Ok("Counter: 8"));
        assert_eq!(advance("  Counter: 0\n", 10).as_deref(), Ok("Counter: 10"));
    }

    #[test]
    fn rejects_text_that_is_not_a_counter() {
        for text in ["", "Counter:", "Counter: ", "Counter: x", "Count: 3", "Counter: -1", "Counter: 3 apples"]
        {
            assert_eq!(parse(text), Err(NotACounter(text.to_owned())), "input: {text:?}");
        }
    }

    #[test]
    fn overflowing_digits_are_not_a_counter() {
        assert!(parse("Counter: 99999999999999999999999").is_err());
    }

    #[test]
    fn increment_saturates_instead_of_wrapping() {
        assert_eq!(apply_increment(u64::MAX - 1, 10), u64::MAX);
    }
}

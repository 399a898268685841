//! Pure predicates deciding whether an inbound payload belongs to a
//! registration.

/// Canonical form of a text trigger: trimmed and lowercased.
pub fn normalize_trigger(trigger: &str) -> String {
    trigger.trim().to_lowercase()
}

/// Case-insensitive substring test. `trigger` must already be normalized.
pub fn text_matches(normalized_trigger: &str, text: &str) -> bool {
    !normalized_trigger.is_empty() && text.to_lowercase().contains(normalized_trigger)
}

/// Words following `command` when it is the first word of `text`, compared
/// case-insensitively. `None` when the text merely mentions it.
pub fn command_words<'a>(text: &'a str, command: &str) -> Option<Vec<&'a str>> {
    let mut words = text.split_whitespace();
    let first = words.next()?;
    first.eq_ignore_ascii_case(command.trim()).then(|| words.collect())
}

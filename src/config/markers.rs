//! Keyword tables used to classify goals, plan steps and elements.
//!
//! English and Arabic variants live side by side; matching is
//! case-insensitive substring search.

/// Goal words that mean "open an app".
pub const OPEN_MARKERS: &[&str] = &["open", "launch", "افتح", "فتح", "شغل"];

/// Goal words and element labels that mean "send a message".
pub const SEND_MARKERS: &[&str] = &["send", "إرسال", "ارسل", "أرسل"];

/// Element text or labels that identify a search affordance.
pub const SEARCH_MARKERS: &[&str] = &["search", "بحث"];

/// Plan step keywords, one table per step intent.
pub const LOCATE_STEP: &[&str] = &["find", "search"];
pub const TAP_STEP: &[&str] = &["tap", "click"];
pub const COMPOSE_STEP: &[&str] = &["compose", "write", "type"];
pub const SEND_STEP: &[&str] = &["send"];

/// Whether `haystack` contains any of `markers`, ignoring case.
pub fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    markers.iter().any(|m| haystack.contains(&m.to_lowercase()))
}

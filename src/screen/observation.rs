//! Screen observations and element lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::element::{ElementKind, UiElement};
use crate::config::get_messages;

/// One snapshot of the useful elements on screen, in tree pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub elements: Vec<UiElement>,
    pub captured_at: DateTime<Utc>,
}

impl Observation {
    /// Create an observation captured now.
    pub fn new(elements: Vec<UiElement>) -> Self {
        Self {
            elements,
            captured_at: Utc::now(),
        }
    }

    /// An observation with no elements (e.g. no active window).
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// First element whose text or label contains `needle`, ignoring case.
    pub fn find_by_text(&self, needle: &str) -> Option<&UiElement> {
        self.elements.iter().find(|e| e.matches_text(needle))
    }

    /// First element of the given kind.
    pub fn find_by_kind(&self, kind: ElementKind) -> Option<&UiElement> {
        self.elements.iter().find(|e| e.is_kind(kind))
    }

    /// Localized plain-text rendering of the screen.
    pub fn describe(&self, lang: &str) -> String {
        let msgs = get_messages(lang);
        let mut out = format!("{}\n", msgs.screen_header);

        for element in &self.elements {
            if let Some(line) = describe_element(element, lang) {
                out.push_str("- ");
                out.push_str(&line);
                out.push('\n');
            }
        }

        out
    }

    /// Like [`describe`](Self::describe) but every element is listed with its
    /// index so a model can refer back to it.
    pub fn describe_indexed(&self, lang: &str) -> String {
        let msgs = get_messages(lang);
        let mut out = format!("{}\n", msgs.screen_header);

        for (index, element) in self.elements.iter().enumerate() {
            let line = describe_element(element, lang)
                .unwrap_or_else(|| format!("{}: {}", msgs.text, element.display_text()));
            let (x, y) = element.bounds.center();
            out.push_str(&format!("[{}] {} @({},{})\n", index, line, x, y));
        }

        out
    }
}

fn describe_element(element: &UiElement, lang: &str) -> Option<String> {
    let msgs = get_messages(lang);

    if element.clickable {
        Some(format!("{}: {}", msgs.clickable, element.display_text()))
    } else if element.editable {
        let content = if element.text.is_empty() {
            msgs.empty
        } else {
            element.text.as_str()
        };
        Some(format!("{}: {}", msgs.input, content))
    } else if element.scrollable {
        Some(msgs.scrollable.to_string())
    } else if !element.text.is_empty() {
        Some(format!("{}: {}", msgs.text, element.text))
    } else {
        None
    }
}

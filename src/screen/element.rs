//! UI element model captured from the accessibility tree.

use serde::{Deserialize, Serialize};

/// Rectangle in screen-space pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Create new bounds.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Center point, rounded towards the top-left like Android's `Rect.centerX()`.
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Element categories used by lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Button,
    Input,
    Search,
    Scrollable,
}

/// A single interactive or informative element on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElement {
    /// View resource id (may be empty).
    pub id: String,
    /// Visible text.
    pub text: String,
    /// Accessible label (content description).
    pub label: String,
    /// Platform class name, e.g. `android.widget.Button`.
    pub class_name: String,
    pub bounds: Bounds,
    pub clickable: bool,
    pub editable: bool,
    pub scrollable: bool,
    pub visible: bool,
}

impl UiElement {
    /// Whether this element is worth reporting to the decision engine.
    pub fn is_useful(&self) -> bool {
        self.visible
            && (self.clickable
                || self.editable
                || self.scrollable
                || !self.text.is_empty()
                || !self.label.is_empty())
    }

    /// Case-insensitive substring match over text and label.
    pub fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        let needle = needle.to_lowercase();
        self.text.to_lowercase().contains(&needle) || self.label.to_lowercase().contains(&needle)
    }

    /// Classification rules for [`ElementKind`].
    pub fn is_kind(&self, kind: ElementKind) -> bool {
        use crate::config::SEARCH_MARKERS;

        let class = self.class_name.to_lowercase();
        match kind {
            ElementKind::Button => self.clickable && class.contains("button"),
            ElementKind::Input => self.editable || class.contains("edittext"),
            ElementKind::Search => {
                SEARCH_MARKERS.iter().any(|m| self.matches_text(m)) || class.contains("searchview")
            }
            ElementKind::Scrollable => self.scrollable,
        }
    }

    /// Text shown to humans: the text if present, otherwise the label.
    pub fn display_text(&self) -> &str {
        if self.text.is_empty() {
            &self.label
        } else {
            &self.text
        }
    }
}

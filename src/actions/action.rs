//! Abstract actions produced by a decision engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::screen::Bounds;

/// Direction of a scroll gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("Unknown scroll direction: {}", other)),
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// The next thing the agent should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// The goal has been reached.
    Completed,
    /// Tap the center of an element.
    Click { bounds: Bounds },
    /// Focus an input field and replace its text.
    TypeText { bounds: Bounds, text: String },
    /// Swipe the screen.
    Scroll { direction: ScrollDirection },
    /// Do nothing for a while.
    Wait { millis: u64 },
    /// The engine could not find a way forward.
    Failed { message: String },
    /// Press and hold the center of an element.
    LongPress { bounds: Bounds },
    /// System back key.
    Back,
    /// System home key.
    Home,
}

impl Action {
    /// Stable tag for the variant, independent of its payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Click { .. } => "click",
            Self::TypeText { .. } => "type_text",
            Self::Scroll { .. } => "scroll",
            Self::Wait { .. } => "wait",
            Self::Failed { .. } => "failed",
            Self::LongPress { .. } => "long_press",
            Self::Back => "back",
            Self::Home => "home",
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Click { bounds } => write!(f, "click {:?}", bounds.center()),
            Self::TypeText { bounds, text } => {
                write!(f, "type {:?} into {:?}", text, bounds.center())
            }
            Self::Scroll { direction } => write!(f, "scroll {}", direction),
            Self::Wait { millis } => write!(f, "wait {}ms", millis),
            Self::Failed { message } => write!(f, "failed: {}", message),
            Self::LongPress { bounds } => write!(f, "long press {:?}", bounds.center()),
            Self::Back => write!(f, "back"),
            Self::Home => write!(f, "home"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_direction_parse() {
        assert_eq!("DOWN".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert_eq!(" left ".parse::<ScrollDirection>(), Ok(ScrollDirection::Left));
        assert!("diagonal".parse::<ScrollDirection>().is_err());
    }

    #[test]
    fn test_kind_ignores_payload() {
        let a = Action::Click {
            bounds: Bounds::new(0, 0, 1, 1),
        };
        let b = Action::Click {
            bounds: Bounds::new(5, 5, 9, 9),
        };
        assert_eq!(a.kind(), b.kind());
        assert_ne!(a.kind(), Action::Back.kind());
    }

    #[test]
    fn test_serde_tagged() {
        let action = Action::Scroll {
            direction: ScrollDirection::Down,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "scroll");
        assert_eq!(json["direction"], "down");

        let wait: Action = serde_json::from_str(r#"{"type":"wait","millis":500}"#).unwrap();
        assert_eq!(wait, Action::Wait { millis: 500 });
    }
}

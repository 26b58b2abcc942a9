//! Device-level primitives: gestures, text input and global keys.
//!
//! The automation core only talks to the device through [`DeviceController`],
//! so the same loop runs against ADB, an on-device accessibility bridge, or a
//! test double.

use async_trait::async_trait;
use thiserror::Error;

use crate::screen::UiNode;

/// Device errors.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Command execution failed: {0}")]
    CommandFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A point in screen-space pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Screen dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// A synthesized touch input.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Press at a single point for `duration_ms`.
    Tap { at: Point, duration_ms: u64 },
    /// Straight-line stroke from `from` to `to`.
    Swipe {
        from: Point,
        to: Point,
        duration_ms: u64,
    },
}

/// System-wide navigation actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Back,
    Home,
}

/// Dispatches device-level input on behalf of the automation core.
///
/// Every call resolves once the platform has accepted the input, not when
/// the screen has finished reacting to it.
#[async_trait]
pub trait DeviceController: Send + Sync {
    /// Dispatch a gesture. `Ok(false)` means the platform rejected it.
    async fn dispatch_gesture(&self, gesture: &Gesture) -> Result<bool, DeviceError>;

    /// Replace the text of an editable node.
    async fn set_text(&self, node: &UiNode, text: &str) -> Result<bool, DeviceError>;

    /// Perform a global navigation action.
    async fn global_action(&self, action: GlobalAction) -> Result<bool, DeviceError>;

    /// Current screen size.
    async fn screen_size(&self) -> Result<ScreenSize, DeviceError>;
}

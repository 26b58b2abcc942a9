//! Turns abstract actions into device gestures, text input and key presses.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use super::action::{Action, ScrollDirection};
use crate::device::{DeviceController, DeviceError, Gesture, GlobalAction, Point, ScreenSize};
use crate::screen::{Bounds, UiTreeSource};

/// Timing knobs for [`ActionExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Delay between tapping an input and looking it up for text entry.
    pub focus_delay: Duration,
    pub tap_duration_ms: u64,
    pub long_press_duration_ms: u64,
    pub scroll_duration_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            focus_delay: Duration::from_millis(500),
            tap_duration_ms: 100,
            long_press_duration_ms: 1000,
            scroll_duration_ms: 300,
        }
    }
}

impl ExecutorConfig {
    pub fn with_focus_delay(mut self, delay: Duration) -> Self {
        self.focus_delay = delay;
        self
    }
}

/// Executes [`Action`]s against a device.
///
/// `Ok(true)` means the platform accepted the input; it says nothing about
/// whether the screen changed as intended.
pub struct ActionExecutor {
    device: Arc<dyn DeviceController>,
    tree: Arc<dyn UiTreeSource>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(device: Arc<dyn DeviceController>, tree: Arc<dyn UiTreeSource>) -> Self {
        Self::with_config(device, tree, ExecutorConfig::default())
    }

    pub fn with_config(
        device: Arc<dyn DeviceController>,
        tree: Arc<dyn UiTreeSource>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            device,
            tree,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<dyn DeviceController> {
        &self.device
    }

    /// Execute one action.
    pub async fn execute(&self, action: &Action) -> Result<bool, DeviceError> {
        match action {
            Action::Completed => Ok(true),
            Action::Failed { message } => {
                tracing::debug!("Not executing failed action: {}", message);
                Ok(false)
            }
            Action::Click { bounds } => self.press(bounds, self.config.tap_duration_ms).await,
            Action::LongPress { bounds } => {
                self.press(bounds, self.config.long_press_duration_ms).await
            }
            Action::TypeText { bounds, text } => self.type_text(bounds, text).await,
            Action::Scroll { direction } => self.scroll(*direction).await,
            Action::Wait { millis } => {
                sleep(Duration::from_millis(*millis)).await;
                Ok(true)
            }
            Action::Back => self.device.global_action(GlobalAction::Back).await,
            Action::Home => self.device.global_action(GlobalAction::Home).await,
        }
    }

    async fn press(&self, bounds: &Bounds, duration_ms: u64) -> Result<bool, DeviceError> {
        let (x, y) = bounds.center();
        let gesture = Gesture::Tap {
            at: Point::new(x as f32, y as f32),
            duration_ms,
        };
        self.device.dispatch_gesture(&gesture).await
    }

    async fn type_text(&self, bounds: &Bounds, text: &str) -> Result<bool, DeviceError> {
        if !self.press(bounds, self.config.tap_duration_ms).await? {
            return Ok(false);
        }
        sleep(self.config.focus_delay).await;

        let Some(root) = self.tree.root().await? else {
            tracing::warn!("No active window after focusing input at {:?}", bounds);
            return Ok(false);
        };

        match root.find_editable_by_bounds(bounds) {
            Some(node) => self.device.set_text(node, text).await,
            None => {
                tracing::warn!("No editable node at {:?}; the screen may have changed", bounds);
                Ok(false)
            }
        }
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<bool, DeviceError> {
        let size = self.device.screen_size().await?;
        let (from, to) = scroll_points(size, direction);
        let gesture = Gesture::Swipe {
            from,
            to,
            duration_ms: self.config.scroll_duration_ms,
        };
        self.device.dispatch_gesture(&gesture).await
    }
}

/// Swipe endpoints for a scroll: 30% and 70% along the scroll axis, centered on
/// the other axis.
fn scroll_points(size: ScreenSize, direction: ScrollDirection) -> (Point, Point) {
    let w = size.width as f32;
    let h = size.height as f32;
    let (cx, cy) = (w / 2.0, h / 2.0);

    match direction {
        ScrollDirection::Down => (Point::new(cx, h * 0.3), Point::new(cx, h * 0.7)),
        ScrollDirection::Up => (Point::new(cx, h * 0.7), Point::new(cx, h * 0.3)),
        ScrollDirection::Left => (Point::new(w * 0.7, cy), Point::new(w * 0.3, cy)),
        ScrollDirection::Right => (Point::new(w * 0.3, cy), Point::new(w * 0.7, cy)),
    }
}

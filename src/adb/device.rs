//! ADB-backed device: gestures via `input`, tree via `uiautomator dump`.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::sleep;

use super::connection::AdbConnection;
use super::input::{clear_text, detect_and_set_adb_keyboard, restore_keyboard, type_text};
use crate::device::{DeviceController, DeviceError, Gesture, GlobalAction, ScreenSize};
use crate::screen::{parse_hierarchy, UiNode, UiTreeSource};

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Physical|Override) size:\s*(\d+)x(\d+)").expect("valid size regex")
});

/// Pause between keyboard steps so the IME can settle.
const KEYBOARD_SETTLE: Duration = Duration::from_millis(300);

/// An Android device driven through ADB.
#[derive(Debug, Clone, Default)]
pub struct AdbDevice {
    conn: AdbConnection,
}

impl AdbDevice {
    pub fn new(conn: AdbConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &AdbConnection {
        &self.conn
    }

    async fn tap(&self, x: i32, y: i32) -> Result<bool, DeviceError> {
        let out = self
            .conn
            .shell(&["input", "tap", &x.to_string(), &y.to_string()])
            .await?;
        Ok(out.success)
    }

    async fn swipe(
        &self,
        from: (i32, i32),
        to: (i32, i32),
        duration_ms: u64,
    ) -> Result<bool, DeviceError> {
        let out = self
            .conn
            .shell(&[
                "input",
                "swipe",
                &from.0.to_string(),
                &from.1.to_string(),
                &to.0.to_string(),
                &to.1.to_string(),
                &duration_ms.to_string(),
            ])
            .await?;
        Ok(out.success)
    }
}

#[async_trait]
impl DeviceController for AdbDevice {
    async fn dispatch_gesture(&self, gesture: &Gesture) -> Result<bool, DeviceError> {
        match *gesture {
            // `input tap` has a fixed short press; longer presses are zero-length swipes.
            Gesture::Tap { at, duration_ms } if duration_ms <= 200 => {
                self.tap(at.x.round() as i32, at.y.round() as i32).await
            }
            Gesture::Tap { at, duration_ms } => {
                let point = (at.x.round() as i32, at.y.round() as i32);
                self.swipe(point, point, duration_ms).await
            }
            Gesture::Swipe {
                from,
                to,
                duration_ms,
            } => {
                self.swipe(
                    (from.x.round() as i32, from.y.round() as i32),
                    (to.x.round() as i32, to.y.round() as i32),
                    duration_ms,
                )
                .await
            }
        }
    }

    async fn set_text(&self, node: &UiNode, text: &str) -> Result<bool, DeviceError> {
        let original_ime = detect_and_set_adb_keyboard(&self.conn).await?;
        sleep(KEYBOARD_SETTLE).await;

        clear_text(&self.conn).await?;
        sleep(KEYBOARD_SETTLE).await;

        type_text(&self.conn, text).await?;
        sleep(KEYBOARD_SETTLE).await;

        restore_keyboard(&self.conn, &original_ime).await?;
        tracing::debug!("Typed {} chars into {:?}", text.chars().count(), node.bounds);
        Ok(true)
    }

    async fn global_action(&self, action: GlobalAction) -> Result<bool, DeviceError> {
        let keycode = match action {
            GlobalAction::Back => "KEYCODE_BACK",
            GlobalAction::Home => "KEYCODE_HOME",
        };
        let out = self.conn.shell(&["input", "keyevent", keycode]).await?;
        Ok(out.success)
    }

    async fn screen_size(&self) -> Result<ScreenSize, DeviceError> {
        let out = self.conn.shell(&["wm", "size"]).await?;
        parse_screen_size(&out.stdout)
            .ok_or_else(|| DeviceError::Parse(format!("Unexpected wm size output: {}", out.stdout.trim())))
    }
}

#[async_trait]
impl UiTreeSource for AdbDevice {
    async fn root(&self) -> Result<Option<UiNode>, DeviceError> {
        let out = self
            .conn
            .run(&["exec-out", "uiautomator", "dump", "/dev/tty"])
            .await?;
        if !out.success {
            return Err(DeviceError::CommandFailed(format!(
                "uiautomator dump: {}",
                out.combined().trim()
            )));
        }
        Ok(parse_hierarchy(&out.stdout))
    }
}

/// Parse `wm size`, preferring the override size when present.
fn parse_screen_size(output: &str) -> Option<ScreenSize> {
    let mut physical = None;
    let mut overridden = None;

    for caps in SIZE_RE.captures_iter(output) {
        let width = caps[2].parse().ok()?;
        let height = caps[3].parse().ok()?;
        let size = ScreenSize { width, height };
        if &caps[1] == "Override" {
            overridden = Some(size);
        } else {
            physical = Some(size);
        }
    }

    overridden.or(physical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_screen_size() {
        assert_eq!(
            parse_screen_size("Physical size: 1080x2400\n"),
            Some(ScreenSize {
                width: 1080,
                height: 2400
            })
        );
        assert_eq!(
            parse_screen_size("Physical size: 1440x3200\nOverride size: 1080x2400\n"),
            Some(ScreenSize {
                width: 1080,
                height: 2400
            })
        );
        assert!(parse_screen_size("error: no devices/emulators found").is_none());
    }
}

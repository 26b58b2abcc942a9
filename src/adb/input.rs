//! Text input through ADB Keyboard.
//!
//! Requires ADB Keyboard to be installed on the device.
//! See: https://github.com/senzhk/ADBKeyBoard

use base64::{engine::general_purpose::STANDARD, Engine};

use super::connection::AdbConnection;
use crate::device::DeviceError;

const ADB_KEYBOARD_IME: &str = "com.android.adbkeyboard/.AdbIME";

/// Type text into the focused field.
pub async fn type_text(conn: &AdbConnection, text: &str) -> Result<(), DeviceError> {
    let encoded = STANDARD.encode(text.as_bytes());
    conn.shell(&["am", "broadcast", "-a", "ADB_INPUT_B64", "--es", "msg", &encoded])
        .await?;
    Ok(())
}

/// Clear the focused field.
pub async fn clear_text(conn: &AdbConnection) -> Result<(), DeviceError> {
    conn.shell(&["am", "broadcast", "-a", "ADB_CLEAR_TEXT"]).await?;
    Ok(())
}

/// Switch to ADB Keyboard and return the previous IME for [`restore_keyboard`].
pub async fn detect_and_set_adb_keyboard(conn: &AdbConnection) -> Result<String, DeviceError> {
    let current_ime = conn
        .shell(&["settings", "get", "secure", "default_input_method"])
        .await?
        .combined()
        .trim()
        .to_string();

    if !current_ime.contains(ADB_KEYBOARD_IME) {
        conn.shell(&["ime", "set", ADB_KEYBOARD_IME]).await?;
    }

    // Warm up the keyboard
    type_text(conn, "").await?;

    Ok(current_ime)
}

/// Restore a previously active IME.
pub async fn restore_keyboard(conn: &AdbConnection, ime: &str) -> Result<(), DeviceError> {
    if ime.is_empty() || ime.contains(ADB_KEYBOARD_IME) {
        return Ok(());
    }
    conn.shell(&["ime", "set", ime]).await?;
    Ok(())
}

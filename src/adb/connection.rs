//! ADB command plumbing and device discovery.

use tokio::process::Command;

use crate::device::DeviceError;

/// Type of ADB connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionType {
    Usb,
    Wifi,
    Remote,
}

/// Information about a connected device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_id: String,
    pub status: String,
    pub connection_type: ConnectionType,
    pub model: Option<String>,
}

/// Captured output of one ADB invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout and stderr joined, as ADB prints some results on stderr.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs ADB commands against one device (or the only attached one).
#[derive(Debug, Clone)]
pub struct AdbConnection {
    adb_path: String,
    device_id: Option<String>,
}

impl Default for AdbConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl AdbConnection {
    /// Use `adb` from `PATH` and the default device.
    pub fn new() -> Self {
        Self {
            adb_path: "adb".to_string(),
            device_id: None,
        }
    }

    /// Use a custom ADB binary.
    pub fn with_path(mut self, adb_path: impl Into<String>) -> Self {
        self.adb_path = adb_path.into();
        self
    }

    /// Target a specific device serial.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Command prefix with the optional device specifier.
    pub fn prefix(&self) -> Vec<String> {
        let mut prefix = vec![self.adb_path.clone()];
        if let Some(id) = &self.device_id {
            prefix.push("-s".to_string());
            prefix.push(id.clone());
        }
        prefix
    }

    /// Run `adb [-s id] <args>`.
    pub async fn run(&self, args: &[&str]) -> Result<CommandOutput, DeviceError> {
        let prefix = self.prefix();
        let output = Command::new(&prefix[0])
            .args(&prefix[1..])
            .args(args)
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run `adb shell <args>` and fail on a non-zero exit status.
    pub async fn shell(&self, args: &[&str]) -> Result<CommandOutput, DeviceError> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        let output = self.run(&full).await?;
        if !output.success {
            return Err(DeviceError::CommandFailed(format!(
                "adb shell {}: {}",
                args.join(" "),
                output.combined().trim()
            )));
        }
        Ok(output)
    }

    /// List all connected devices.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let output = Command::new(&self.adb_path)
            .args(["devices", "-l"])
            .output()
            .await?;
        Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_device_list(stdout: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    for line in stdout.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let device_id = parts[0].to_string();
        let connection_type = if device_id.contains(':') {
            ConnectionType::Remote
        } else if parts.iter().any(|p| p.starts_with("usb:")) {
            ConnectionType::Usb
        } else {
            ConnectionType::Wifi
        };

        let model = parts
            .iter()
            .find(|p| p.starts_with("model:"))
            .map(|m| m.trim_start_matches("model:").to_string());

        devices.push(DeviceInfo {
            device_id,
            status: parts[1].to_string(),
            connection_type,
            model,
        });
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix() {
        assert_eq!(AdbConnection::new().prefix(), vec!["adb"]);

        let conn = AdbConnection::new()
            .with_path("/opt/adb")
            .with_device_id("device123");
        assert_eq!(conn.prefix(), vec!["/opt/adb", "-s", "device123"]);
    }

    #[test]
    fn test_parse_device_list() {
        let stdout = "List of devices attached\n\
            R58M123 device usb:1-1 product:a52 model:SM_A525F device:a52q\n\
            192.168.1.20:5555 device product:x model:Pixel_7\n\
            \n";
        let devices = parse_device_list(stdout);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].connection_type, ConnectionType::Usb);
        assert_eq!(devices[0].model.as_deref(), Some("SM_A525F"));
        assert_eq!(devices[1].connection_type, ConnectionType::Remote);
    }
}

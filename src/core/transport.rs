//! Contract with the session layer that runs CLI commands on a device.
//!
//! The core only needs two things from a session: which CLI dialect the
//! device speaks and a way to run commands. Opening, authenticating, and
//! tearing down sessions is the caller's job.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// CLI dialect family reported by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OsType {
    ArubaSwitch,
    ArubaCXSwitch,
    ArubaController,
    ArubaInstant,
}

impl OsType {
    pub const ALL: [OsType; 4] = [
        OsType::ArubaSwitch,
        OsType::ArubaCXSwitch,
        OsType::ArubaController,
        OsType::ArubaInstant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::ArubaSwitch => "ArubaSwitch",
            OsType::ArubaCXSwitch => "ArubaCXSwitch",
            OsType::ArubaController => "ArubaController",
            OsType::ArubaInstant => "ArubaInstant",
        }
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown OS type: '{0}'")]
pub struct UnknownOsType(pub String);

impl FromStr for OsType {
    type Err = UnknownOsType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OsType::ALL
            .into_iter()
            .find(|os| os.as_str() == s.trim())
            .ok_or_else(|| UnknownOsType(s.trim().to_string()))
    }
}

/// Failures reported by a session while running a command.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The device did not answer within the configured timeout.
    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The device or session rejected the command.
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Local IO failure, e.g. the session socket or a capture file.
    #[error("Transport IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A session to one device.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Dialect of the device behind this session.
    fn os_type(&self) -> OsType;

    /// Runs `commands` in order and returns their combined output.
    async fn run_command(&self, commands: &[&str]) -> Result<String, TransportError>;
}

/// Transport that serves previously captured command output from disk.
///
/// Directory layout:
/// ```text
/// <dir>/
///   os_type                              <- e.g. "ArubaCXSwitch"
///   show_environment_temperature.txt     <- output of "show environment temperature"
///   show_version.txt
/// ```
/// A command without a capture file fails with `TransportError::CommandFailed`.
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    dir: PathBuf,
    os_type: OsType,
}

impl ReplayTransport {
    pub fn new(dir: impl Into<PathBuf>, os_type: OsType) -> Self {
        ReplayTransport {
            dir: dir.into(),
            os_type,
        }
    }

    /// Opens a capture directory, reading the dialect from its `os_type` file.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let dir = dir.into();
        let raw = tokio::fs::read_to_string(dir.join("os_type")).await?;
        let os_type = raw.parse::<OsType>().map_err(|e| TransportError::CommandFailed {
            command: "os_type".to_string(),
            reason: e.to_string(),
        })?;
        Ok(ReplayTransport { dir, os_type })
    }

    /// Capture file name for a command: words joined by `_`, plus `.txt`.
    pub fn capture_file_name(command: &str) -> String {
        let mut name = command.split_whitespace().collect::<Vec<_>>().join("_");
        name.push_str(".txt");
        name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl Transport for ReplayTransport {
    fn os_type(&self) -> OsType {
        self.os_type
    }

    async fn run_command(&self, commands: &[&str]) -> Result<String, TransportError> {
        let mut output = String::new();
        for command in commands {
            let path = self.dir.join(Self::capture_file_name(command));
            trace!("Replaying '{}' from {}", command, path.display());
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => output.push_str(&text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(TransportError::CommandFailed {
                        command: command.to_string(),
                        reason: format!("no capture at {}", path.display()),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(output)
    }
}

//! Error types for Zigbee adapter detection

use std::io;

use thiserror::Error;

/// Errors that can occur during detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// No fingerprint matched before the overall detection deadline
    #[error("detection timeout on {port} after {timeout_ms}ms")]
    Timeout { port: String, timeout_ms: u64 },

    /// The process is not allowed to open the device
    #[error("Permission denied opening {0}")]
    PermissionDenied(String),

    /// The device node disappeared or never existed
    #[error("No such file or device: {0}")]
    NotFound(String),

    /// Port busy or in use
    #[error("Device or resource busy: {0}")]
    PortBusy(String),

    /// Failed to open serial port for any other reason
    #[error("failed to open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    /// I/O error during probe
    #[error("I/O error on {port}: {reason}")]
    IoError { port: String, reason: String },

    /// Opaque failure reported by a detection backend
    #[error("{0}")]
    Backend(String),
}

impl DetectError {
    /// Map a failure to open `port` onto the structured variants
    pub fn from_open(port: &str, err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => Self::NotFound(port.to_string()),
            serialport::ErrorKind::Io(io::ErrorKind::NotFound) => Self::NotFound(port.to_string()),
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                Self::PermissionDenied(port.to_string())
            }
            _ if err.description.contains("busy") => Self::PortBusy(port.to_string()),
            _ => Self::OpenFailed {
                port: port.to_string(),
                reason: err.description,
            },
        }
    }

    /// Wrap an I/O error raised while talking to an open port
    pub fn io(port: &str, err: &io::Error) -> Self {
        Self::IoError {
            port: port.to_string(),
            reason: err.to_string(),
        }
    }
}

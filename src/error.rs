//! Error types for the remote control core.
//!
//! | Type | Raised by |
//! |------|-----------|
//! | [`TransportError`] | platform BLE backends |
//! | [`RemoteError`] | connection manager and command dispatcher |

use thiserror::Error;

use crate::domain::color::ColorError;

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Failures reported by a BLE backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Discovery was cancelled before a module was picked.
    #[error("discovery cancelled")]
    Cancelled,

    /// Discovery finished without any module matching the filter.
    #[error("no train module found")]
    NoMatchingDevice,

    #[error("train service not found on device")]
    ServiceNotFound,

    #[error("control characteristic not found on device")]
    CharacteristicNotFound,

    /// The module answered the write with a non-success GATT status.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// Any other error raised by the platform API.
    #[error("{0}")]
    Platform(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for TransportError {
    fn from(err: windows::core::Error) -> Self {
        // 0x800704C7: the user dismissed a system dialog
        if err.code().0 as u32 == 0x800704C7 {
            Self::Cancelled
        } else {
            Self::Platform(err.message().to_string())
        }
    }
}

/// Errors surfaced to the UI.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The host has no usable Bluetooth LE adapter.
    #[error("Bluetooth is not available on this computer")]
    TransportUnavailable,

    /// Discovery or connection failed, or the user cancelled discovery.
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// A command was issued with no live session.
    #[error("Not connected to the train")]
    NotConnected,

    /// The transport refused or failed the write. Nothing was retried.
    #[error("Write failed: {0}")]
    WriteFailed(#[source] TransportError),

    #[error(transparent)]
    InvalidColor(#[from] ColorError),

    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RemoteError {
    /// Wrap a discovery/connect failure, keeping the platform message as
    /// the reason shown to the user.
    pub fn connection_failed(err: TransportError) -> Self {
        Self::ConnectionFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_carries_reason() {
        let err = RemoteError::connection_failed(TransportError::Cancelled);
        assert_eq!(err.to_string(), "Connection failed: discovery cancelled");
    }

    #[test]
    fn test_write_failed_keeps_source() {
        let err = RemoteError::WriteFailed(TransportError::WriteRejected("Unreachable".into()));
        assert_eq!(err.to_string(), "Write failed: write rejected: Unreachable");
        assert!(std::error::Error::source(&err).is_some());
    }
}

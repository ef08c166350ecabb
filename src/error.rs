//! Typed failure taxonomy for the alert loop.
//!
//! Only `CaptureError::DeviceUnavailable` at startup and a `ReadFailure` that
//! survives the single reconnect attempt terminate the process. Playback and
//! asset failures are absorbed by the alert sink and logged.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the capture layer.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No backend or device index produced a readable stream.
    #[error("no camera available (tried: {})", .attempts.join("; "))]
    DeviceUnavailable { attempts: Vec<String> },

    /// A frame read failed on an open device.
    #[error("frame read failed: {0}")]
    ReadFailure(String),

    /// A backend could not open the requested device index.
    #[error("backend '{backend}' could not open device {index}: {reason}")]
    OpenFailed {
        backend: String,
        index: u32,
        reason: String,
    },

    /// The device rejected a property value.
    #[error("unsupported capture property {0}")]
    UnsupportedProperty(String),

    /// The requested backend identifier is not registered.
    #[error("capture backend '{0}' not registered")]
    BackendNotRegistered(String),
}

/// Failures raised by an audio backend. Never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("audio init failed: {0}")]
    Init(String),
    #[error("could not load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },
    #[error("could not play sound: {0}")]
    Play(String),
}

/// Failures raised while resolving the alert sound.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("custom audio file not found or invalid: {}", .path.display())]
    AssetNotFound { path: PathBuf },
}

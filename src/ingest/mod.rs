//! Frame acquisition.
//!
//! This module provides the capture side of the alert loop:
//! - `CaptureBackend` / `CaptureDevice`: the driver seam (open/read/release/set-property)
//! - `CaptureRegistry`: named backends, with `any` resolving to the default
//! - `FrameSource`: backend fallback at startup, bounded reconnect at runtime
//! - Synthetic source (testing, dry runs)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//!
//! The capture layer owns the device connection exclusively. Frames are handed
//! out by value and never buffered here.

#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod registry;
mod source;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use registry::{CaptureRegistry, ANY_BACKEND};
pub use source::{
    select_first, CaptureCandidate, CaptureHandle, CaptureSettings, CaptureStats, FrameSource,
};
pub use synthetic::SyntheticBackend;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Backend;

use crate::error::CaptureError;
use crate::frame::Frame;

/// Device properties requested after a successful open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureProperty {
    FrameWidth(u32),
    FrameHeight(u32),
    Fps(u32),
}

/// A capture driver addressed by identifier.
pub trait CaptureBackend {
    /// Backend identifier (e.g. "v4l2").
    fn id(&self) -> &str;

    /// Open the device at `index`.
    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

/// An open device connection.
pub trait CaptureDevice {
    /// Block until the next frame is available.
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Request a device property. Drivers may ignore or adjust the value.
    fn set_property(&mut self, property: CaptureProperty) -> Result<(), CaptureError>;

    /// Release the underlying connection. Must be idempotent.
    fn release(&mut self);
}

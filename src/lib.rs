//! Vehicle alert
//!
//! Samples frames from a camera, runs an object-detection model over each
//! frame, and raises an alert when a target class (by default a vehicle) is in
//! view, at most once per cooldown.
//!
//! # Architecture
//!
//! Data flows one way each iteration:
//!
//! `FrameSource` -> `Detector` -> `AlertGate` -> `AlertSink`
//!
//! The loop is single-threaded and synchronous. Every component is owned by
//! the caller and borrowed by `runtime::MainLoop`; there is no global state.
//!
//! # Module Structure
//!
//! - `frame`: per-iteration pixel buffers
//! - `ingest`: capture backends, fallback selection, reconnect
//! - `detect`: model seam and label lookup
//! - `alert`: cooldown gate, alert dispatch, audio, sound discovery
//! - `runtime`: the loop state machine, quit signals, clocks
//! - `config`: file + environment configuration

pub mod alert;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod runtime;
pub mod ui;

pub use alert::{AlertGate, AlertOutcome, AlertSink, AlertState, SkipReason, TargetClassSet};
pub use config::AppConfig;
pub use detect::{BoundingBox, Detection, Detector, Model, RawDetection};
pub use error::{AssetError, CaptureError, PlaybackError};
pub use frame::Frame;
pub use ingest::{CaptureRegistry, CaptureSettings, FrameSource};
pub use runtime::{Clock, LoopContext, LoopReport, LoopState, MainLoop, QuitSignal, Termination};

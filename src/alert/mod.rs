//! Alert decision and dispatch.
//!
//! - `AlertGate`: target-class membership plus cooldown
//! - `AlertSink`: visual marker and alert sound, tolerant of playback failures
//! - `AudioBackend`: playback seam (`CommandPlayer` drives a system player)
//! - `asset`: locating the alert sound

pub mod asset;
mod gate;
mod player;
mod sink;

pub use asset::{resolve_audio_asset, AssetSearch};
pub use gate::{AlertGate, AlertState, TargetClassSet, DEFAULT_TARGETS};
pub use player::{AudioBackend, CommandPlayer, SilentPlayer};
pub use sink::{AlertOutcome, AlertSink, SkipReason};

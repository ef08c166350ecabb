use std::path::{Path, PathBuf};

use crate::error::PlaybackError;

use super::player::AudioBackend;

/// Why an alert produced no sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoAudioConfigured,
}

/// Result of dispatching one alert. Never an error: the alert itself always happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlertOutcome {
    Played,
    Skipped(SkipReason),
    Failed(PlaybackError),
}

struct AudioChannel {
    backend: Box<dyn AudioBackend>,
    asset: PathBuf,
}

/// Dispatches alerts: a visual marker always, and the alert sound when one is configured.
///
/// Playback failures are reported in the outcome and logged, never propagated.
pub struct AlertSink {
    audio: Option<AudioChannel>,
    alerts: u64,
}

impl AlertSink {
    /// Sink with no audio; every alert is visual only.
    pub fn visual_only() -> Self {
        Self {
            audio: None,
            alerts: 0,
        }
    }

    /// Sink that plays `asset` through `backend`.
    ///
    /// If the backend fails to initialise the sink degrades to visual only.
    pub fn with_audio<B: AudioBackend + 'static>(mut backend: B, asset: PathBuf) -> Self {
        match backend.init() {
            Ok(()) => {
                log::info!(
                    "audio alerts enabled ({}): {}",
                    backend.name(),
                    asset.display()
                );
                Self {
                    audio: Some(AudioChannel {
                        backend: Box::new(backend),
                        asset,
                    }),
                    alerts: 0,
                }
            }
            Err(err) => {
                log::warn!("{}; audio alerts disabled", err);
                Self::visual_only()
            }
        }
    }

    /// Sink for an optional asset, as resolved by asset discovery.
    pub fn for_asset<B: AudioBackend + 'static>(backend: B, asset: Option<PathBuf>) -> Self {
        match asset {
            Some(asset) => Self::with_audio(backend, asset),
            None => {
                log::warn!("no audio file found; audio alerts will be disabled");
                Self::visual_only()
            }
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn asset(&self) -> Option<&Path> {
        self.audio.as_ref().map(|audio| audio.asset.as_path())
    }

    pub fn alerts_dispatched(&self) -> u64 {
        self.alerts
    }

    /// Dispatch one alert.
    pub fn fire_alert(&mut self) -> AlertOutcome {
        self.alerts += 1;
        log::warn!("ALERT #{}: target detected", self.alerts);

        let Some(audio) = self.audio.as_mut() else {
            log::info!("audio file not available - visual alert only");
            return AlertOutcome::Skipped(SkipReason::NoAudioConfigured);
        };

        let played = audio
            .backend
            .load(&audio.asset)
            .and_then(|()| audio.backend.play());
        match played {
            Ok(()) => AlertOutcome::Played,
            Err(err) => {
                log::warn!("{}", err);
                AlertOutcome::Failed(err)
            }
        }
    }

    /// Tear down the audio subsystem. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(mut audio) = self.audio.take() {
            audio.backend.quit();
            log::info!("audio subsystem shut down");
        }
    }
}

impl Drop for AlertSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

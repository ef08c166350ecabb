use std::fmt;
use std::time::Duration;

use crate::error::CaptureError;
use crate::frame::Frame;

use super::{CaptureDevice, CaptureProperty, CaptureRegistry, ANY_BACKEND};

/// Capture configuration consumed by `FrameSource`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSettings {
    /// Backend identifiers in priority order.
    pub backends: Vec<String>,
    /// Device index tried on every backend in `backends`.
    pub device_index: u32,
    /// Indices `0..index_sweep` tried on the default backend when every backend failed.
    pub index_sweep: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Backend used for the single runtime reconnect attempt.
    pub reconnect_backend: String,
    /// Pause between releasing a failed device and reconnecting.
    pub reconnect_pause: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            backends: vec!["v4l2".to_string(), ANY_BACKEND.to_string()],
            device_index: 0,
            index_sweep: 3,
            width: 640,
            height: 480,
            fps: 30,
            reconnect_backend: ANY_BACKEND.to_string(),
            reconnect_pause: Duration::from_secs(1),
        }
    }
}

/// One (backend, device index) pair to try.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureCandidate {
    pub backend: String,
    pub index: u32,
}

impl CaptureCandidate {
    pub fn new(backend: &str, index: u32) -> Self {
        Self {
            backend: backend.to_string(),
            index,
        }
    }
}

impl fmt::Display for CaptureCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} device {}", self.backend, self.index)
    }
}

impl CaptureSettings {
    /// Startup candidates in priority order: each backend at `device_index`,
    /// then the default backend across `0..index_sweep`. Duplicates are dropped.
    pub fn startup_candidates(&self) -> Vec<CaptureCandidate> {
        let mut candidates: Vec<CaptureCandidate> = Vec::new();
        let sweep = (0..self.index_sweep).map(|index| CaptureCandidate::new(ANY_BACKEND, index));
        let primary = self
            .backends
            .iter()
            .map(|backend| CaptureCandidate::new(backend, self.device_index));
        for candidate in primary.chain(sweep) {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    fn properties(&self) -> [CaptureProperty; 3] {
        [
            CaptureProperty::FrameWidth(self.width),
            CaptureProperty::FrameHeight(self.height),
            CaptureProperty::Fps(self.fps),
        ]
    }
}

/// Return the first candidate for which `attempt` succeeds, or every failure in order.
///
/// Selection is separate from acquisition: `attempt` owns whatever side effects
/// opening a candidate has, this function only decides the order and the winner.
pub fn select_first<C, T, E>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: impl FnMut(&C) -> Result<T, E>,
) -> Result<(C, T), Vec<(C, E)>> {
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(&candidate) {
            Ok(value) => return Ok((candidate, value)),
            Err(err) => failures.push((candidate, err)),
        }
    }
    Err(failures)
}

/// Exclusive owner of an open device. Releases the device on drop.
pub struct CaptureHandle {
    device: Box<dyn CaptureDevice>,
    candidate: CaptureCandidate,
}

impl CaptureHandle {
    pub fn backend(&self) -> &str {
        &self.candidate.backend
    }

    pub fn index(&self) -> u32 {
        self.candidate.index
    }

    fn apply(&mut self, settings: &CaptureSettings) {
        for property in settings.properties() {
            if let Err(err) = self.device.set_property(property) {
                log::warn!(
                    "FrameSource: failed to set {:?} on {}: {}",
                    property,
                    self.candidate,
                    err
                );
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.device.release();
    }
}

/// Capture statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames_read: u64,
    pub reconnects: u64,
    pub active: Option<CaptureCandidate>,
}

/// Sequential frame source with startup fallback and bounded reconnect.
pub struct FrameSource {
    registry: CaptureRegistry,
    settings: CaptureSettings,
    handle: Option<CaptureHandle>,
    frames_read: u64,
    reconnects: u64,
}

impl FrameSource {
    /// Open the first candidate that both opens and yields a probe frame.
    pub fn open(registry: CaptureRegistry, settings: CaptureSettings) -> Result<Self, CaptureError> {
        let candidates = settings.startup_candidates();
        let (candidate, mut handle) =
            select_first(candidates, |candidate| try_candidate(&registry, candidate, true))
                .map_err(|failures| CaptureError::DeviceUnavailable {
                    attempts: failures
                        .into_iter()
                        .map(|(candidate, err)| format!("{}: {}", candidate, err))
                        .collect(),
                })?;

        log::info!("FrameSource: camera initialized with {}", candidate);
        handle.apply(&settings);

        Ok(Self {
            registry,
            settings,
            handle: Some(handle),
            frames_read: 0,
            reconnects: 0,
        })
    }

    /// Read the next frame. Any failure is reported as `ReadFailure`.
    pub fn read(&mut self) -> Result<Frame, CaptureError> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| CaptureError::ReadFailure("camera not connected".to_string()))?;
        let frame = handle.device.read().map_err(|err| match err {
            CaptureError::ReadFailure(reason) => CaptureError::ReadFailure(reason),
            other => CaptureError::ReadFailure(other.to_string()),
        })?;
        self.frames_read += 1;
        Ok(frame)
    }

    /// Release the device, pause, then make exactly one reconnect attempt.
    pub fn reconnect(&mut self) -> Result<(), CaptureError> {
        self.release();
        if !self.settings.reconnect_pause.is_zero() {
            std::thread::sleep(self.settings.reconnect_pause);
        }

        let candidate =
            CaptureCandidate::new(&self.settings.reconnect_backend, self.settings.device_index);
        match try_candidate(&self.registry, &candidate, false) {
            Ok(mut handle) => {
                handle.apply(&self.settings);
                self.handle = Some(handle);
                self.reconnects += 1;
                log::info!("FrameSource: reconnected with {}", candidate);
                Ok(())
            }
            Err(err) => {
                log::error!("FrameSource: cannot reinitialize camera: {}", err);
                Err(CaptureError::ReadFailure(format!(
                    "reconnect with {} failed: {}",
                    candidate, err
                )))
            }
        }
    }

    /// Release the device connection, if any.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::info!("FrameSource: releasing {}", handle.candidate);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&CaptureHandle> {
        self.handle.as_ref()
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_read: self.frames_read,
            reconnects: self.reconnects,
            active: self.handle.as_ref().map(|handle| handle.candidate.clone()),
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn try_candidate(
    registry: &CaptureRegistry,
    candidate: &CaptureCandidate,
    probe: bool,
) -> Result<CaptureHandle, CaptureError> {
    log::info!("FrameSource: trying {}", candidate);
    let device = registry.open(&candidate.backend, candidate.index)?;
    let mut handle = CaptureHandle {
        device,
        candidate: candidate.clone(),
    };
    if probe {
        // The probe frame is discarded; dropping `handle` on failure releases the device.
        handle.device.read()?;
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ingest::{CaptureBackend, SyntheticBackend};

    /// Backend whose devices open but never produce a frame.
    struct DeadBackend {
        id: &'static str,
        released: Rc<RefCell<u32>>,
    }

    struct DeadDevice {
        released: Rc<RefCell<u32>>,
    }

    impl CaptureBackend for DeadBackend {
        fn id(&self) -> &str {
            self.id
        }

        fn open(&self, _index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
            Ok(Box::new(DeadDevice {
                released: self.released.clone(),
            }))
        }
    }

    impl CaptureDevice for DeadDevice {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            Err(CaptureError::ReadFailure("no signal".to_string()))
        }

        fn set_property(&mut self, _property: CaptureProperty) -> Result<(), CaptureError> {
            Ok(())
        }

        fn release(&mut self) {
            *self.released.borrow_mut() += 1;
        }
    }

    fn quick_settings(backends: &[&str]) -> CaptureSettings {
        CaptureSettings {
            backends: backends.iter().map(|b| b.to_string()).collect(),
            reconnect_pause: Duration::ZERO,
            width: 4,
            height: 4,
            ..CaptureSettings::default()
        }
    }

    #[test]
    fn startup_candidates_follow_priority_then_sweep() {
        let settings = CaptureSettings::default();
        let candidates = settings.startup_candidates();
        assert_eq!(
            candidates,
            vec![
                CaptureCandidate::new("v4l2", 0),
                CaptureCandidate::new("any", 0),
                CaptureCandidate::new("any", 1),
                CaptureCandidate::new("any", 2),
            ]
        );
    }

    #[test]
    fn select_first_stops_at_first_success() {
        let mut tried = Vec::new();
        let result = select_first(vec![1, 2, 3, 4], |n| {
            tried.push(*n);
            if *n >= 3 {
                Ok(n * 10)
            } else {
                Err(format!("{} failed", n))
            }
        });
        assert_eq!(result, Ok((3, 30)));
        assert_eq!(tried, vec![1, 2, 3]);

        let none: Result<(u8, u8), Vec<(u8, &str)>> = select_first(vec![1u8, 2], |_| Err("no"));
        assert_eq!(none, Err(vec![(1, "no"), (2, "no")]));
    }

    #[test]
    fn falls_back_past_backend_that_cannot_probe() {
        let released = Rc::new(RefCell::new(0));
        let mut registry = CaptureRegistry::new();
        registry.register(DeadBackend {
            id: "dead",
            released: released.clone(),
        });
        registry.register(SyntheticBackend::new(4, 4));

        let source = FrameSource::open(registry, quick_settings(&["dead", "synthetic"]))
            .expect("synthetic backend opens");

        assert_eq!(source.handle().map(|h| h.backend()), Some("synthetic"));
        assert_eq!(*released.borrow(), 1, "failed probe must release the device");
    }

    #[test]
    fn sweeps_indices_on_default_backend() {
        let mut registry = CaptureRegistry::new();
        registry.register(SyntheticBackend::new(4, 4).with_unavailable_index(0));

        let source = FrameSource::open(registry, quick_settings(&["v4l2", "any"]))
            .expect("index 1 opens");

        let handle = source.handle().expect("connected");
        assert_eq!(handle.backend(), "any");
        assert_eq!(handle.index(), 1);
    }

    #[test]
    fn reports_every_attempt_when_nothing_opens() {
        let registry = CaptureRegistry::new();
        let err = FrameSource::open(registry, quick_settings(&["v4l2"]))
            .err()
            .expect("no backends registered");
        match err {
            CaptureError::DeviceUnavailable { attempts } => {
                assert_eq!(attempts.len(), 4);
                assert!(attempts[0].starts_with("v4l2 device 0"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn reconnect_replaces_handle_and_counts() -> Result<(), CaptureError> {
        let mut registry = CaptureRegistry::new();
        registry.register(SyntheticBackend::new(4, 4));
        let mut source = FrameSource::open(registry, quick_settings(&["synthetic"]))?;

        source.read()?;
        source.reconnect()?;
        let frame = source.read()?;

        // A fresh device restarts its sequence.
        assert_eq!(frame.sequence, 1);
        let stats = source.stats();
        assert_eq!(stats.frames_read, 2);
        assert_eq!(stats.reconnects, 1);
        assert_eq!(stats.active, Some(CaptureCandidate::new("any", 0)));
        Ok(())
    }

    #[test]
    fn failed_reconnect_is_read_failure() -> Result<(), CaptureError> {
        let mut registry = CaptureRegistry::new();
        registry.register(SyntheticBackend::new(4, 4).with_unavailable_index(2));
        let mut settings = quick_settings(&["synthetic"]);
        settings.device_index = 2;
        settings.index_sweep = 1;
        let mut source = FrameSource::open(registry, settings)?;

        match source.reconnect() {
            Err(CaptureError::ReadFailure(reason)) => {
                assert!(reason.contains("any device 2"), "{}", reason);
            }
            other => panic!("unexpected reconnect result {:?}", other.map(|_| ())),
        }
        assert!(!source.is_connected());
        Ok(())
    }

    #[test]
    fn read_without_device_is_read_failure() -> Result<(), CaptureError> {
        let mut registry = CaptureRegistry::new();
        registry.register(SyntheticBackend::new(4, 4));
        let mut source = FrameSource::open(registry, quick_settings(&["synthetic"]))?;
        source.release();
        assert!(!source.is_connected());
        assert!(matches!(source.read(), Err(CaptureError::ReadFailure(_))));
        Ok(())
    }
}

use std::collections::BTreeSet;

use crate::detect::Detection;

/// Vehicle classes alerted on by default.
pub const DEFAULT_TARGETS: [&str; 4] = ["car", "bus", "truck", "motorcycle"];

/// Fixed set of alert-worthy labels. Immutable after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetClassSet {
    labels: BTreeSet<String>,
}

impl TargetClassSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// First detection whose label is a target. Confidence and count play no part.
    pub fn first_match<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        detections.iter().find(|d| self.contains(&d.label))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for TargetClassSet {
    fn default() -> Self {
        Self::new(DEFAULT_TARGETS)
    }
}

/// Cooldown bookkeeping. Timestamps are seconds on the loop clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlertState {
    pub last_alert_timestamp: f64,
    pub cooldown_seconds: f64,
}

/// Decides whether a set of detections warrants an alert right now.
///
/// At most one alert fires per `cooldown_seconds`: `should_fire` requires
/// strictly more than the cooldown to have passed since the last recorded
/// fire, and `record_fire` must be called exactly once per alert dispatched.
#[derive(Clone, Debug)]
pub struct AlertGate {
    targets: TargetClassSet,
    state: AlertState,
}

impl AlertGate {
    /// New gate that has never fired (`last_alert_timestamp = 0`).
    pub fn new(targets: TargetClassSet, cooldown_seconds: f64) -> Self {
        Self {
            targets,
            state: AlertState {
                last_alert_timestamp: 0.0,
                cooldown_seconds,
            },
        }
    }

    /// Start from a known last-alert time.
    pub fn with_last_alert(mut self, timestamp: f64) -> Self {
        self.state.last_alert_timestamp = timestamp;
        self
    }

    pub fn targets(&self) -> &TargetClassSet {
        &self.targets
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn cooldown_elapsed(&self, now: f64) -> bool {
        now - self.state.last_alert_timestamp > self.state.cooldown_seconds
    }

    /// The detection that would trigger an alert at `now`, if any.
    pub fn trigger<'a>(&self, detections: &'a [Detection], now: f64) -> Option<&'a Detection> {
        let matched = self.targets.first_match(detections)?;
        self.cooldown_elapsed(now).then_some(matched)
    }

    /// True iff a target is present and the cooldown has elapsed.
    pub fn should_fire(&self, detections: &[Detection], now: f64) -> bool {
        self.trigger(detections, now).is_some()
    }

    /// Record a dispatched alert at `now`.
    ///
    /// `last_alert_timestamp` never moves backwards; a clock that steps back
    /// leaves the previous value in place.
    pub fn record_fire(&mut self, now: f64) {
        if now >= self.state.last_alert_timestamp {
            self.state.last_alert_timestamp = now;
        } else {
            log::warn!(
                "clock went backwards ({:.3} < {:.3}); keeping last alert time",
                now,
                self.state.last_alert_timestamp
            );
        }
    }
}

//! Detection-to-alert loop.
//!
//! Each iteration runs to completion before the next begins:
//! read frame -> detect -> gate -> dispatch -> check quit.
//!
//! States: `Running`, `ReconnectingCamera`, `Terminated`. A failed read moves
//! to `ReconnectingCamera`; one reconnect attempt either resumes `Running` or
//! terminates with `CameraLost`. A quit request observed after a frame
//! terminates with `Quit`. Every path into `Terminated` releases the camera
//! and tears down audio.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::alert::{AlertGate, AlertOutcome, AlertSink};
use crate::detect::{Detection, Detector};
use crate::frame::Frame;
use crate::ingest::FrameSource;

/// Time source for the alert gate, in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall-clock seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Polled once per iteration.
pub trait QuitSignal {
    fn requested(&self) -> bool;
}

/// Shared quit flag set by Ctrl-C or a `q` line on stdin.
#[derive(Clone, Debug, Default)]
pub struct QuitFlag {
    flag: Arc<AtomicBool>,
}

impl QuitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Set the flag on Ctrl-C.
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            log::info!("interrupt received");
            flag.request();
        })
        .context("error setting Ctrl-C handler")
    }

    /// Set the flag when stdin yields a `q` line.
    pub fn watch_stdin(&self) {
        let flag = self.clone();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                        flag.request();
                        return;
                    }
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
        });
    }
}

impl QuitSignal for QuitFlag {
    fn requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Quit signal observed.
    Quit,
    /// Frame read failed and the single reconnect attempt failed too.
    CameraLost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ReconnectingCamera,
    Terminated(Termination),
}

/// Summary returned when the loop terminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopReport {
    pub termination: Termination,
    pub frames: u64,
    pub alerts: u64,
    pub reconnects: u64,
    pub read_failures: u64,
    pub detect_errors: u64,
}

/// Components the loop drives. Constructed once at startup and borrowed for the run.
pub struct LoopContext<'a> {
    pub source: &'a mut FrameSource,
    pub detector: &'a mut Detector,
    pub gate: &'a mut AlertGate,
    pub sink: &'a mut AlertSink,
    pub quit: &'a dyn QuitSignal,
    pub clock: &'a dyn Clock,
}

pub struct MainLoop<'a> {
    ctx: LoopContext<'a>,
    state: LoopState,
    frames: u64,
    alerts: u64,
    reconnects: u64,
    read_failures: u64,
    detect_errors: u64,
}

impl<'a> MainLoop<'a> {
    pub fn new(ctx: LoopContext<'a>) -> Self {
        Self {
            ctx,
            state: LoopState::Running,
            frames: 0,
            alerts: 0,
            reconnects: 0,
            read_failures: 0,
            detect_errors: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Advance the state machine by one step and return the new state.
    pub fn step(&mut self) -> LoopState {
        self.state = match self.state {
            LoopState::Running => self.run_iteration(),
            LoopState::ReconnectingCamera => self.reconnect(),
            terminated @ LoopState::Terminated(_) => terminated,
        };
        self.state
    }

    /// Step until terminated.
    pub fn run(mut self) -> LoopReport {
        log::info!("system ready. press 'q' + Enter or Ctrl-C to exit");
        loop {
            if let LoopState::Terminated(termination) = self.step() {
                return self.report(termination);
            }
        }
    }

    pub fn report(&self, termination: Termination) -> LoopReport {
        LoopReport {
            termination,
            frames: self.frames,
            alerts: self.alerts,
            reconnects: self.reconnects,
            read_failures: self.read_failures,
            detect_errors: self.detect_errors,
        }
    }

    fn run_iteration(&mut self) -> LoopState {
        let frame = match self.ctx.source.read() {
            Ok(frame) => frame,
            Err(err) => {
                self.read_failures += 1;
                log::warn!("{}; retrying", err);
                return LoopState::ReconnectingCamera;
            }
        };

        self.frames += 1;
        self.process(&frame);
        drop(frame);

        if self.frames % 300 == 0 {
            let stats = self.ctx.source.stats();
            log::debug!(
                "frames={} alerts={} reconnects={} active={:?}",
                self.frames,
                self.alerts,
                stats.reconnects,
                stats.active
            );
        }

        if self.ctx.quit.requested() {
            log::info!("exiting...");
            return self.terminate(Termination::Quit);
        }
        LoopState::Running
    }

    fn process(&mut self, frame: &Frame) {
        let detections = match self.ctx.detector.detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                self.detect_errors += 1;
                log::warn!("detection failed on frame {}: {:#}", frame.sequence, err);
                Vec::new()
            }
        };

        let now = self.ctx.clock.now();
        let Some(trigger) = self.ctx.gate.trigger(&detections, now) else {
            return;
        };
        log_trigger(trigger);
        self.ctx.gate.record_fire(now);
        self.alerts += 1;

        match self.ctx.sink.fire_alert() {
            AlertOutcome::Played => log::debug!("alert sound started"),
            AlertOutcome::Skipped(reason) => log::debug!("alert sound skipped: {:?}", reason),
            AlertOutcome::Failed(err) => log::debug!("alert sound failed: {}", err),
        }
    }

    fn reconnect(&mut self) -> LoopState {
        match self.ctx.source.reconnect() {
            Ok(()) => {
                self.reconnects += 1;
                LoopState::Running
            }
            Err(err) => {
                log::error!("cannot reinitialize camera, exiting: {}", err);
                self.terminate(Termination::CameraLost)
            }
        }
    }

    fn terminate(&mut self, termination: Termination) -> LoopState {
        self.ctx.source.release();
        self.ctx.sink.shutdown();
        LoopState::Terminated(termination)
    }
}

fn log_trigger(trigger: &Detection) {
    log::warn!(
        "{} detected (confidence {:.2})! alerting",
        trigger.label,
        trigger.confidence
    );
}

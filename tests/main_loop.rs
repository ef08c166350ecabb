use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;

use vehicle_alert::alert::{AudioBackend, SilentPlayer};
use vehicle_alert::ingest::{CaptureBackend, CaptureDevice, CaptureProperty};
use vehicle_alert::runtime::{Clock, QuitSignal};
use vehicle_alert::{
    AlertGate, AlertSink, BoundingBox, CaptureError, CaptureRegistry, CaptureSettings, Detector,
    Frame, FrameSource, LoopContext, LoopState, MainLoop, Model, PlaybackError, RawDetection,
    TargetClassSet, Termination,
};

/// Scripted read results shared by every device a backend opens.
#[derive(Default)]
struct Script {
    reads: VecDeque<bool>,
    opens: u32,
    releases: u32,
    /// Number of opens that succeed; later opens fail.
    open_budget: Option<u32>,
}

struct ScriptedBackend {
    script: Rc<RefCell<Script>>,
}

struct ScriptedDevice {
    script: Rc<RefCell<Script>>,
    sequence: u64,
}

impl CaptureBackend for ScriptedBackend {
    fn id(&self) -> &str {
        "scripted"
    }

    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let mut script = self.script.borrow_mut();
        if script.open_budget.is_some_and(|budget| script.opens >= budget) {
            return Err(CaptureError::OpenFailed {
                backend: "scripted".to_string(),
                index,
                reason: "unplugged".to_string(),
            });
        }
        script.opens += 1;
        Ok(Box::new(ScriptedDevice {
            script: self.script.clone(),
            sequence: 0,
        }))
    }
}

impl CaptureDevice for ScriptedDevice {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let ok = self.script.borrow_mut().reads.pop_front().unwrap_or(true);
        if !ok {
            return Err(CaptureError::ReadFailure("device stalled".to_string()));
        }
        self.sequence += 1;
        Ok(Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, self.sequence))
    }

    fn set_property(&mut self, _property: CaptureProperty) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release(&mut self) {
        self.script.borrow_mut().releases += 1;
    }
}

/// Reports a car on every frame.
struct AlwaysCar;

impl Model for AlwaysCar {
    fn name(&self) -> &str {
        "always-car"
    }

    fn infer(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
        Ok(vec![RawDetection {
            bbox: BoundingBox::new(0.0, 0.0, 2.0, 2.0),
            confidence: 0.9,
            class_index: 0,
        }])
    }

    fn label_for(&self, class_index: usize) -> Option<&str> {
        (class_index == 0).then_some("car")
    }
}

/// Clock advancing one second per call.
struct SteppingClock(Cell<f64>);

impl Clock for SteppingClock {
    fn now(&self) -> f64 {
        let now = self.0.get() + 1.0;
        self.0.set(now);
        now
    }
}

/// Quit after `n` polls.
struct QuitAfter(Cell<u32>);

impl QuitSignal for QuitAfter {
    fn requested(&self) -> bool {
        let left = self.0.get();
        if left == 0 {
            return true;
        }
        self.0.set(left - 1);
        false
    }
}

#[derive(Default)]
struct AudioCalls {
    plays: u32,
    quits: u32,
}

struct CountingPlayer(Rc<RefCell<AudioCalls>>);

impl AudioBackend for CountingPlayer {
    fn name(&self) -> &str {
        "counting"
    }

    fn init(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn load(&mut self, _asset: &Path) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.0.borrow_mut().plays += 1;
        Ok(())
    }

    fn quit(&mut self) {
        self.0.borrow_mut().quits += 1;
    }
}

fn open_source(script: &Rc<RefCell<Script>>) -> FrameSource {
    let mut registry = CaptureRegistry::new();
    registry.register(ScriptedBackend {
        script: script.clone(),
    });
    let settings = CaptureSettings {
        backends: vec!["scripted".to_string()],
        reconnect_pause: Duration::ZERO,
        ..CaptureSettings::default()
    };
    FrameSource::open(registry, settings).expect("scripted camera opens")
}

#[test]
fn read_failure_then_reconnect_resumes_running() {
    let script = Rc::new(RefCell::new(Script::default()));
    // Probe succeeds, two frames, one failure, then frames again.
    script.borrow_mut().reads = VecDeque::from(vec![true, true, true, false]);
    let mut source = open_source(&script);
    let mut detector = Detector::new(AlwaysCar);
    let mut gate = AlertGate::new(TargetClassSet::default(), 5.0);
    let mut sink = AlertSink::visual_only();
    let quit = QuitAfter(Cell::new(u32::MAX));
    let clock = SteppingClock(Cell::new(100.0));

    let mut main_loop = MainLoop::new(LoopContext {
        source: &mut source,
        detector: &mut detector,
        gate: &mut gate,
        sink: &mut sink,
        quit: &quit,
        clock: &clock,
    });

    assert_eq!(main_loop.state(), LoopState::Running);
    assert_eq!(main_loop.step(), LoopState::Running);
    assert_eq!(main_loop.step(), LoopState::Running);
    assert_eq!(main_loop.step(), LoopState::ReconnectingCamera);
    assert_eq!(main_loop.step(), LoopState::Running);
    assert_eq!(main_loop.step(), LoopState::Running);

    let report = main_loop.report(Termination::Quit);
    assert_eq!(report.frames, 3, "only the failed read is lost");
    assert_eq!(report.read_failures, 1);
    assert_eq!(report.reconnects, 1);
    drop(main_loop);

    let script = script.borrow();
    assert_eq!(script.opens, 2);
    assert_eq!(script.releases, 1, "failed device released before reconnect");
}

#[test]
fn failed_reconnect_terminates_and_releases_everything() {
    let script = Rc::new(RefCell::new(Script {
        reads: VecDeque::from(vec![true, false]),
        open_budget: Some(1),
        ..Script::default()
    }));
    let mut source = open_source(&script);
    let mut detector = Detector::new(AlwaysCar);
    let mut gate = AlertGate::new(TargetClassSet::default(), 5.0);
    let audio = Rc::new(RefCell::new(AudioCalls::default()));
    let mut sink = AlertSink::with_audio(CountingPlayer(audio.clone()), "buzzer.wav".into());
    let quit = QuitAfter(Cell::new(u32::MAX));
    let clock = SteppingClock(Cell::new(0.0));

    let report = MainLoop::new(LoopContext {
        source: &mut source,
        detector: &mut detector,
        gate: &mut gate,
        sink: &mut sink,
        quit: &quit,
        clock: &clock,
    })
    .run();

    assert_eq!(report.termination, Termination::CameraLost);
    assert_eq!(report.frames, 0);
    assert_eq!(report.read_failures, 1);
    assert!(!source.is_connected());
    assert!(!sink.has_audio());
    assert_eq!(audio.borrow().quits, 1);
    assert_eq!(script.borrow().releases, 1);
}

#[test]
fn quit_signal_terminates_after_current_frame() {
    let script = Rc::new(RefCell::new(Script::default()));
    let mut source = open_source(&script);
    let mut detector = Detector::new(AlwaysCar);
    let mut gate = AlertGate::new(TargetClassSet::default(), 5.0);
    let audio = Rc::new(RefCell::new(AudioCalls::default()));
    let mut sink = AlertSink::with_audio(CountingPlayer(audio.clone()), "buzzer.wav".into());
    let quit = QuitAfter(Cell::new(11));
    let clock = SteppingClock(Cell::new(100.0));

    let report = MainLoop::new(LoopContext {
        source: &mut source,
        detector: &mut detector,
        gate: &mut gate,
        sink: &mut sink,
        quit: &quit,
        clock: &clock,
    })
    .run();

    assert_eq!(report.termination, Termination::Quit);
    assert_eq!(report.frames, 12);
    // Clock reads 101..=112 with a car every frame and a 5s cooldown.
    assert_eq!(report.alerts, 2);
    assert_eq!(audio.borrow().plays, 2);
    assert_eq!(audio.borrow().quits, 1);
    assert_eq!(gate.state().last_alert_timestamp, 107.0);
    assert!(!source.is_connected());
}

#[test]
fn model_error_is_absorbed() {
    struct Broken;

    impl Model for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn infer(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
            Err(anyhow::anyhow!("tensor shape mismatch"))
        }

        fn label_for(&self, _class_index: usize) -> Option<&str> {
            None
        }
    }

    let script = Rc::new(RefCell::new(Script::default()));
    let mut source = open_source(&script);
    let mut detector = Detector::new(Broken);
    let mut gate = AlertGate::new(TargetClassSet::default(), 5.0);
    let mut sink = AlertSink::with_audio(SilentPlayer::new(), "buzzer.wav".into());
    let quit = QuitAfter(Cell::new(2));
    let clock = SteppingClock(Cell::new(100.0));

    let report = MainLoop::new(LoopContext {
        source: &mut source,
        detector: &mut detector,
        gate: &mut gate,
        sink: &mut sink,
        quit: &quit,
        clock: &clock,
    })
    .run();

    assert_eq!(report.termination, Termination::Quit);
    assert_eq!(report.frames, 3);
    assert_eq!(report.detect_errors, 3);
    assert_eq!(report.alerts, 0);
    assert_eq!(sink.alerts_dispatched(), 0);
}

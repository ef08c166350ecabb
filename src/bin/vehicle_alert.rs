//! vehicle_alert - camera vehicle detector with a cooldown-gated buzzer
//!
//! This binary:
//! 1. Loads the detection model
//! 2. Locates the alert sound (CLI override or search)
//! 3. Opens the camera, falling back across backends and device indices
//! 4. Runs the detection-to-alert loop until quit or camera loss

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use vehicle_alert::alert::{resolve_audio_asset, AssetSearch, CommandPlayer};
use vehicle_alert::config::{ModelSettings, MODEL_BACKEND_STUB};
use vehicle_alert::detect::StubModel;
use vehicle_alert::ingest::SyntheticBackend;
use vehicle_alert::runtime::{QuitFlag, SystemClock};
use vehicle_alert::ui::{Ui, UiMode};
use vehicle_alert::{
    AlertGate, AlertSink, AppConfig, CaptureRegistry, Detector, FrameSource, LoopContext,
    MainLoop, TargetClassSet, Termination,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Custom alert sound (mp3, wav, ogg or m4a).
    audio_file: Option<PathBuf>,
    /// Startup progress display.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    ui: UiMode,
    /// Use the synthetic camera and stub model (dry run, no hardware).
    #[arg(long, env = "VEHICLE_ALERT_SYNTHETIC")]
    synthetic: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = AppConfig::load()?;
    let ui = Ui::new(args.ui, std::io::stderr().is_terminal());

    let mut detector = {
        let _stage = ui.stage("loading model");
        build_detector(&cfg.model, &cfg.targets, args.synthetic)?
    };
    log::info!("model ready: {}", detector.model_name());

    let mut sink = {
        let _stage = ui.stage("locating alert sound");
        let search = match &cfg.audio.search_locations {
            Some(locations) => AssetSearch::new(locations.clone()),
            None => AssetSearch::default_locations(),
        };
        let asset = resolve_audio_asset(args.audio_file.as_deref(), &search);
        AlertSink::for_asset(CommandPlayer::new(), asset)
    };

    let mut source = {
        let stage = ui.stage("opening camera");
        let mut camera = cfg.camera.clone();
        let registry = build_registry(&mut camera, args.synthetic);
        match FrameSource::open(registry, camera) {
            Ok(source) => source,
            Err(err) => {
                stage.fail();
                print_camera_tips();
                return Err(anyhow!(err));
            }
        }
    };

    let mut gate = AlertGate::new(TargetClassSet::new(cfg.targets.iter()), cfg.cooldown_secs);
    log::info!(
        "alerting on [{}] with {:.1}s cooldown",
        cfg.targets.join(", "),
        cfg.cooldown_secs
    );

    let quit = QuitFlag::new();
    quit.install_ctrlc()?;
    quit.watch_stdin();
    let clock = SystemClock;

    let report = MainLoop::new(LoopContext {
        source: &mut source,
        detector: &mut detector,
        gate: &mut gate,
        sink: &mut sink,
        quit: &quit,
        clock: &clock,
    })
    .run();

    log::info!(
        "stopped: {:?} frames={} alerts={} reconnects={} read_failures={} detect_errors={}",
        report.termination,
        report.frames,
        report.alerts,
        report.reconnects,
        report.read_failures,
        report.detect_errors
    );

    match report.termination {
        Termination::Quit => Ok(()),
        Termination::CameraLost => Err(anyhow!("camera lost and could not be reinitialized")),
    }
}

fn build_detector(model: &ModelSettings, targets: &[String], synthetic: bool) -> Result<Detector> {
    if model.backend_for(synthetic) == MODEL_BACKEND_STUB {
        log::warn!("using stub model: detections are simulated, not real");
        let label = targets.first().map(String::as_str).unwrap_or("car");
        return Ok(Detector::new(StubModel::new(label)));
    }
    load_tract(model)
}

#[cfg(feature = "backend-tract")]
fn load_tract(model: &ModelSettings) -> Result<Detector> {
    let loaded = vehicle_alert::detect::TractModel::load(
        &model.name,
        &model.path,
        model.input_width,
        model.input_height,
    )?
    .with_thresholds(model.confidence_threshold, model.iou_threshold);
    let mut detector = Detector::new(loaded);
    detector.warm_up()?;
    Ok(detector)
}

#[cfg(not(feature = "backend-tract"))]
fn load_tract(_model: &ModelSettings) -> Result<Detector> {
    Err(anyhow!(
        "tract backend not compiled in; rebuild with --features backend-tract, \
         or set VEHICLE_ALERT_MODEL_BACKEND=stub for simulated detections"
    ))
}

fn build_registry(camera: &mut vehicle_alert::CaptureSettings, synthetic: bool) -> CaptureRegistry {
    let mut registry = CaptureRegistry::new();
    if synthetic {
        registry.register(SyntheticBackend::new(camera.width, camera.height));
        camera.backends = vec![vehicle_alert::ingest::synthetic::SYNTHETIC_BACKEND.to_string()];
        return registry;
    }
    #[cfg(feature = "ingest-v4l2")]
    registry.register(vehicle_alert::ingest::V4l2Backend::new());
    if registry.is_empty() {
        log::warn!("no camera backends compiled in (enable the ingest-v4l2 feature)");
    }
    registry
}

fn print_camera_tips() {
    eprintln!("Error: cannot access any webcam");
    eprintln!("Troubleshooting tips:");
    eprintln!("  - Make sure the camera isn't being used by another application");
    eprintln!("  - Check that the camera is properly connected");
    eprintln!("  - Check that your user may open /dev/video* (e.g. the 'video' group)");
    eprintln!("  - Check the operating system's camera privacy settings");
}

//! Audio playback backends.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::error::PlaybackError;

/// Audio subsystem seam: init once, load and play per alert, quit on teardown.
pub trait AudioBackend {
    fn name(&self) -> &str;

    fn init(&mut self) -> Result<(), PlaybackError>;

    /// Load `asset`, replacing whatever was loaded before.
    fn load(&mut self, asset: &Path) -> Result<(), PlaybackError>;

    /// Start playing the loaded asset without blocking.
    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Stop playback and tear down. Must be idempotent.
    fn quit(&mut self);
}

/// Known command-line players, tried in order.
const PLAYERS: &[(&str, &[&str])] = &[
    ("afplay", &[]),
    ("paplay", &[]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("mpg123", &["-q"]),
    ("aplay", &["-q"]),
];

/// Plays clips through the first system audio player found on `PATH`.
///
/// Each `play` spawns the player in the background; a clip still playing
/// from the previous alert is stopped first.
#[derive(Debug, Default)]
pub struct CommandPlayer {
    program: Option<(PathBuf, &'static [&'static str])>,
    asset: Option<PathBuf>,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific player program instead of searching `PATH`.
    pub fn with_program(program: PathBuf) -> Self {
        Self {
            program: Some((program, &[])),
            asset: None,
            child: None,
        }
    }

    fn stop_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if matches!(child.try_wait(), Ok(None)) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl AudioBackend for CommandPlayer {
    fn name(&self) -> &str {
        "command"
    }

    fn init(&mut self) -> Result<(), PlaybackError> {
        if self.program.is_some() {
            return Ok(());
        }
        let found = PLAYERS
            .iter()
            .find_map(|(program, args)| which::which(program).ok().map(|path| (path, *args)));
        match found {
            Some((path, args)) => {
                log::info!("CommandPlayer: using {}", path.display());
                self.program = Some((path, args));
                Ok(())
            }
            None => Err(PlaybackError::Init(
                "no audio player found on PATH (tried afplay, paplay, ffplay, mpg123, aplay)"
                    .to_string(),
            )),
        }
    }

    fn load(&mut self, asset: &Path) -> Result<(), PlaybackError> {
        std::fs::File::open(asset).map_err(|err| PlaybackError::Load {
            path: asset.to_path_buf(),
            reason: err.to_string(),
        })?;
        self.asset = Some(asset.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let (program, args) = self
            .program
            .as_ref()
            .ok_or_else(|| PlaybackError::Play("audio not initialized".to_string()))?;
        let asset = self
            .asset
            .as_ref()
            .ok_or_else(|| PlaybackError::Play("no asset loaded".to_string()))?;

        let child = Command::new(program)
            .args(args.iter())
            .arg(asset)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| PlaybackError::Play(format!("{}: {}", program.display(), err)))?;

        self.stop_child();
        self.child = Some(child);
        Ok(())
    }

    fn quit(&mut self) {
        self.stop_child();
        self.asset = None;
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.stop_child();
    }
}

/// Accepts every call and plays nothing.
#[derive(Debug, Default)]
pub struct SilentPlayer {
    loaded: Option<PathBuf>,
    plays: u64,
}

impl SilentPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn plays(&self) -> u64 {
        self.plays
    }
}

impl AudioBackend for SilentPlayer {
    fn name(&self) -> &str {
        "silent"
    }

    fn init(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn load(&mut self, asset: &Path) -> Result<(), PlaybackError> {
        self.loaded = Some(asset.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.loaded.is_none() {
            return Err(PlaybackError::Play("no asset loaded".to_string()));
        }
        self.plays += 1;
        Ok(())
    }

    fn quit(&mut self) {
        self.loaded = None;
    }
}

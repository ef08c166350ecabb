//! Alert sound discovery.
//!
//! Resolution order:
//! 1. The command-line override, if it exists and has an audio extension.
//! 2. A preferred name (`buzzer`, `alarm`, ...) in any search location.
//! 3. Any audio file in any search location.
//!
//! Nothing found means visual-only alerting, never a startup failure.

use std::path::{Path, PathBuf};

use crate::error::AssetError;

pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "m4a"];

pub const PREFERRED_NAMES: [&str; 6] = ["buzzer", "alarm", "alert", "beep", "notification", "sound"];

/// Ordered directories searched for an alert sound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetSearch {
    pub locations: Vec<PathBuf>,
}

impl AssetSearch {
    pub fn new(locations: Vec<PathBuf>) -> Self {
        Self { locations }
    }

    /// Current directory, then the user's Downloads, Music, Desktop and Documents folders.
    pub fn default_locations() -> Self {
        let mut locations = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            locations.push(cwd);
        }
        let home = dirs::home_dir();
        let user_dirs: [(fn() -> Option<PathBuf>, &str); 4] = [
            (dirs::download_dir, "Downloads"),
            (dirs::audio_dir, "Music"),
            (dirs::desktop_dir, "Desktop"),
            (dirs::document_dir, "Documents"),
        ];
        for (lookup, fallback) in user_dirs {
            if let Some(dir) = lookup().or_else(|| home.as_ref().map(|home| home.join(fallback))) {
                locations.push(dir);
            }
        }
        Self { locations }
    }

    /// Search all locations: preferred names first, then any audio file.
    pub fn find(&self) -> Option<PathBuf> {
        self.find_preferred().or_else(|| self.find_any())
    }

    fn existing_locations(&self) -> impl Iterator<Item = &PathBuf> {
        self.locations.iter().filter(|location| location.is_dir())
    }

    fn find_preferred(&self) -> Option<PathBuf> {
        for location in self.existing_locations() {
            for extension in AUDIO_EXTENSIONS {
                for name in PREFERRED_NAMES {
                    let candidate = location.join(format!("{}.{}", name, extension));
                    if candidate.is_file() {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    fn find_any(&self) -> Option<PathBuf> {
        for location in self.existing_locations() {
            let Ok(entries) = std::fs::read_dir(location) else {
                log::debug!("cannot list {}", location.display());
                continue;
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file())
                .collect();
            files.sort();
            for extension in AUDIO_EXTENSIONS {
                let found = files
                    .iter()
                    .find(|path| path.extension().is_some_and(|ext| ext == extension));
                if let Some(found) = found {
                    return Some(found.clone());
                }
            }
        }
        None
    }
}

/// True when the file name ends in a supported audio extension (any case).
pub fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Accept a user-supplied path only if it exists and looks like audio.
pub fn validate_override(path: &Path) -> Result<PathBuf, AssetError> {
    if path.is_file() && has_audio_extension(path) {
        Ok(path.to_path_buf())
    } else {
        Err(AssetError::AssetNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Resolve the alert sound from an optional override and a search.
pub fn resolve_audio_asset(custom: Option<&Path>, search: &AssetSearch) -> Option<PathBuf> {
    if let Some(custom) = custom {
        match validate_override(custom) {
            Ok(path) => {
                log::info!("using custom audio file: {}", path.display());
                return Some(path);
            }
            Err(err) => log::warn!("{}", err),
        }
    }

    log::info!("searching for audio files...");
    let found = search.find();
    match &found {
        Some(path) => log::info!("found audio file: {}", path.display()),
        None => log::warn!("no audio file found"),
    }
    found
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"RIFF").expect("write audio fixture");
        path
    }

    #[test]
    fn valid_override_wins() {
        let dir = TempDir::new().expect("tempdir");
        let custom = touch(dir.path(), "Siren.MP3");
        touch(dir.path(), "buzzer.wav");

        let search = AssetSearch::new(vec![dir.path().to_path_buf()]);
        assert_eq!(resolve_audio_asset(Some(custom.as_path()), &search), Some(custom));
    }

    #[test]
    fn invalid_override_falls_back_to_search() {
        let dir = TempDir::new().expect("tempdir");
        let not_audio = touch(dir.path(), "notes.txt");
        let buzzer = touch(dir.path(), "buzzer.ogg");

        assert_eq!(
            validate_override(&not_audio),
            Err(AssetError::AssetNotFound {
                path: not_audio.clone()
            })
        );
        assert!(validate_override(&dir.path().join("missing.wav")).is_err());

        let search = AssetSearch::new(vec![dir.path().to_path_buf()]);
        assert_eq!(resolve_audio_asset(Some(not_audio.as_path()), &search), Some(buzzer));
    }

    #[test]
    fn preferred_names_beat_earlier_generic_files() {
        let first = TempDir::new().expect("tempdir");
        let second = TempDir::new().expect("tempdir");
        touch(first.path(), "aaa.mp3");
        let alarm = touch(second.path(), "alarm.wav");

        let search = AssetSearch::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(search.find(), Some(alarm));
    }

    #[test]
    fn preferred_pass_orders_by_extension_then_name() {
        let dir = TempDir::new().expect("tempdir");
        touch(dir.path(), "beep.wav");
        let sound_mp3 = touch(dir.path(), "sound.mp3");

        let search = AssetSearch::new(vec![dir.path().to_path_buf()]);
        assert_eq!(search.find(), Some(sound_mp3));
    }

    #[test]
    fn any_audio_file_is_last_resort() {
        let empty = TempDir::new().expect("tempdir");
        let music = TempDir::new().expect("tempdir");
        touch(music.path(), "readme.md");
        touch(music.path(), "zeta.wav");
        let track = touch(music.path(), "track.mp3");

        let search = AssetSearch::new(vec![
            empty.path().join("missing"),
            empty.path().to_path_buf(),
            music.path().to_path_buf(),
        ]);
        assert_eq!(search.find(), Some(track));
    }

    #[test]
    fn default_locations_cover_user_folders() {
        let search = AssetSearch::default_locations();
        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(search.locations.first(), Some(&cwd));

        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(search.locations.len(), 5);
        let music = dirs::audio_dir().unwrap_or_else(|| home.join("Music"));
        assert_eq!(search.locations[2], music);
    }

    #[test]
    fn nothing_found_is_none() {
        let empty = TempDir::new().expect("tempdir");
        let search = AssetSearch::new(vec![empty.path().to_path_buf()]);
        assert_eq!(resolve_audio_asset(None, &search), None);
    }
}

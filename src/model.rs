use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// A playable item, identified by its path or URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Track {
    uri: String,
}

impl Track {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.uri)
    }

    /// File stem of the URI, or the whole URI when it has none.
    pub fn title(&self) -> &str {
        Path::new(&self.uri)
            .file_stem()
            .and_then(OsStr::to_str)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.uri)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No backend session yet.
    #[default]
    Idle,
    Ready,
    Loading,
    Playing,
    Paused,
    Stopped,
    /// Natural end of a track; only observed while the repeat policy runs.
    Finished,
    Error,
}

impl PlaybackState {
    /// States in which the controller holds a loaded backend resource.
    pub fn holds_resource(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Playing | Self::Paused | Self::Finished
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
}

impl PlaybackPosition {
    /// Builds a position with `position_ms` capped at a known duration.
    pub fn clamped(position_ms: u64, duration_ms: Option<u64>) -> Self {
        let position_ms = duration_ms.map_or(position_ms, |duration| position_ms.min(duration));
        Self {
            position_ms,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub playlist_directory: Option<PathBuf>,
    #[serde(default)]
    pub last_directory: Option<PathBuf>,
}

fn default_volume() -> f32 {
    1.0
}

impl Settings {
    pub fn set_default_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.default_volume = volume.clamp(0.0, 1.0);
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            repeat_mode: RepeatMode::Off,
            shuffle: false,
            playlist_directory: None,
            last_directory: None,
        }
    }
}

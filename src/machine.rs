//! Playback state machine.
//!
//! The machine never talks to a backend itself. Each input returns at most one
//! [`Effect`] which the transport loop performs, and every backend request is
//! tagged with a [`Generation`] so that notices from superseded requests can be
//! dropped.

use crate::error::PlayerError;
use crate::model::{Direction, PlaybackState, RepeatMode, Track};
use crate::playlist::Playlist;

pub type Generation = u64;

/// Caller commands that drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Skip(Direction),
}

/// Asynchronous outcomes reported by a backend for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Loaded,
    Finished,
    Error(String),
}

/// The backend action requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the active resource with `track`.
    Load { track: Track, generation: Generation },
    /// Start or resume the active resource.
    Start,
    Pause,
    /// Stop and drop the active resource.
    Release,
}

#[derive(Debug, Default)]
pub struct PlaybackStateMachine {
    state: PlaybackState,
    generation: Generation,
    start_when_loaded: bool,
    /// Track of the most recent load request.
    loading: Option<Track>,
    repeat: RepeatMode,
    error: Option<PlayerError>,
}

impl PlaybackStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub fn last_error(&self) -> Option<&PlayerError> {
        self.error.as_ref()
    }

    pub fn session_opened(&mut self) {
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Error) {
            self.state = PlaybackState::Ready;
            self.error = None;
        }
    }

    pub fn session_failed(&mut self, reason: String) {
        self.state = PlaybackState::Error;
        self.error = Some(PlayerError::SessionInit(reason));
    }

    /// Applies a caller command. Commands that make no sense in the current
    /// state, or on an empty playlist, return `None` and change nothing.
    pub fn apply(&mut self, command: Command, playlist: &mut Playlist) -> Option<Effect> {
        match command {
            Command::Play => self.play(playlist),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Skip(direction) => self.skip(direction, playlist),
        }
    }

    /// Applies a backend notice. Notices from an older generation are ignored.
    pub fn on_backend(
        &mut self,
        generation: Generation,
        event: BackendEvent,
        playlist: &mut Playlist,
    ) -> Option<Effect> {
        if generation != self.generation {
            return None;
        }

        match event {
            BackendEvent::Loaded => {
                if self.state != PlaybackState::Loading {
                    return None;
                }
                if self.start_when_loaded {
                    self.state = PlaybackState::Playing;
                    Some(Effect::Start)
                } else {
                    self.state = PlaybackState::Paused;
                    None
                }
            }
            BackendEvent::Finished => {
                let resume = match self.state {
                    PlaybackState::Playing => true,
                    // Drained right before a pause was handled.
                    PlaybackState::Paused => false,
                    _ => return None,
                };
                self.state = PlaybackState::Finished;
                self.auto_advance(playlist, resume)
            }
            BackendEvent::Error(reason) => {
                if !self.state.holds_resource() {
                    return None;
                }
                let error = if self.state == PlaybackState::Loading {
                    match self.loading.clone() {
                        Some(track) => PlayerError::Load { track, reason },
                        None => PlayerError::Playback(reason),
                    }
                } else {
                    PlayerError::Playback(reason)
                };
                Some(self.fail(error))
            }
        }
    }

    /// The backend refused to load `track`; no resource was created.
    pub fn load_failed(&mut self, track: Track, reason: String) {
        self.generation += 1;
        self.start_when_loaded = false;
        self.state = PlaybackState::Error;
        self.error = Some(PlayerError::Load { track, reason });
    }

    /// A control call on the active resource failed.
    pub fn playback_failed(&mut self, reason: String) -> Effect {
        self.fail(PlayerError::Playback(reason))
    }

    /// A new playlist replaced the old one.
    pub fn playlist_replaced(&mut self) -> Option<Effect> {
        if self.state == PlaybackState::Idle {
            return None;
        }
        let had_resource = self.state.holds_resource();
        self.generation += 1;
        self.start_when_loaded = false;
        self.state = PlaybackState::Ready;
        self.error = None;
        had_resource.then_some(Effect::Release)
    }

    fn play(&mut self, playlist: &Playlist) -> Option<Effect> {
        match self.state {
            PlaybackState::Ready
            | PlaybackState::Stopped
            | PlaybackState::Finished
            | PlaybackState::Error => {
                let track = playlist.current()?.clone();
                self.error = None;
                Some(self.load(track, true))
            }
            PlaybackState::Loading => {
                self.start_when_loaded = true;
                None
            }
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                Some(Effect::Start)
            }
            PlaybackState::Idle | PlaybackState::Playing => None,
        }
    }

    fn pause(&mut self) -> Option<Effect> {
        match self.state {
            PlaybackState::Playing => {
                self.state = PlaybackState::Paused;
                Some(Effect::Pause)
            }
            PlaybackState::Loading => {
                self.start_when_loaded = false;
                None
            }
            _ => None,
        }
    }

    fn stop(&mut self) -> Option<Effect> {
        if self.state.holds_resource() {
            self.generation += 1;
            self.start_when_loaded = false;
            self.state = PlaybackState::Stopped;
            return Some(Effect::Release);
        }
        if self.state == PlaybackState::Error {
            self.error = None;
            self.state = PlaybackState::Stopped;
        }
        None
    }

    fn skip(&mut self, direction: Direction, playlist: &mut Playlist) -> Option<Effect> {
        if self.state == PlaybackState::Idle || playlist.is_empty() {
            return None;
        }

        let resume = self.state == PlaybackState::Playing
            || (self.state == PlaybackState::Loading && self.start_when_loaded);
        let had_resource = self.state.holds_resource();
        playlist.advance(direction);

        if !had_resource {
            if self.state == PlaybackState::Error {
                self.error = None;
                self.state = PlaybackState::Ready;
            }
            return None;
        }

        let track = playlist.current()?.clone();
        Some(self.load(track, resume))
    }

    fn auto_advance(&mut self, playlist: &mut Playlist, resume: bool) -> Option<Effect> {
        match self.repeat {
            RepeatMode::One => {}
            RepeatMode::All => playlist.advance(Direction::Forward),
            RepeatMode::Off => {
                if playlist.is_last_in_order() {
                    self.generation += 1;
                    self.start_when_loaded = false;
                    self.state = PlaybackState::Stopped;
                    return Some(Effect::Release);
                }
                playlist.advance(Direction::Forward);
            }
        }

        match playlist.current() {
            Some(track) => {
                let track = track.clone();
                Some(self.load(track, resume))
            }
            None => {
                self.generation += 1;
                self.state = PlaybackState::Stopped;
                Some(Effect::Release)
            }
        }
    }

    fn load(&mut self, track: Track, start: bool) -> Effect {
        self.generation += 1;
        self.start_when_loaded = start;
        self.state = PlaybackState::Loading;
        self.loading = Some(track.clone());
        Effect::Load {
            track,
            generation: self.generation,
        }
    }

    fn fail(&mut self, error: PlayerError) -> Effect {
        self.generation += 1;
        self.start_when_loaded = false;
        self.state = PlaybackState::Error;
        self.error = Some(error);
        Effect::Release
    }
}

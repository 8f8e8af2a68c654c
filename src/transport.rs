//! Transport controller.
//!
//! A [`TransportController`] owns a worker thread that holds the playlist,
//! the state machine and the audio backend. Caller requests and backend
//! notices are messages on one channel, handled strictly one at a time, so a
//! track-finished notice can never interleave with a user command.

use crate::backend::{AudioBackend, BackendHandle, BackendNotice, BackendNotifier};
use crate::error::{BackendError, PlayerError, Result};
use crate::library;
use crate::machine::{Command, Effect, Generation, PlaybackStateMachine};
use crate::model::{Direction, PlaybackPosition, PlaybackState, RepeatMode, Track};
use crate::playlist::Playlist;
use crossbeam_channel::{Receiver, Sender};
use std::path::Path;
use std::thread::{self, JoinHandle};

#[derive(Debug)]
pub(crate) enum Message {
    Request {
        request: Request,
        reply: Sender<Result<PlayerStatus>>,
    },
    Notice(BackendNotice),
    Shutdown,
}

#[derive(Debug)]
pub(crate) enum Request {
    Initialize,
    LoadPlaylist(Vec<Track>),
    Command(Command),
    SeekTo(i64),
    SetVolume(f32),
    SetRepeatMode(RepeatMode),
    SetShuffleMode(bool),
    Status,
}

/// Snapshot of the player taken after a request was processed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub track: Option<Track>,
    pub position: PlaybackPosition,
    pub index: Option<usize>,
    pub len: usize,
    pub repeat: RepeatMode,
    pub shuffle: bool,
    pub volume: f32,
    pub error: Option<PlayerError>,
}

impl PlayerStatus {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}

struct Player<B> {
    backend: B,
    notifier: BackendNotifier,
    machine: PlaybackStateMachine,
    playlist: Playlist,
    active: Option<BackendHandle>,
    now_playing: Option<Track>,
    session_open: bool,
    shuffle: bool,
    volume: f32,
}

impl<B: AudioBackend> Player<B> {
    fn new(backend: B, notifier: BackendNotifier, playlist: Playlist) -> Self {
        Self {
            backend,
            notifier,
            machine: PlaybackStateMachine::new(),
            playlist,
            active: None,
            now_playing: None,
            session_open: false,
            shuffle: false,
            volume: 1.0,
        }
    }

    fn handle(&mut self, request: Request) -> Result<PlayerStatus> {
        match request {
            Request::Initialize => self.initialize()?,
            Request::LoadPlaylist(tracks) => self.load_playlist(tracks),
            Request::Command(command) => self.command(command),
            Request::SeekTo(position_ms) => self.seek(position_ms),
            Request::SetVolume(volume) => self.set_volume(volume),
            Request::SetRepeatMode(mode) => {
                tracing::debug!(?mode, "repeat mode changed");
                self.machine.set_repeat_mode(mode);
            }
            Request::SetShuffleMode(enabled) => {
                tracing::debug!(enabled, "shuffle changed");
                self.shuffle = enabled;
                self.playlist.set_shuffle(enabled);
            }
            Request::Status => {}
        }
        Ok(self.status())
    }

    fn initialize(&mut self) -> Result<()> {
        if self.session_open {
            tracing::debug!("audio session already open");
            return Ok(());
        }
        match self.backend.open_session(self.notifier.clone()) {
            Ok(()) => {
                tracing::info!("audio session opened");
                self.session_open = true;
                self.machine.session_opened();
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "audio session failed to open");
                let reason = err.reason().to_string();
                self.machine.session_failed(reason.clone());
                Err(PlayerError::SessionInit(reason))
            }
        }
    }

    fn load_playlist(&mut self, tracks: Vec<Track>) {
        tracing::info!(tracks = tracks.len(), shuffle = self.shuffle, "playlist loaded");
        self.playlist.load(tracks, self.shuffle);
        let effect = self.machine.playlist_replaced();
        self.perform(effect);
    }

    fn command(&mut self, command: Command) {
        if !self.session_open {
            tracing::debug!(?command, "ignored before the audio session is open");
            return;
        }
        let before = self.machine.state();
        let cursor = self.playlist.cursor();
        let effect = self.machine.apply(command, &mut self.playlist);
        if effect.is_none() && before == self.machine.state() && cursor == self.playlist.cursor() {
            tracing::debug!(?command, state = ?before, "command ignored");
        }
        self.perform(effect);
    }

    fn on_notice(&mut self, notice: BackendNotice) {
        if notice.generation != self.machine.generation() {
            tracing::debug!(
                generation = notice.generation,
                current = self.machine.generation(),
                event = ?notice.event,
                "stale backend notice dropped"
            );
            return;
        }
        let effect = self
            .machine
            .on_backend(notice.generation, notice.event, &mut self.playlist);
        self.perform(effect);
    }

    fn seek(&mut self, position_ms: i64) {
        let Some(handle) = self.active else {
            return;
        };
        if !matches!(
            self.machine.state(),
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            tracing::debug!(state = ?self.machine.state(), "seek ignored");
            return;
        }
        let mut target = u64::try_from(position_ms).unwrap_or(0);
        if let Some(duration) = self.backend.duration(handle) {
            target = target.min(duration);
        }
        if let Err(err) = self.backend.seek(handle, target) {
            tracing::warn!(error = %err, target, "seek failed");
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            tracing::debug!(volume, "non-finite volume ignored");
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(handle) = self.active {
            if let Err(err) = self.backend.set_volume(handle, self.volume) {
                tracing::warn!(error = %err, "volume change failed");
            }
        }
    }

    /// Runs effects until the machine stops asking for more.
    fn perform(&mut self, mut effect: Option<Effect>) {
        while let Some(next) = effect.take() {
            effect = match next {
                Effect::Load { track, generation } => self.load(track, generation),
                Effect::Start => self.control(|backend, handle| backend.play(handle)),
                Effect::Pause => self.control(|backend, handle| backend.pause(handle)),
                Effect::Release => {
                    self.release();
                    None
                }
            };
        }
    }

    fn load(&mut self, track: Track, generation: Generation) -> Option<Effect> {
        self.release();
        match self.backend.load_track(&track, generation) {
            Ok(handle) => {
                tracing::info!(track = %track, generation, "loading track");
                if let Err(err) = self.backend.set_volume(handle, self.volume) {
                    tracing::warn!(error = %err, "volume change failed");
                }
                self.active = Some(handle);
                self.now_playing = Some(track);
                None
            }
            Err(err) => {
                tracing::warn!(track = %track, error = %err, "track failed to load");
                self.machine.load_failed(track, err.reason().to_string());
                None
            }
        }
    }

    fn control(
        &mut self,
        operation: impl FnOnce(&mut B, BackendHandle) -> std::result::Result<(), BackendError>,
    ) -> Option<Effect> {
        let handle = self.active?;
        match operation(&mut self.backend, handle) {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(error = %err, "backend control failed");
                Some(self.machine.playback_failed(err.reason().to_string()))
            }
        }
    }

    fn release(&mut self) {
        self.now_playing = None;
        if let Some(handle) = self.active.take() {
            if let Err(err) = self.backend.stop(handle) {
                tracing::warn!(error = %err, "failed to release track");
            }
        }
    }

    fn status(&self) -> PlayerStatus {
        let state = self.machine.state();
        let position = match (state, self.active) {
            (PlaybackState::Playing | PlaybackState::Paused, Some(handle)) => {
                PlaybackPosition::clamped(
                    self.backend.position(handle),
                    self.backend.duration(handle),
                )
            }
            _ => PlaybackPosition::default(),
        };
        let track = if state.holds_resource() {
            self.now_playing.clone()
        } else {
            self.playlist.current().cloned()
        };
        PlayerStatus {
            state,
            track,
            position,
            index: self.playlist.cursor(),
            len: self.playlist.len(),
            repeat: self.machine.repeat_mode(),
            shuffle: self.shuffle,
            volume: self.volume,
            error: self.machine.last_error().cloned(),
        }
    }
}

fn run<B: AudioBackend>(mut player: Player<B>, rx: Receiver<Message>) {
    while let Ok(message) = rx.recv() {
        match message {
            Message::Request { request, reply } => {
                let outcome = player.handle(request);
                let _ = reply.send(outcome);
            }
            Message::Notice(notice) => player.on_notice(notice),
            Message::Shutdown => break,
        }
    }
    player.release();
    tracing::debug!("transport loop stopped");
}

/// Handle to a player running on its own thread.
///
/// Every call is processed by the player thread before it returns. Dropping
/// the controller stops playback and joins the thread.
pub struct TransportController {
    tx: Sender<Message>,
    worker: Option<JoinHandle<()>>,
}

impl TransportController {
    /// Starts a player whose backend is built by `factory` on the player
    /// thread, so the backend itself does not need to be `Send`.
    pub fn spawn<B, F>(factory: F) -> Self
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        Self::spawn_with_playlist(factory, Playlist::new())
    }

    /// Same as [`spawn`](Self::spawn) with a deterministic shuffle order.
    pub fn spawn_seeded<B, F>(factory: F, seed: u64) -> Self
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        Self::spawn_with_playlist(factory, Playlist::with_seed(seed))
    }

    fn spawn_with_playlist<B, F>(factory: F, playlist: Playlist) -> Self
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let notifier = BackendNotifier::new(tx.clone());
        let worker = thread::spawn(move || run(Player::new(factory(), notifier, playlist), rx));
        Self {
            tx,
            worker: Some(worker),
        }
    }

    fn request(&self, request: Request) -> Result<PlayerStatus> {
        let (reply, outcome) = crossbeam_channel::bounded(1);
        self.tx
            .send(Message::Request { request, reply })
            .map_err(|_| PlayerError::Disconnected)?;
        outcome.recv().map_err(|_| PlayerError::Disconnected)?
    }

    fn send(&self, request: Request) -> Result<()> {
        self.request(request).map(|_| ())
    }

    /// Opens the audio session. A failure is returned and also retained as
    /// the player's last error.
    pub fn initialize(&self) -> Result<()> {
        self.send(Request::Initialize)
    }

    /// Replaces the playlist, releasing any loaded track. The current shuffle
    /// setting applies to the new list.
    pub fn load_playlist(&self, tracks: Vec<Track>) -> Result<()> {
        self.send(Request::LoadPlaylist(tracks))
    }

    /// Lists the audio files directly inside `dir` and loads them as the
    /// playlist. Returns the number of tracks found.
    pub fn load_directory(&self, dir: &Path) -> anyhow::Result<usize> {
        let tracks = library::list_audio_files(dir)?;
        let count = tracks.len();
        self.load_playlist(tracks)?;
        Ok(count)
    }

    pub fn play(&self) -> Result<()> {
        self.send(Request::Command(Command::Play))
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Request::Command(Command::Pause))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Request::Command(Command::Stop))
    }

    pub fn next(&self) -> Result<()> {
        self.send(Request::Command(Command::Skip(Direction::Forward)))
    }

    pub fn previous(&self) -> Result<()> {
        self.send(Request::Command(Command::Skip(Direction::Backward)))
    }

    /// Seeks the loaded track. The target is clamped to `[0, duration]`.
    pub fn seek_to(&self, position_ms: i64) -> Result<()> {
        self.send(Request::SeekTo(position_ms))
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Request::SetVolume(volume))
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.send(Request::SetRepeatMode(mode))
    }

    pub fn set_shuffle_mode(&self, enabled: bool) -> Result<()> {
        self.send(Request::SetShuffleMode(enabled))
    }

    pub fn status(&self) -> Result<PlayerStatus> {
        self.request(Request::Status)
    }

    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.status()?.is_playing())
    }

    pub fn position(&self) -> Result<PlaybackPosition> {
        Ok(self.status()?.position)
    }

    pub fn current_track(&self) -> Result<Option<Track>> {
        Ok(self.status()?.track)
    }

    pub fn state(&self) -> Result<PlaybackState> {
        Ok(self.status()?.state)
    }

    pub fn last_error(&self) -> Result<Option<PlayerError>> {
        Ok(self.status()?.error)
    }

    /// Stops playback and waits for the player thread to exit.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.tx.send(Message::Shutdown);
        if worker.join().is_err() {
            tracing::warn!("transport thread panicked");
        }
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

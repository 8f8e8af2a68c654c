//! Audio output collaborators.
//!
//! The transport loop owns exactly one [`AudioBackend`]. Backends never call
//! back into the player: completion, end-of-track and failures are posted
//! through the [`BackendNotifier`] handed over in [`AudioBackend::open_session`]
//! and are processed by the loop like any other message.

mod null;
mod output;

pub use self::null::NullBackend;
pub use self::output::RodioBackend;

use crate::error::BackendError;
use crate::machine::{BackendEvent, Generation};
use crate::model::Track;
use crate::transport::Message;
use crossbeam_channel::Sender;

/// Opaque id of a track loaded by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNotice {
    pub generation: Generation,
    pub event: BackendEvent,
}

/// Posts backend notices into the transport loop.
#[derive(Debug, Clone)]
pub struct BackendNotifier {
    tx: Sender<Message>,
}

impl BackendNotifier {
    pub(crate) fn new(tx: Sender<Message>) -> Self {
        Self { tx }
    }

    /// Notices posted after the player shut down are dropped.
    pub fn notify(&self, generation: Generation, event: BackendEvent) {
        let _ = self.tx.send(Message::Notice(BackendNotice { generation, event }));
    }

    pub fn loaded(&self, generation: Generation) {
        self.notify(generation, BackendEvent::Loaded);
    }

    pub fn finished(&self, generation: Generation) {
        self.notify(generation, BackendEvent::Finished);
    }

    pub fn error(&self, generation: Generation, reason: impl Into<String>) {
        self.notify(generation, BackendEvent::Error(reason.into()));
    }
}

pub trait AudioBackend {
    fn open_session(&mut self, notifier: BackendNotifier) -> Result<(), BackendError>;

    /// Prepares `track` for playback without starting it. The backend must
    /// later post `Loaded` (or `Error`) for `generation`, and `Finished` once
    /// the track plays to its end.
    fn load_track(
        &mut self,
        track: &Track,
        generation: Generation,
    ) -> Result<BackendHandle, BackendError>;

    fn play(&mut self, handle: BackendHandle) -> Result<(), BackendError>;
    fn pause(&mut self, handle: BackendHandle) -> Result<(), BackendError>;
    fn stop(&mut self, handle: BackendHandle) -> Result<(), BackendError>;
    fn seek(&mut self, handle: BackendHandle, position_ms: u64) -> Result<(), BackendError>;
    fn set_volume(&mut self, handle: BackendHandle, volume: f32) -> Result<(), BackendError>;
    fn position(&self, handle: BackendHandle) -> u64;
    fn duration(&self, handle: BackendHandle) -> Option<u64>;
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn open_session(&mut self, notifier: BackendNotifier) -> Result<(), BackendError> {
        (**self).open_session(notifier)
    }

    fn load_track(
        &mut self,
        track: &Track,
        generation: Generation,
    ) -> Result<BackendHandle, BackendError> {
        (**self).load_track(track, generation)
    }

    fn play(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        (**self).play(handle)
    }

    fn pause(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        (**self).pause(handle)
    }

    fn stop(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        (**self).stop(handle)
    }

    fn seek(&mut self, handle: BackendHandle, position_ms: u64) -> Result<(), BackendError> {
        (**self).seek(handle, position_ms)
    }

    fn set_volume(&mut self, handle: BackendHandle, volume: f32) -> Result<(), BackendError> {
        (**self).set_volume(handle, volume)
    }

    fn position(&self, handle: BackendHandle) -> u64 {
        (**self).position(handle)
    }

    fn duration(&self, handle: BackendHandle) -> Option<u64> {
        (**self).duration(handle)
    }
}

pub(crate) fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

use super::{AudioBackend, BackendHandle, BackendNotifier, millis};
use crate::error::BackendError;
use crate::machine::Generation;
use crate::model::Track;
use rodio::{Decoder, Source};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const CLOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Logical playback clock for one loaded track.
#[derive(Debug, Default)]
struct Clock {
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
}

impl Clock {
    fn position(&self) -> Duration {
        let mut position = self.position_offset;
        if let Some(started_at) = self.started_at {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.started_at.is_some() && self.position() >= duration
    }

    fn resume(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.position_offset = self.position();
        self.started_at = None;
    }

    fn seek(&mut self, position: Duration) {
        self.position_offset = self
            .track_duration
            .map_or(position, |duration| position.min(duration));
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }
}

struct LoadedTrack {
    handle: BackendHandle,
    clock: Arc<Mutex<Clock>>,
    cancel: Arc<AtomicBool>,
}

impl Drop for LoadedTrack {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Silent backend driven by a wall clock. Tracks must open and decode like
/// they would on a real device. A track whose length the decoder cannot
/// report never finishes on its own.
#[derive(Default)]
pub struct NullBackend {
    notifier: Option<BackendNotifier>,
    loaded: Option<LoadedTrack>,
    next_handle: u64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_duration(path: &Path) -> Result<Option<Duration>, BackendError> {
        let file = File::open(path).map_err(|err| {
            BackendError::Load(format!("failed to open track {}: {err}", path.display()))
        })?;
        let source = Decoder::try_from(file)
            .map_err(|err| BackendError::Load(format!("failed to decode {}: {err}", path.display())))?;
        Ok(source
            .total_duration()
            .filter(|duration| !duration.is_zero()))
    }

    fn loaded(&self, handle: BackendHandle) -> Result<&LoadedTrack, BackendError> {
        self.loaded
            .as_ref()
            .filter(|loaded| loaded.handle == handle)
            .ok_or_else(|| BackendError::Playback(format!("unknown track handle {}", handle.0)))
    }

    fn with_clock<T>(
        &self,
        handle: BackendHandle,
        operation: impl FnOnce(&mut Clock) -> T,
    ) -> Result<T, BackendError> {
        let loaded = self.loaded(handle)?;
        let mut clock = loaded
            .clock
            .lock()
            .map_err(|_| BackendError::Playback(String::from("playback clock poisoned")))?;
        Ok(operation(&mut clock))
    }
}

impl AudioBackend for NullBackend {
    fn open_session(&mut self, notifier: BackendNotifier) -> Result<(), BackendError> {
        self.notifier = Some(notifier);
        Ok(())
    }

    fn load_track(
        &mut self,
        track: &Track,
        generation: Generation,
    ) -> Result<BackendHandle, BackendError> {
        self.loaded = None;
        let Some(notifier) = self.notifier.as_ref() else {
            return Err(BackendError::Session(String::from("audio session is not open")));
        };

        let track_duration = Self::read_duration(&track.path())?;
        let clock = Arc::new(Mutex::new(Clock {
            track_duration,
            ..Clock::default()
        }));
        let cancel = Arc::new(AtomicBool::new(false));
        spawn_clock_watcher(clock.clone(), cancel.clone(), notifier.clone(), generation);

        self.next_handle += 1;
        let handle = BackendHandle(self.next_handle);
        self.loaded = Some(LoadedTrack {
            handle,
            clock,
            cancel,
        });
        notifier.loaded(generation);
        Ok(handle)
    }

    fn play(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.with_clock(handle, Clock::resume)
    }

    fn pause(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.with_clock(handle, Clock::pause)
    }

    fn stop(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.loaded(handle)?;
        self.loaded = None;
        Ok(())
    }

    fn seek(&mut self, handle: BackendHandle, position_ms: u64) -> Result<(), BackendError> {
        self.with_clock(handle, |clock| {
            clock.seek(Duration::from_millis(position_ms));
        })
    }

    fn set_volume(&mut self, handle: BackendHandle, _volume: f32) -> Result<(), BackendError> {
        self.loaded(handle).map(|_| ())
    }

    fn position(&self, handle: BackendHandle) -> u64 {
        self.with_clock(handle, |clock| millis(clock.position()))
            .unwrap_or(0)
    }

    fn duration(&self, handle: BackendHandle) -> Option<u64> {
        self.with_clock(handle, |clock| clock.track_duration.map(millis))
            .ok()
            .flatten()
    }
}

fn spawn_clock_watcher(
    clock: Arc<Mutex<Clock>>,
    cancel: Arc<AtomicBool>,
    notifier: BackendNotifier,
    generation: Generation,
) {
    thread::spawn(move || {
        while !cancel.load(Ordering::Relaxed) {
            let finished = clock.lock().map(|clock| clock.is_finished()).unwrap_or(true);
            if finished {
                notifier.finished(generation);
                return;
            }
            thread::sleep(CLOCK_POLL_INTERVAL);
        }
    });
}

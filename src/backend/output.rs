use super::{AudioBackend, BackendHandle, BackendNotifier, millis};
use crate::error::BackendError;
use crate::machine::Generation;
use crate::model::Track;
use anyhow::{Context, Result};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct LoadedTrack {
    handle: BackendHandle,
    sink: Arc<Sink>,
    duration: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

impl Drop for LoadedTrack {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.sink.stop();
    }
}

/// Plays tracks on a system output device, one `Sink` per loaded track.
pub struct RodioBackend {
    output: Option<String>,
    stream: Option<OutputStream>,
    notifier: Option<BackendNotifier>,
    loaded: Option<LoadedTrack>,
    next_handle: u64,
}

impl RodioBackend {
    /// `output` selects a device by exact name; `None` uses the system default.
    pub fn new(output: Option<String>) -> Self {
        Self {
            output,
            stream: None,
            notifier: None,
            loaded: None,
            next_handle: 0,
        }
    }

    pub fn available_outputs() -> Vec<String> {
        let mut outputs: Vec<String> = rodio::cpal::default_host()
            .output_devices()
            .ok()
            .into_iter()
            .flatten()
            .filter_map(|device| device.name().ok())
            .collect();
        outputs.sort_by_cached_key(|name| name.to_ascii_lowercase());
        outputs.dedup();
        outputs
    }

    fn loaded(&self, handle: BackendHandle) -> Result<&LoadedTrack, BackendError> {
        self.loaded
            .as_ref()
            .filter(|loaded| loaded.handle == handle)
            .ok_or_else(|| BackendError::Playback(format!("unknown track handle {}", handle.0)))
    }

    fn open_output_stream(output: Option<&str>) -> Result<OutputStream> {
        let host = rodio::cpal::default_host();
        let mut stream = if let Some(requested) = output {
            let device = host
                .output_devices()
                .context("failed to enumerate output devices")?
                .find(|candidate| candidate.name().ok().as_deref() == Some(requested))
                .with_context(|| format!("audio output device not found: {requested}"))?;
            OutputStreamBuilder::from_device(device)
                .context("failed to open selected output device")?
                .with_error_callback(|err| tracing::warn!("audio output error: {err}"))
                .open_stream_or_fallback()
                .context("failed to start selected output stream")?
        } else {
            match OutputStreamBuilder::from_default_device()
                .context("failed to open default system output stream")
                .and_then(|builder| {
                    builder
                        .with_error_callback(|err| tracing::warn!("audio output error: {err}"))
                        .open_stream_or_fallback()
                        .context("failed to start default output stream")
                }) {
                Ok(stream) => stream,
                Err(default_err) => {
                    tracing::warn!("default output failed, trying other devices: {default_err:#}");
                    Self::open_first_working_device(&host).with_context(|| {
                        format!(
                            "unable to start any audio output stream after default failed: {default_err:#}"
                        )
                    })?
                }
            }
        };
        stream.log_on_drop(false);
        Ok(stream)
    }

    fn open_first_working_device(host: &rodio::cpal::Host) -> Option<OutputStream> {
        let devices = host.output_devices().ok()?;
        devices.into_iter().find_map(|device| {
            let name = device.name().unwrap_or_default();
            let builder = match OutputStreamBuilder::from_device(device) {
                Ok(builder) => builder,
                Err(err) => {
                    tracing::debug!(device = %name, "output device unavailable: {err}");
                    return None;
                }
            };
            match builder.with_error_callback(|_| {}).open_stream_or_fallback() {
                Ok(stream) => {
                    tracing::info!(device = %name, "using fallback output device");
                    Some(stream)
                }
                Err(err) => {
                    tracing::debug!(device = %name, "output stream failed to start: {err}");
                    None
                }
            }
        })
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AudioBackend for RodioBackend {
    fn open_session(&mut self, notifier: BackendNotifier) -> Result<(), BackendError> {
        let stream = Self::open_output_stream(self.output.as_deref())
            .map_err(|err| BackendError::Session(format!("{err:#}")))?;
        self.stream = Some(stream);
        self.notifier = Some(notifier);
        Ok(())
    }

    fn load_track(
        &mut self,
        track: &Track,
        generation: Generation,
    ) -> Result<BackendHandle, BackendError> {
        self.loaded = None;
        let (Some(stream), Some(notifier)) = (self.stream.as_ref(), self.notifier.as_ref()) else {
            return Err(BackendError::Session(String::from("audio session is not open")));
        };

        let path = track.path();
        let file = File::open(&path).map_err(|err| {
            BackendError::Load(format!("failed to open track {}: {err}", path.display()))
        })?;
        let source = Decoder::try_from(file)
            .map_err(|err| BackendError::Load(format!("failed to decode {}: {err}", path.display())))?;
        let duration = source.total_duration().filter(|duration| !duration.is_zero());

        let sink = Arc::new(Sink::connect_new(stream.mixer()));
        sink.pause();
        sink.append(source);

        self.next_handle += 1;
        let handle = BackendHandle(self.next_handle);
        let cancel = Arc::new(AtomicBool::new(false));
        spawn_drain_watcher(sink.clone(), cancel.clone(), notifier.clone(), generation);

        self.loaded = Some(LoadedTrack {
            handle,
            sink,
            duration,
            cancel,
        });
        notifier.loaded(generation);
        Ok(handle)
    }

    fn play(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.loaded(handle)?.sink.play();
        Ok(())
    }

    fn pause(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.loaded(handle)?.sink.pause();
        Ok(())
    }

    fn stop(&mut self, handle: BackendHandle) -> Result<(), BackendError> {
        self.loaded(handle)?;
        self.loaded = None;
        Ok(())
    }

    fn seek(&mut self, handle: BackendHandle, position_ms: u64) -> Result<(), BackendError> {
        self.loaded(handle)?
            .sink
            .try_seek(Duration::from_millis(position_ms))
            .map_err(|err| BackendError::Playback(format!("failed to seek current track: {err:?}")))
    }

    fn set_volume(&mut self, handle: BackendHandle, volume: f32) -> Result<(), BackendError> {
        self.loaded(handle)?.sink.set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    fn position(&self, handle: BackendHandle) -> u64 {
        self.loaded(handle)
            .map(|loaded| millis(loaded.sink.get_pos()))
            .unwrap_or(0)
    }

    fn duration(&self, handle: BackendHandle) -> Option<u64> {
        self.loaded(handle).ok()?.duration.map(millis)
    }
}

/// Playback progress as seen by the drain watcher.
trait Playhead: Send + Sync + 'static {
    fn is_drained(&self) -> bool;
    fn is_paused(&self) -> bool;
}

impl Playhead for Sink {
    fn is_drained(&self) -> bool {
        self.empty()
    }

    fn is_paused(&self) -> bool {
        Sink::is_paused(self)
    }
}

/// Posts `Finished` once everything appended has played. A paused sink is
/// never reported, even when drained, until it is resumed.
fn spawn_drain_watcher<P: Playhead>(
    playhead: Arc<P>,
    cancel: Arc<AtomicBool>,
    notifier: BackendNotifier,
    generation: Generation,
) {
    thread::spawn(move || {
        while !cancel.load(Ordering::Relaxed) {
            if playhead.is_drained() && !playhead.is_paused() {
                notifier.finished(generation);
                return;
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
    });
}

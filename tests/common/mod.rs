#![allow(dead_code)]

use dirplay::backend::{AudioBackend, BackendHandle, BackendNotifier};
use dirplay::machine::Generation;
use dirplay::model::Track;
use dirplay::{BackendError, PlayerStatus, TransportController};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// What the scripted backend saw and how it should answer.
#[derive(Debug, Default)]
pub struct Script {
    pub notifier: Option<BackendNotifier>,
    pub loads: Vec<(Track, Generation)>,
    pub calls: Vec<String>,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub broken: Vec<String>,
}

/// Backend that records every call and only reports progress when a test
/// posts a notice.
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
    next_handle: u64,
}

impl ScriptedBackend {
    fn record(&self, call: String) {
        self.script.lock().expect("script").calls.push(call);
    }
}

impl AudioBackend for ScriptedBackend {
    fn open_session(&mut self, notifier: BackendNotifier) -> Result<(), BackendError> {
        self.script.lock().expect("script").notifier = Some(notifier);
        Ok(())
    }

    fn load_track(
        &mut self,
        track: &Track,
        generation: Generation,
    ) -> Result<BackendHandle, BackendError> {
        let mut script = self.script.lock().expect("script");
        script.calls.push(format!("load {}", track.uri()));
        if script.broken.iter().any(|uri| uri == track.uri()) {
            return Err(BackendError::Load(String::from("unsupported format")));
        }
        script.loads.push((track.clone(), generation));
        self.next_handle += 1;
        Ok(BackendHandle(self.next_handle))
    }

    fn play(&mut self, _handle: BackendHandle) -> Result<(), BackendError> {
        self.record(String::from("play"));
        Ok(())
    }

    fn pause(&mut self, _handle: BackendHandle) -> Result<(), BackendError> {
        self.record(String::from("pause"));
        Ok(())
    }

    fn stop(&mut self, _handle: BackendHandle) -> Result<(), BackendError> {
        self.record(String::from("stop"));
        Ok(())
    }

    fn seek(&mut self, _handle: BackendHandle, position_ms: u64) -> Result<(), BackendError> {
        self.record(format!("seek {position_ms}"));
        Ok(())
    }

    fn set_volume(&mut self, _handle: BackendHandle, volume: f32) -> Result<(), BackendError> {
        self.record(format!("volume {volume}"));
        Ok(())
    }

    fn position(&self, _handle: BackendHandle) -> u64 {
        self.script.lock().expect("script").position_ms
    }

    fn duration(&self, _handle: BackendHandle) -> Option<u64> {
        self.script.lock().expect("script").duration_ms
    }
}

pub struct Harness {
    pub controller: TransportController,
    pub script: Arc<Mutex<Script>>,
}

impl Harness {
    /// An initialized player holding `uris` as its playlist.
    pub fn new(uris: &[&str]) -> Self {
        let harness = Self::uninitialized();
        harness.controller.initialize().expect("initialize");
        harness
            .controller
            .load_playlist(tracks(uris))
            .expect("load playlist");
        harness
    }

    pub fn uninitialized() -> Self {
        let script = Arc::new(Mutex::new(Script::default()));
        let backend_script = script.clone();
        let controller = TransportController::spawn_seeded(
            move || ScriptedBackend {
                script: backend_script,
                next_handle: 0,
            },
            42,
        );
        Self { controller, script }
    }

    pub fn last_load(&self) -> (Track, Generation) {
        self.script
            .lock()
            .expect("script")
            .loads
            .last()
            .cloned()
            .expect("a track was loaded")
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().expect("script").calls.clone()
    }

    fn notifier(&self) -> BackendNotifier {
        self.script
            .lock()
            .expect("script")
            .notifier
            .clone()
            .expect("session open")
    }

    /// Posts `Loaded` for the most recent load and waits for it to be handled.
    pub fn loaded(&self) -> PlayerStatus {
        let (_, generation) = self.last_load();
        self.loaded_for(generation)
    }

    pub fn loaded_for(&self, generation: Generation) -> PlayerStatus {
        self.notifier().loaded(generation);
        self.controller.status().expect("status")
    }

    /// Posts `Finished` for the most recent load, acknowledging any load
    /// that auto-advance starts.
    pub fn finish(&self) -> PlayerStatus {
        let (_, generation) = self.last_load();
        self.notifier().finished(generation);
        let status = self.controller.status().expect("status");
        let (_, latest) = self.last_load();
        if latest != generation {
            return self.loaded();
        }
        status
    }

    pub fn finished_for(&self, generation: Generation) -> PlayerStatus {
        self.notifier().finished(generation);
        self.controller.status().expect("status")
    }

    pub fn fail(&self, reason: &str) -> PlayerStatus {
        let (_, generation) = self.last_load();
        self.notifier().error(generation, reason);
        self.controller.status().expect("status")
    }

    pub fn play(&self) -> PlayerStatus {
        self.controller.play().expect("play");
        self.loaded()
    }
}

pub fn tracks(uris: &[&str]) -> Vec<Track> {
    uris.iter().map(|uri| Track::new(*uri)).collect()
}

pub fn write_test_wav(path: &Path, duration_ms: u32) {
    let sample_rate: u32 = 8_000;
    let channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let bytes_per_sample = u32::from(bits_per_sample / 8);
    let total_samples = sample_rate * duration_ms / 1_000;
    let data_size = total_samples * u32::from(channels) * bytes_per_sample;
    let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
    let block_align = channels * (bits_per_sample / 8);

    let mut bytes = Vec::with_capacity((44 + data_size) as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_size).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&1_u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&bits_per_sample.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());
    bytes.resize((44 + data_size) as usize, 0);

    fs::write(path, bytes).expect("wav fixture should be written");
}

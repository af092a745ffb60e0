//! Real-time playback on the default audio device.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ya_audio::{CpalControl, CpalOutput};
use ya_engine::{Engine, EngineConfig, Mode, OutputTask, PlaybackError};

use crate::error::Error;
use crate::fs_storage::FsStorage;

/// How long the blocking helpers sleep between ticks.
const TICK_INTERVAL: Duration = Duration::from_millis(2);

/// Engine plus a dedicated output thread feeding the audio device.
///
/// The engine and the device's control half live on the caller's thread;
/// call [`Player::tick`] regularly, or use the blocking helpers.
pub struct Player {
    engine: Engine<FsStorage, CpalControl>,
    output: Option<OutputHandle>,
}

struct OutputHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Player {
    /// Open the default audio device. WAVE paths resolve under `root`.
    pub fn open(config: EngineConfig, root: impl Into<PathBuf>) -> Result<Self, Error> {
        let (control, sink) = CpalOutput::new()?;
        let timeout = config.signal_timeout();
        let (engine, reader) = Engine::new(config, FsStorage::new(root), control)?;

        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let thread = thread::Builder::new()
            .name("ya-output".into())
            .spawn(move || {
                let mut task = OutputTask::new(reader, sink, timeout);
                task.run(|| !stop.load(Ordering::Relaxed));
                log::debug!("output thread exiting after {} frames", task.frames_sent());
            })?;

        Ok(Self {
            engine,
            output: Some(OutputHandle {
                stop_signal,
                thread: Some(thread),
            }),
        })
    }

    // --- Playback requests ---

    pub fn submit_notes(&mut self, text: &str) -> Result<(), PlaybackError> {
        self.engine.submit_notes(text)
    }

    pub fn play_file(&mut self, path: &str) -> Result<(), PlaybackError> {
        self.engine.play_file(path)
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn tick(&mut self) {
        self.engine.tick();
    }

    // --- Blocking helpers ---

    /// Tick until the engine goes idle.
    pub fn run_until_idle(&mut self) {
        while self.engine.is_playing() {
            self.engine.tick();
            thread::sleep(TICK_INTERVAL);
        }
    }

    pub fn play_notes_blocking(&mut self, text: &str) -> Result<(), PlaybackError> {
        self.submit_notes(text)?;
        self.run_until_idle();
        Ok(())
    }

    pub fn play_file_blocking(&mut self, path: &str) -> Result<(), PlaybackError> {
        self.play_file(path)?;
        self.run_until_idle();
        Ok(())
    }

    // --- Queries and settings ---

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn mode(&self) -> Mode {
        self.engine.mode()
    }

    pub fn set_wave_volume(&mut self, volume: u8) {
        self.engine.set_wave_volume(volume);
    }

    pub fn wave_volume(&self) -> u8 {
        self.engine.wave_volume()
    }

    pub fn device_rate(&self) -> u32 {
        self.engine.output().device_rate()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.engine.stop();
        if let Some(mut out) = self.output.take() {
            out.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = out.thread.take() {
                let _ = handle.join();
            }
        }
    }
}

//! Playback controller.
//!
//! Owns the producer half of the ring buffer and switches between notation
//! and WAVE playback. Every call here, including [`Engine::tick`], belongs
//! to the same execution context; the output task on the other side only
//! ever sees the [`FrameReader`].

use crate::config::{ConfigError, EngineConfig, MAX_WAVE_VOLUME};
use crate::error::PlaybackError;
use crate::notation::NotationInterpreter;
use crate::output::OutputControl;
use crate::ring_buffer::{ring_buffer, FrameReader, FrameWriter};
use crate::storage::Storage;
use crate::synth::Synthesizer;
use crate::wave::{WaveStatus, WaveStreamer};

/// What the engine is currently playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Idle,
    PlayingNotes,
    PlayingWave,
}

/// One audio output channel's worth of playback state.
pub struct Engine<S: Storage, C> {
    config: EngineConfig,
    storage: S,
    output: C,
    output_running: bool,
    writer: FrameWriter,
    interpreter: NotationInterpreter,
    synth: Synthesizer,
    wave: Option<WaveStreamer<S::File>>,
    wave_volume: u8,
    mode: Mode,
}

impl<S: Storage, C: OutputControl> Engine<S, C> {
    /// Build an engine and the reader half for its output task.
    pub fn new(config: EngineConfig, storage: S, output: C) -> Result<(Self, FrameReader), ConfigError> {
        config.validate()?;
        let (writer, reader) = ring_buffer(config.buffer_frames);

        let engine = Self {
            interpreter: NotationInterpreter::new(config.max_pending_notes),
            synth: Synthesizer::new(config.max_tone_samples()),
            wave_volume: config.wave_volume.min(MAX_WAVE_VOLUME),
            config,
            storage,
            output,
            output_running: false,
            writer,
            wave: None,
            mode: Mode::Idle,
        };
        Ok((engine, reader))
    }

    // --- Mode transitions ---

    /// Queue notation text for playback.
    ///
    /// Stops a playing WAVE first. Text is appended to anything still
    /// pending. Syntax errors are not reported here; they end playback early.
    pub fn submit_notes(&mut self, text: &str) -> Result<(), PlaybackError> {
        if self.mode == Mode::PlayingWave {
            self.stop();
        }

        if let Err(err) = self.interpreter.push_notes(text) {
            log::warn!("rejecting notes: {}", err);
            return Err(err);
        }

        if self.mode == Mode::Idle {
            self.writer.reset();
            log::debug!("idle -> playing notes");
        }
        self.mode = Mode::PlayingNotes;
        self.start_output();
        Ok(())
    }

    /// Stop whatever is playing and start streaming a WAVE file.
    pub fn play_file(&mut self, path: &str) -> Result<(), PlaybackError> {
        self.stop();

        match WaveStreamer::open(&mut self.storage, path) {
            Ok(wave) => {
                self.wave = Some(wave);
                self.mode = Mode::PlayingWave;
                self.start_output();
                log::debug!("idle -> playing wave {:?}", path);
                Ok(())
            }
            Err(err) => {
                log::warn!("cannot play {:?}: {}", path, err);
                Err(err)
            }
        }
    }

    /// Silence output immediately and return to idle.
    pub fn stop(&mut self) {
        if self.output_running {
            self.output.stop();
            self.output_running = false;
        }
        self.wave = None;
        self.interpreter.clear();
        self.synth.cancel();
        self.writer.reset();
        if self.mode != Mode::Idle {
            log::debug!("{:?} -> idle", self.mode);
        }
        self.mode = Mode::Idle;
    }

    // --- Driving ---

    /// Do one bounded slice of fill work. Never blocks.
    pub fn tick(&mut self) {
        match self.mode {
            Mode::Idle => {}
            Mode::PlayingNotes => self.tick_notes(),
            Mode::PlayingWave => self.tick_wave(),
        }
    }

    fn tick_notes(&mut self) {
        let budget = self.config.render_slice_samples;

        if self.synth.is_busy() && !self.synth.render(&mut self.writer, budget) {
            return;
        }

        if self.interpreter.has_pending() && self.interpreter.decoded().is_none() {
            self.interpreter.step();
        }

        if let Some(tone) = self.interpreter.decoded() {
            // Not enough room: keep the tone and retry next tick.
            if self.synth.begin(&tone, self.interpreter.volume(), &self.writer) {
                self.interpreter.commit();
                self.synth.render(&mut self.writer, budget);
            }
        }

        if !self.interpreter.has_pending()
            && self.interpreter.decoded().is_none()
            && !self.synth.is_busy()
            && self.writer.populated_frames() == 0
        {
            self.stop();
        }
    }

    fn tick_wave(&mut self) {
        let Some(wave) = self.wave.as_mut() else {
            self.stop();
            return;
        };
        let status = wave.fill(
            &mut self.writer,
            self.wave_volume,
            self.config.wave_low_water_frames,
        );
        if status == WaveStatus::Finished {
            self.stop();
        }
    }

    fn start_output(&mut self) {
        if !self.output_running {
            self.output.start();
            self.output_running = true;
        }
    }

    // --- Queries and settings ---

    pub fn is_playing(&self) -> bool {
        self.mode != Mode::Idle
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the WAVE playback volume, clamped to 10.
    pub fn set_wave_volume(&mut self, volume: u8) {
        self.wave_volume = volume.min(MAX_WAVE_VOLUME);
    }

    pub fn wave_volume(&self) -> u8 {
        self.wave_volume
    }

    pub fn populated_frames(&self) -> usize {
        self.writer.populated_frames()
    }

    pub fn interpreter(&self) -> &NotationInterpreter {
        &self.interpreter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn output(&self) -> &C {
        &self.output
    }
}

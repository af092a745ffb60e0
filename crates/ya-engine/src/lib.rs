//! Playback engine for yaudio.
//!
//! Turns notation text or mono WAVE files into a stream of 16-bit frames.
//! A cooperative [`Engine::tick`] fills a lock-free ring buffer; an
//! independent [`OutputTask`] drains it into the output peripheral one
//! frame per completion signal.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod config;
mod controller;
mod error;
mod frame;
pub mod notation;
mod output;
mod ring_buffer;
mod storage;
pub mod synth;
mod wave;

pub use config::{
    ConfigError, EngineConfig, DEFAULT_BUFFER_FRAMES, DEFAULT_MAX_PENDING_NOTES,
    DEFAULT_WAVE_LOW_WATER, DEFAULT_WAVE_VOLUME, MAX_WAVE_VOLUME, SAMPLE_RATE,
};
pub use controller::{Engine, Mode};
pub use error::PlaybackError;
pub use frame::{Frame, FRAME_BYTES, FRAME_SIZE};
pub use notation::{NotationInterpreter, SyntaxError};
pub use output::{NullOutput, OutputControl, OutputSink, OutputTask};
pub use ring_buffer::{ring_buffer, FrameReader, FrameWriter, MAX_RING_FRAMES};
pub use storage::{read_full, MemoryFile, MemoryStorage, SoundFile, Storage};
pub use synth::{Synthesizer, ToneEvent};
pub use wave::{swap_and_scale, WaveStatus, WaveStreamer};

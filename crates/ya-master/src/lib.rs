//! Headless host controller for yaudio.
//!
//! Wires the engine to a real output device and a filesystem, and offers
//! offline rendering for the CLI and tests.

mod error;
mod fs_storage;
mod player;
mod render;

pub use error::Error;
pub use fs_storage::{FsFile, FsStorage};
pub use player::Player;
pub use render::{render_notes, render_notes_to_wav, render_wave};

// Re-export common types so callers don't need ya-engine directly.
pub use ya_engine::{EngineConfig, Mode, PlaybackError, SAMPLE_RATE};
pub use ya_formats::write_mono_wav;

//! Playback error type.

use ya_formats::WavError;

/// Why a playback request was refused.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// Appending would exceed the notation buffer.
    #[error("too many notes buffered ({pending} + {incoming} > {max})")]
    NotesOverflow {
        pending: usize,
        incoming: usize,
        max: usize,
    },
    /// Storage has no file at the path.
    #[error("sound file not found")]
    FileNotFound,
    /// The file is not a mono WAVE at the engine rate.
    #[error(transparent)]
    Format(#[from] WavError),
}

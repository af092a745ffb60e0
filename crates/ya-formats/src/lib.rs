//! Format parsers for yaudio.
//!
//! Extracts the fields the engine cares about from RIFF/WAVE headers and
//! writes rendered mono PCM back out as WAV.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod wav_format;

pub use wav_format::{
    mono_samples_to_wav, validate_header, WavHeader, BITS_PER_SAMPLE, BYTES_PER_SAMPLE,
    WAV_HEADER_LEN,
};

#[cfg(feature = "std")]
pub use wav_format::write_mono_wav;

/// Error type for format parsing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WavError {
    /// Fewer than [`WAV_HEADER_LEN`] bytes could be read.
    #[error("WAVE header too short: got {got} of {} bytes", WAV_HEADER_LEN)]
    TooShort { got: usize },
    /// Only single-channel files are playable.
    #[error("file has {0} channels, only mono is supported")]
    UnsupportedChannels(u16),
    /// Sample rate differs from the engine rate.
    #[error("file sample rate is {found} Hz, only {expected} Hz is supported")]
    UnsupportedSampleRate { found: u32, expected: u32 },
}

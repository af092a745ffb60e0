//! WAVE header extraction and mono 16-bit PCM encoding.
//!
//! Header fields are read at fixed little-endian offsets of the canonical
//! 44-byte header. Chunk walking is deliberately not done: the playback path
//! reads the first 44 bytes and streams everything after them.

use alloc::vec::Vec;

use crate::WavError;

/// Length of the canonical RIFF/WAVE header.
pub const WAV_HEADER_LEN: usize = 44;

pub const BITS_PER_SAMPLE: u16 = 16;
pub const BYTES_PER_SAMPLE: usize = (BITS_PER_SAMPLE / 8) as usize;

const CHANNELS_OFFSET: usize = 22;
const SAMPLE_RATE_OFFSET: usize = 24;

/// The header fields the engine checks before streaming.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub num_channels: u16,
    pub sample_rate: u32,
}

impl WavHeader {
    /// Extract fields from the leading bytes of a file.
    pub fn parse(data: &[u8]) -> Result<Self, WavError> {
        if data.len() < WAV_HEADER_LEN {
            return Err(WavError::TooShort { got: data.len() });
        }
        Ok(Self {
            num_channels: read_u16_le(data, CHANNELS_OFFSET),
            sample_rate: read_u32_le(data, SAMPLE_RATE_OFFSET),
        })
    }
}

/// Parse a header and check it is mono at `sample_rate`.
pub fn validate_header(data: &[u8], sample_rate: u32) -> Result<WavHeader, WavError> {
    let header = WavHeader::parse(data)?;
    if header.num_channels != 1 {
        return Err(WavError::UnsupportedChannels(header.num_channels));
    }
    if header.sample_rate != sample_rate {
        return Err(WavError::UnsupportedSampleRate {
            found: header.sample_rate,
            expected: sample_rate,
        });
    }
    Ok(header)
}

// --- Writing ---

/// Encode mono 16-bit samples as a complete WAV file.
pub fn mono_samples_to_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_size = (samples.len() * BYTES_PER_SAMPLE) as u32;
    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);
    push_header(&mut buf, sample_rate, data_size);
    for s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    buf
}

#[cfg(feature = "std")]
pub fn write_mono_wav(
    w: &mut impl std::io::Write,
    samples: &[i16],
    sample_rate: u32,
) -> std::io::Result<()> {
    w.write_all(&mono_samples_to_wav(samples, sample_rate))
}

fn push_header(buf: &mut Vec<u8>, sample_rate: u32, data_size: u32) {
    let num_channels: u16 = 1;
    let block_align = num_channels * (BITS_PER_SAMPLE / 8);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes());
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

//! WAVE file streamer.
//!
//! Validates the 44-byte header of a mono file at the engine rate, then
//! feeds the ring buffer one frame at a time, keeping only a few frames
//! ahead of the output.

use ya_formats::{validate_header, WAV_HEADER_LEN};

use crate::config::SAMPLE_RATE;
use crate::error::PlaybackError;
use crate::frame::{FRAME_BYTES, FRAME_SIZE};
use crate::ring_buffer::FrameWriter;
use crate::storage::{read_full, SoundFile, Storage};

/// Outcome of one fill step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveStatus {
    /// A frame was read (or a short tail dropped).
    Streaming,
    /// Enough frames are buffered; nothing read.
    Buffered,
    /// File exhausted and the ring has drained.
    Finished,
}

/// Swap each adjacent sample pair of little-endian PCM and scale by
/// `volume / 10`.
///
/// The pair order is pinned by a characterization test; do not "fix" it.
pub fn swap_and_scale(raw: &[u8], volume: u8, out: &mut [i16]) {
    let scale = |s: i16| (s as i32 * volume as i32 / 10) as i16;
    for (pair, dst) in raw.chunks_exact(4).zip(out.chunks_exact_mut(2)) {
        let first = i16::from_le_bytes([pair[0], pair[1]]);
        let second = i16::from_le_bytes([pair[2], pair[3]]);
        dst[0] = scale(second);
        dst[1] = scale(first);
    }
}

/// An open, validated WAVE file being streamed.
pub struct WaveStreamer<F> {
    file: F,
    raw: [u8; FRAME_BYTES],
    frame: [i16; FRAME_SIZE],
    frames_read: usize,
}

impl<F: SoundFile> WaveStreamer<F> {
    /// Open `path` and check its header. On failure the file is closed.
    pub fn open<S>(storage: &mut S, path: &str) -> Result<Self, PlaybackError>
    where
        S: Storage<File = F>,
    {
        let mut file = storage.open(path).ok_or(PlaybackError::FileNotFound)?;

        let mut header = [0u8; WAV_HEADER_LEN];
        let got = read_full(&mut file, &mut header);
        validate_header(&header[..got], SAMPLE_RATE)?;

        Ok(Self {
            file,
            raw: [0; FRAME_BYTES],
            frame: [0; FRAME_SIZE],
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Top up the ring by at most one frame.
    ///
    /// A trailing read shorter than a frame is dropped.
    pub fn fill(&mut self, writer: &mut FrameWriter, volume: u8, low_water: usize) -> WaveStatus {
        if self.file.available() && writer.populated_frames() < low_water {
            let got = read_full(&mut self.file, &mut self.raw);
            if got == FRAME_BYTES {
                swap_and_scale(&self.raw, volume, &mut self.frame);
                for &s in &self.frame {
                    writer.append_sample(s);
                }
                self.frames_read += 1;
                log::trace!("wave frame {} buffered", self.frames_read);
            } else {
                log::debug!("dropping {} trailing wave bytes", got);
            }
            WaveStatus::Streaming
        } else if writer.populated_frames() == 0 {
            WaveStatus::Finished
        } else {
            WaveStatus::Buffered
        }
    }
}

//! Audio frame type.

/// Number of samples in one frame. Matches the output peripheral's DMA
/// buffer length.
pub const FRAME_SIZE: usize = 1024;

/// Bytes occupied by one frame of 16-bit PCM.
pub const FRAME_BYTES: usize = FRAME_SIZE * 2;

/// A block of mono 16-bit samples, the unit handed to the output peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    samples: [i16; FRAME_SIZE],
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { samples: [0; FRAME_SIZE] }
    }

    pub fn samples(&self) -> &[i16; FRAME_SIZE] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [i16; FRAME_SIZE] {
        &mut self.samples
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> i16 {
        self.samples
            .iter()
            .map(|s| s.saturating_abs())
            .max()
            .unwrap_or(0)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::silence()
    }
}

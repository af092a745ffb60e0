//! Engine constants and tunables.

use core::time::Duration;

use crate::frame::FRAME_SIZE;

/// The single output sample rate, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

pub const DEFAULT_BUFFER_FRAMES: usize = 100;
pub const DEFAULT_MAX_PENDING_NOTES: usize = 4000;
/// Frames kept buffered ahead of the output while streaming a WAVE file.
/// 5 frames at 16 kHz is 0.32 s of latency between a volume change and
/// hearing it.
pub const DEFAULT_WAVE_LOW_WATER: usize = 5;
pub const DEFAULT_WAVE_VOLUME: u8 = 5;
pub const MAX_WAVE_VOLUME: u8 = 10;
pub const DEFAULT_RENDER_SLICE_SAMPLES: usize = FRAME_SIZE * 4;
pub const DEFAULT_SIGNAL_TIMEOUT_MS: u32 = 1;

/// Error for configurations the engine cannot run with.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("ring buffer needs at least 2 frames, got {0}")]
    TooFewFrames(usize),
    #[error("wave low-water mark {low_water} must be between 1 and {} frames", .buffer_frames - 1)]
    LowWaterOutOfRange { low_water: usize, buffer_frames: usize },
    #[error("render slice must be at least one sample")]
    EmptyRenderSlice,
    #[error("notation buffer must hold at least one character")]
    EmptyNotesBuffer,
}

/// Runtime tunables for one engine instance.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EngineConfig {
    /// Ring buffer capacity in frames.
    pub buffer_frames: usize,
    /// Maximum notation characters held pending at once.
    pub max_pending_notes: usize,
    pub wave_low_water_frames: usize,
    /// Initial wave volume, 0-10.
    pub wave_volume: u8,
    /// Most samples the synthesizer writes during one tick.
    pub render_slice_samples: usize,
    /// Bound on the output task's wait for the peripheral signal.
    pub signal_timeout_ms: u32,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_frames < 2 {
            return Err(ConfigError::TooFewFrames(self.buffer_frames));
        }
        if self.wave_low_water_frames == 0 || self.wave_low_water_frames >= self.buffer_frames {
            return Err(ConfigError::LowWaterOutOfRange {
                low_water: self.wave_low_water_frames,
                buffer_frames: self.buffer_frames,
            });
        }
        if self.render_slice_samples == 0 {
            return Err(ConfigError::EmptyRenderSlice);
        }
        if self.max_pending_notes == 0 {
            return Err(ConfigError::EmptyNotesBuffer);
        }
        Ok(())
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms as u64)
    }

    /// Longest tone that fits an empty ring buffer. Anything longer would
    /// wait for space forever, so the synthesizer shortens it to this.
    pub fn max_tone_samples(&self) -> usize {
        (self.buffer_frames - 1) * FRAME_SIZE - 1
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            max_pending_notes: DEFAULT_MAX_PENDING_NOTES,
            wave_low_water_frames: DEFAULT_WAVE_LOW_WATER,
            wave_volume: DEFAULT_WAVE_VOLUME,
            render_slice_samples: DEFAULT_RENDER_SLICE_SAMPLES,
            signal_timeout_ms: DEFAULT_SIGNAL_TIMEOUT_MS,
        }
    }
}

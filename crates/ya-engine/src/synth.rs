//! Tone synthesizer.
//!
//! Renders one tone event (a sine or silence) into the ring buffer. Writing
//! starts only once the whole event fits in free space; after that the
//! event is written in slices so a long note never monopolizes a tick.

use core::f64::consts::PI;

use crate::config::SAMPLE_RATE;
use crate::ring_buffer::FrameWriter;

/// Amplitude at volume 10 before loudness compensation.
pub const BASE_AMPLITUDE: i32 = 16_000;

/// Fraction of a tone spent ramping in, and again ramping out.
pub const FADE_FRACTION: f64 = 0.02;

/// A decoded note: frequency (0 = silence) and duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneEvent {
    pub frequency_hz: f32,
    pub duration_s: f32,
}

impl ToneEvent {
    pub const fn new(frequency_hz: f32, duration_s: f32) -> Self {
        Self { frequency_hz, duration_s }
    }

    pub const fn silence(duration_s: f32) -> Self {
        Self { frequency_hz: 0.0, duration_s }
    }

    pub fn is_silence(&self) -> bool {
        self.frequency_hz == 0.0
    }

    /// Sample count, truncated.
    pub fn num_samples(&self) -> usize {
        sample_count(self.duration_s)
    }
}

pub fn sample_count(duration_s: f32) -> usize {
    let n = duration_s * SAMPLE_RATE as f32;
    if n > 0.0 {
        n as usize
    } else {
        0
    }
}

/// Peak amplitude for a tone, compensating for low pitches sounding quieter.
///
/// Below 800 Hz the amplitude doubles; from 800 to 1100 Hz it ramps up
/// linearly from zero; above that it is left alone.
pub fn loudness_amplitude(frequency_hz: f32, volume: u8) -> i32 {
    let amplitude = (BASE_AMPLITUDE as f32 * (volume as f32 / 10.0)) as i32;
    if frequency_hz < 800.0 {
        amplitude * 2
    } else if frequency_hz < 1100.0 {
        (amplitude as f32 * (frequency_hz - 800.0) / 300.0) as i32
    } else {
        amplitude
    }
}

/// Sample `i` of an `n`-sample sine with linear fade in and out.
pub fn tone_sample(i: usize, n: usize, frequency_hz: f64, amplitude: f64) -> i16 {
    let frac = i as f64 / n as f64;
    let amp = if frac < FADE_FRACTION {
        amplitude * (frac / FADE_FRACTION)
    } else if frac > 1.0 - FADE_FRACTION {
        amplitude * (1.0 - (frac - (1.0 - FADE_FRACTION)) / FADE_FRACTION)
    } else {
        amplitude
    };
    let phase = 2.0 * PI * frequency_hz * i as f64 / SAMPLE_RATE as f64;
    (amp * libm::sin(phase)) as i16
}

#[derive(Clone, Copy, Debug)]
enum Waveform {
    Silence,
    Sine { frequency_hz: f64, amplitude: f64 },
}

#[derive(Clone, Copy, Debug)]
struct ToneJob {
    waveform: Waveform,
    position: usize,
    total: usize,
}

/// Renders tone events into a [`FrameWriter`].
#[derive(Debug)]
pub struct Synthesizer {
    job: Option<ToneJob>,
    max_samples: usize,
}

impl Synthesizer {
    /// `max_samples` caps a single event; longer events are shortened.
    pub fn new(max_samples: usize) -> Self {
        Self { job: None, max_samples }
    }

    /// A tone is partially written.
    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Samples of the current tone still to write.
    pub fn remaining(&self) -> usize {
        self.job.map_or(0, |job| job.total - job.position)
    }

    /// Start `event` if the ring has room for all of it.
    ///
    /// Returns false, and changes nothing, when space is short.
    pub fn begin(&mut self, event: &ToneEvent, volume: u8, writer: &FrameWriter) -> bool {
        let mut total = event.num_samples();
        if total > self.max_samples {
            log::warn!(
                "tone of {} samples exceeds buffer, shortened to {}",
                total,
                self.max_samples
            );
            total = self.max_samples;
        }
        if !writer.try_begin_write(total) {
            return false;
        }

        let waveform = if event.is_silence() {
            Waveform::Silence
        } else {
            Waveform::Sine {
                frequency_hz: event.frequency_hz as f64,
                amplitude: loudness_amplitude(event.frequency_hz, volume) as f64,
            }
        };
        self.job = Some(ToneJob { waveform, position: 0, total });
        true
    }

    /// Write up to `budget` samples of the current tone.
    ///
    /// Returns true once the tone is complete (or when idle).
    pub fn render(&mut self, writer: &mut FrameWriter, budget: usize) -> bool {
        let Some(job) = self.job.as_mut() else {
            return true;
        };

        let end = job.total.min(job.position.saturating_add(budget));
        match job.waveform {
            Waveform::Silence => {
                for _ in job.position..end {
                    writer.append_sample(0);
                }
            }
            Waveform::Sine { frequency_hz, amplitude } => {
                for i in job.position..end {
                    writer.append_sample(tone_sample(i, job.total, frequency_hz, amplitude));
                }
            }
        }
        job.position = end;

        if job.position == job.total {
            self.job = None;
            true
        } else {
            false
        }
    }

    /// Start a silence without a space check and write it all.
    pub fn render_silence(&mut self, writer: &mut FrameWriter, duration_s: f32) {
        self.job = Some(ToneJob {
            waveform: Waveform::Silence,
            position: 0,
            total: sample_count(duration_s).min(self.max_samples),
        });
        self.render(writer, usize::MAX);
    }

    /// Start a tone without a space check and write it all.
    pub fn render_tone(
        &mut self,
        writer: &mut FrameWriter,
        duration_s: f32,
        frequency_hz: f32,
        volume: u8,
    ) {
        self.job = Some(ToneJob {
            waveform: Waveform::Sine {
                frequency_hz: frequency_hz as f64,
                amplitude: loudness_amplitude(frequency_hz, volume) as f64,
            },
            position: 0,
            total: sample_count(duration_s).min(self.max_samples),
        });
        self.render(writer, usize::MAX);
    }

    /// Abandon any partially written tone.
    pub fn cancel(&mut self) {
        self.job = None;
    }
}

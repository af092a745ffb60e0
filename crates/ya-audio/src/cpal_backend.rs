//! CPAL-based audio output backend.
//!
//! The device plays continuously once opened. Between the engine's output
//! task and the device callback sits a small sample FIFO sized to two
//! engine frames, so "frame done" means there is room for another frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use ya_engine::{Frame, OutputControl, OutputSink, FRAME_SIZE, SAMPLE_RATE};

use crate::error::AudioError;

const FIFO_FRAMES: usize = 2;
const POLL_INTERVAL: Duration = Duration::from_micros(200);

/// Opens the default output device.
pub struct CpalOutput;

impl CpalOutput {
    /// Open the default device and split it into its control and data halves.
    ///
    /// The control half owns the stream and must stay on the thread that
    /// created it. The sink half can be moved to the output thread.
    pub fn new() -> Result<(CpalControl, CpalSink), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .into();
        let device_rate = config.sample_rate.0;
        let channels = config.channels as usize;
        log::info!(
            "audio device: {} Hz, {} channel(s), source {} Hz",
            device_rate,
            channels,
            SAMPLE_RATE
        );

        let rb = HeapRb::<i16>::new(FIFO_FRAMES * FRAME_SIZE);
        let (producer, consumer) = rb.split();
        let running = Arc::new(AtomicBool::new(false));

        let stream = build_stream(&device, &config, consumer, running.clone())?;
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;

        let control = CpalControl {
            _stream: stream,
            running: running.clone(),
            device_rate,
        };
        let sink = CpalSink { producer, running };
        Ok((control, sink))
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: HeapCons<i16>,
    running: Arc<AtomicBool>,
) -> Result<Stream, AudioError> {
    let channels = config.channels as usize;
    let mut resampler = SampleHold::new(SAMPLE_RATE, config.sample_rate.0);

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    consumer.clear();
                    resampler.reset();
                    data.fill(0.0);
                    return;
                }

                for chunk in data.chunks_mut(channels) {
                    let sample = resampler.next(|| consumer.try_pop());
                    chunk.fill(sample);
                }
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamCreate(e.to_string()))
}

/// Sample-and-hold rate conversion from the engine rate to the device rate.
struct SampleHold {
    source_rate: u32,
    device_rate: u32,
    phase: u32,
    held: f32,
}

impl SampleHold {
    fn new(source_rate: u32, device_rate: u32) -> Self {
        Self {
            source_rate,
            device_rate,
            phase: device_rate.saturating_sub(source_rate),
            held: 0.0,
        }
    }

    fn reset(&mut self) {
        self.phase = self.device_rate.saturating_sub(self.source_rate);
        self.held = 0.0;
    }

    /// Produce one device sample, pulling source samples as the phase wraps.
    fn next(&mut self, mut pop: impl FnMut() -> Option<i16>) -> f32 {
        self.phase += self.source_rate;
        while self.phase >= self.device_rate {
            self.phase -= self.device_rate;
            // Underrun plays silence.
            self.held = pop().map_or(0.0, |s| s as f32 / 32768.0);
        }
        self.held
    }
}

/// Start/stop half of the cpal output.
pub struct CpalControl {
    /// Plays from creation until dropped.
    _stream: Stream,
    running: Arc<AtomicBool>,
    device_rate: u32,
}

impl CpalControl {
    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

impl OutputControl for CpalControl {
    fn start(&mut self) {
        self.running.store(true, Ordering::Relaxed);
    }

    fn stop(&mut self) {
        // The callback keeps running and discards what the FIFO holds.
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Data half of the cpal output, fed by the output task.
pub struct CpalSink {
    producer: HeapProd<i16>,
    running: Arc<AtomicBool>,
}

impl OutputSink for CpalSink {
    fn wait_frame_done(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.producer.vacant_len() >= FRAME_SIZE {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn accept_frame(&mut self, frame: &Frame) {
        let mut rest: &[i16] = frame.samples();
        while !rest.is_empty() {
            let pushed = self.producer.push_slice(rest);
            rest = &rest[pushed..];
            if !rest.is_empty() {
                if !self.running.load(Ordering::Relaxed) {
                    // Stopped mid-frame: the remainder would be discarded anyway.
                    return;
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

//! Output collaborator traits and the real-time output task.
//!
//! The peripheral is split along the two execution contexts: the engine
//! starts and stops it through [`OutputControl`], while the output task
//! feeds it frames through [`OutputSink`].

use core::time::Duration;

use crate::frame::Frame;
use crate::ring_buffer::FrameReader;

/// Start/stop side of the output peripheral.
pub trait OutputControl {
    fn start(&mut self);

    /// Halt output and discard anything the peripheral still holds.
    fn stop(&mut self);
}

/// Data side of the output peripheral.
pub trait OutputSink {
    /// Wait up to `timeout` for the peripheral to finish a frame.
    fn wait_frame_done(&mut self, timeout: Duration) -> bool;

    /// Hand over one frame, blocking until accepted.
    fn accept_frame(&mut self, frame: &Frame);
}

/// Output that goes nowhere, for headless engines.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOutput;

impl OutputControl for NullOutput {
    fn start(&mut self) {}

    fn stop(&mut self) {}
}

/// Moves frames from the ring buffer to the sink, one per completion signal.
pub struct OutputTask<S> {
    reader: FrameReader,
    sink: S,
    timeout: Duration,
    frames_sent: u64,
}

impl<S: OutputSink> OutputTask<S> {
    pub fn new(reader: FrameReader, sink: S, timeout: Duration) -> Self {
        Self {
            reader,
            sink,
            timeout,
            frames_sent: 0,
        }
    }

    /// Wait once for the signal and transfer at most one frame.
    ///
    /// Returns true if a frame was handed to the sink.
    pub fn poll_once(&mut self) -> bool {
        if !self.sink.wait_frame_done(self.timeout) {
            return false;
        }
        match self.reader.take_frame() {
            Some(frame) => {
                self.sink.accept_frame(frame);
                self.frames_sent += 1;
                true
            }
            None => false,
        }
    }

    /// Poll until `keep_running` returns false.
    pub fn run(&mut self, mut keep_running: impl FnMut() -> bool) {
        while keep_running() {
            #[cfg(feature = "alloc_check")]
            assert_no_alloc::assert_no_alloc(|| self.poll_once());
            #[cfg(not(feature = "alloc_check"))]
            self.poll_once();
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_parts(self) -> (FrameReader, S) {
        (self.reader, self.sink)
    }
}

//! Single-producer/single-consumer frame ring.
//!
//! The producer writes individual samples; availability is published to the
//! consumer one whole frame at a time. The consumer takes whole frames.
//! Each side owns its own cursor. The one value both sides update is a
//! packed state word holding the populated-frame count in its low bits and
//! a reset epoch above them, so a reset and a take can never interleave
//! into a miscount. Sample storage is atomic too so the two halves can live
//! on different threads without `unsafe`.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicI16, AtomicUsize, Ordering};

use crate::frame::{Frame, FRAME_SIZE};

const COUNT_BITS: u32 = usize::BITS / 2;
const COUNT_MASK: usize = (1 << COUNT_BITS) - 1;
const EPOCH_ONE: usize = 1 << COUNT_BITS;

/// Largest ring the packed state word can count.
pub const MAX_RING_FRAMES: usize = COUNT_MASK;

fn count_of(state: usize) -> usize {
    state & COUNT_MASK
}

fn epoch_of(state: usize) -> usize {
    state >> COUNT_BITS
}

struct Shared {
    samples: Box<[AtomicI16]>,
    num_frames: usize,
    /// Next sample slot to write. Producer-owned.
    write_idx: AtomicUsize,
    /// Reset epoch and populated-frame count.
    state: AtomicUsize,
}

/// Create a ring of `num_frames` frames and split it into its two halves.
///
/// `num_frames` is clamped to `2..=MAX_RING_FRAMES`.
pub fn ring_buffer(num_frames: usize) -> (FrameWriter, FrameReader) {
    let num_frames = num_frames.clamp(2, MAX_RING_FRAMES);
    let samples: Vec<AtomicI16> = (0..num_frames * FRAME_SIZE)
        .map(|_| AtomicI16::new(0))
        .collect();
    let shared = Arc::new(Shared {
        samples: samples.into_boxed_slice(),
        num_frames,
        write_idx: AtomicUsize::new(0),
        state: AtomicUsize::new(0),
    });

    let writer = FrameWriter { shared: shared.clone() };
    let reader = FrameReader {
        shared,
        read_frame: 0,
        epoch: 0,
        scratch: Box::new(Frame::silence()),
    };
    (writer, reader)
}

/// Producer half: owned by the driving tick.
pub struct FrameWriter {
    shared: Arc<Shared>,
}

impl FrameWriter {
    pub fn capacity_frames(&self) -> usize {
        self.shared.num_frames
    }

    pub fn populated_frames(&self) -> usize {
        count_of(self.shared.state.load(Ordering::Acquire))
    }

    /// Samples that can be written without touching unconsumed data.
    ///
    /// One frame is held back: the frame the write cursor is currently
    /// filling, which may also be the frame the consumer is draining.
    pub fn free_samples(&self) -> usize {
        self.shared
            .num_frames
            .saturating_sub(self.populated_frames() + 1)
            * FRAME_SIZE
    }

    /// Whether a write of `num_samples` may begin now.
    pub fn try_begin_write(&self, num_samples: usize) -> bool {
        self.free_samples() > num_samples
    }

    /// Write one sample at the cursor. Completing a frame publishes it.
    pub fn append_sample(&mut self, value: i16) {
        let shared = &*self.shared;
        let idx = shared.write_idx.load(Ordering::Relaxed);
        shared.samples[idx].store(value, Ordering::Relaxed);

        let next = (idx + 1) % shared.samples.len();
        shared.write_idx.store(next, Ordering::Relaxed);
        if next % FRAME_SIZE == 0 {
            shared.state.fetch_add(1, Ordering::Release);
        }
    }

    /// Samples written into the frame that is not yet published.
    pub fn partial_samples(&self) -> usize {
        self.shared.write_idx.load(Ordering::Relaxed) % FRAME_SIZE
    }

    /// Drop all buffered audio and rewind the write cursor.
    ///
    /// Starts a new epoch; the reader rewinds its own cursor when it sees
    /// it. A frame the reader already claimed may still be delivered once.
    pub fn reset(&mut self) {
        let shared = &*self.shared;
        shared.write_idx.store(0, Ordering::Relaxed);
        let _ = shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                Some((s & !COUNT_MASK).wrapping_add(EPOCH_ONE))
            });
    }
}

impl fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameWriter")
            .field("capacity_frames", &self.capacity_frames())
            .field("populated_frames", &self.populated_frames())
            .field("partial_samples", &self.partial_samples())
            .finish()
    }
}

/// Consumer half: owned by the output task.
pub struct FrameReader {
    shared: Arc<Shared>,
    /// Next frame to hand out.
    read_frame: usize,
    /// Epoch `read_frame` belongs to.
    epoch: usize,
    scratch: Box<Frame>,
}

impl FrameReader {
    pub fn populated_frames(&self) -> usize {
        count_of(self.shared.state.load(Ordering::Acquire))
    }

    /// Take the oldest published frame, or `None` when nothing is ready.
    pub fn take_frame(&mut self) -> Option<&Frame> {
        let shared = &*self.shared;
        let state = shared.state.load(Ordering::Acquire);
        let epoch = epoch_of(state);
        if epoch != self.epoch {
            self.epoch = epoch;
            self.read_frame = 0;
        }
        if count_of(state) == 0 {
            return None;
        }

        let start = self.read_frame * FRAME_SIZE;
        let src = &shared.samples[start..start + FRAME_SIZE];
        for (dst, s) in self.scratch.samples_mut().iter_mut().zip(src) {
            *dst = s.load(Ordering::Relaxed);
        }

        // Claim the frame. Fails if a reset started a new epoch during the
        // copy, in which case the copy may be torn and is dropped.
        let claimed = shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (epoch_of(s) == epoch && count_of(s) > 0).then(|| s - 1)
            })
            .is_ok();
        if !claimed {
            return None;
        }

        self.read_frame = (self.read_frame + 1) % shared.num_frames;
        Some(&self.scratch)
    }
}

impl fmt::Debug for FrameReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameReader")
            .field("populated_frames", &self.populated_frames())
            .field("read_frame", &self.read_frame)
            .finish()
    }
}

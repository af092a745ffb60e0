//! Integration test: notation text -> engine -> output task -> sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use ya_engine::{
    Engine, EngineConfig, Frame, MemoryStorage, Mode, NullOutput, OutputSink, OutputTask,
    PlaybackError, FRAME_SIZE, SAMPLE_RATE,
};
use ya_master::render_notes;

/// Collects every sample it is handed.
#[derive(Default)]
struct RecordingSink {
    samples: Vec<i16>,
}

impl OutputSink for RecordingSink {
    fn wait_frame_done(&mut self, _timeout: Duration) -> bool {
        // Pace the consumer a little so the ring actually fills up.
        thread::sleep(Duration::from_micros(50));
        true
    }

    fn accept_frame(&mut self, frame: &Frame) {
        self.samples.extend_from_slice(frame.samples());
    }
}

/// Play `text` with the output task on its own thread.
fn play_threaded(text: &str, config: EngineConfig) -> Vec<i16> {
    let timeout = config.signal_timeout();
    let (mut engine, reader) = Engine::new(config, MemoryStorage::new(), NullOutput).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let output = thread::spawn(move || {
        let mut task = OutputTask::new(reader, RecordingSink::default(), timeout);
        task.run(|| !stop_flag.load(Ordering::Relaxed));
        task.into_parts().1.samples
    });

    engine.submit_notes(text).unwrap();
    while engine.is_playing() {
        engine.tick();
        thread::yield_now();
    }

    stop.store(true, Ordering::Relaxed);
    output.join().unwrap()
}

fn dominant_frequency(samples: &[i16]) -> f32 {
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] < 0) != (w[1] < 0))
        .count();
    crossings as f32 / 2.0 / (samples.len() as f32 / SAMPLE_RATE as f32)
}

#[test]
fn threaded_playback_matches_offline_render() {
    let text = "T180 O5 C8 E8 G8 >C4";
    let offline = render_notes(text, EngineConfig::default()).unwrap();
    let live = play_threaded(text, EngineConfig::default());
    assert_eq!(live.len(), offline.len());
    assert_eq!(live, offline);
}

#[test]
fn small_buffer_still_plays_everything() {
    let config = EngineConfig {
        buffer_frames: 4,
        wave_low_water_frames: 2,
        render_slice_samples: 256,
        ..EngineConfig::default()
    };
    let text = "T240 C16 D16 E16 F16 G16";
    let live = play_threaded(text, config.clone());
    let offline = render_notes(text, config).unwrap();
    assert_eq!(live, offline);
}

#[test]
fn a440_pitch() {
    let samples = render_notes("O4 X440M500", EngineConfig::default()).unwrap();
    // Skip the fade edges.
    let body = &samples[1000..7000];
    assert_relative_eq!(dominant_frequency(body), 440.0, max_relative = 0.02);
}

#[test]
fn octave_doubles_pitch() {
    let low = render_notes("O4 A2", EngineConfig::default()).unwrap();
    let high = render_notes("O5 A2", EngineConfig::default()).unwrap();
    let f_low = dominant_frequency(&low[2000..14000]);
    let f_high = dominant_frequency(&high[2000..14000]);
    assert_relative_eq!(f_high / f_low, 2.0, max_relative = 0.02);
}

#[test]
fn rest_is_silent() {
    let samples = render_notes("R4 R4", EngineConfig::default()).unwrap();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn queued_text_continues_playback() {
    let (mut engine, mut reader) =
        Engine::new(EngineConfig::default(), MemoryStorage::new(), NullOutput).unwrap();
    engine.submit_notes("C8").unwrap();
    engine.tick();
    engine.submit_notes("D8").unwrap();
    assert_eq!(engine.mode(), Mode::PlayingNotes);
    // Only one end rest is ever pending.
    assert_eq!(engine.interpreter().pending().matches('z').count(), 1);

    let mut frames = 0;
    while engine.is_playing() {
        engine.tick();
        while reader.take_frame().is_some() {
            frames += 1;
        }
    }
    // Two 0.25 s notes plus the 0.2 s end rest.
    assert_eq!(frames, (SAMPLE_RATE as usize * 7 / 10) / FRAME_SIZE);
}

#[test]
fn notes_overflow_leaves_queue_intact() {
    let config = EngineConfig {
        max_pending_notes: 10,
        ..EngineConfig::default()
    };
    let (mut engine, _reader) = Engine::new(config, MemoryStorage::new(), NullOutput).unwrap();
    engine.submit_notes("CDEF").unwrap();
    let before = engine.interpreter().pending().to_owned();

    let err = engine.submit_notes("CDEFGAB").unwrap_err();
    assert!(matches!(err, PlaybackError::NotesOverflow { .. }));
    assert_eq!(engine.interpreter().pending(), before);
    assert!(engine.is_playing());
}

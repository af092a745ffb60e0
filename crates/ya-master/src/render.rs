//! Offline rendering through a headless engine.
//!
//! The output task is replaced by draining the ring on the calling thread
//! after every tick, so the result is exactly what a device would be fed.

use ya_engine::{Engine, EngineConfig, FrameReader, MemoryStorage, NullOutput, Storage, SAMPLE_RATE};
use ya_formats::mono_samples_to_wav;

use crate::error::Error;

/// Render notation text to 16 kHz mono samples.
pub fn render_notes(text: &str, config: EngineConfig) -> Result<Vec<i16>, Error> {
    let (mut engine, mut reader) = Engine::new(config, MemoryStorage::new(), NullOutput)?;
    engine.submit_notes(text)?;
    Ok(drain(&mut engine, &mut reader))
}

/// Render notation text to a complete mono WAVE file image.
pub fn render_notes_to_wav(text: &str, config: EngineConfig) -> Result<Vec<u8>, Error> {
    let samples = render_notes(text, config)?;
    Ok(mono_samples_to_wav(&samples, SAMPLE_RATE))
}

/// Stream a WAVE file from `storage` and collect what the device would get.
pub fn render_wave<S: Storage>(
    storage: S,
    path: &str,
    config: EngineConfig,
) -> Result<Vec<i16>, Error> {
    let (mut engine, mut reader) = Engine::new(config, storage, NullOutput)?;
    engine.play_file(path)?;
    Ok(drain(&mut engine, &mut reader))
}

fn drain<S: Storage>(engine: &mut Engine<S, NullOutput>, reader: &mut FrameReader) -> Vec<i16> {
    let mut samples = Vec::new();
    while engine.is_playing() {
        engine.tick();
        while let Some(frame) = reader.take_frame() {
            samples.extend_from_slice(frame.samples());
        }
    }
    log::debug!("rendered {} samples", samples.len());
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ya_engine::{PlaybackError, FRAME_SIZE};

    fn seconds(samples: &[i16]) -> f32 {
        samples.len() as f32 / SAMPLE_RATE as f32
    }

    #[test]
    fn quarter_note_renders_whole_frames() {
        let samples = render_notes("C4", EngineConfig::default()).unwrap();
        assert_eq!(samples.len() % FRAME_SIZE, 0);
        // 0.5 s tone plus the 0.2 s end rest, minus the unpublished tail.
        assert_eq!(samples.len(), 10 * FRAME_SIZE);
        assert!(samples[..8000].iter().any(|&s| s != 0));
        assert!(samples[8000..].iter().all(|&s| s == 0));
    }

    #[test]
    fn tempo_scales_duration() {
        let slow = render_notes("T60 C4 C4", EngineConfig::default()).unwrap();
        let fast = render_notes("T240 C4 C4", EngineConfig::default()).unwrap();
        assert_relative_eq!(seconds(&slow), 2.2, epsilon = 0.07);
        assert_relative_eq!(seconds(&fast), 0.7, epsilon = 0.07);
    }

    #[test]
    fn syntax_error_ends_early() {
        let full = render_notes("C4 D4 E4", EngineConfig::default()).unwrap();
        let cut = render_notes("C4 D4 ? E4", EngineConfig::default()).unwrap();
        assert!(cut.len() < full.len());
    }

    #[test]
    fn overflowing_text_is_rejected() {
        let config = EngineConfig {
            max_pending_notes: 8,
            ..EngineConfig::default()
        };
        let err = render_notes("CDEFGABCDEFGAB", config).unwrap_err();
        assert!(matches!(err, Error::Playback(PlaybackError::NotesOverflow { .. })));
    }

    #[test]
    fn wav_image_has_header_and_samples() {
        let wav = render_notes_to_wav("C8", EngineConfig::default()).unwrap();
        let samples = render_notes("C8", EngineConfig::default()).unwrap();
        assert_eq!(wav.len(), 44 + samples.len() * 2);
        assert_eq!(&wav[0..4], b"RIFF");
    }

    #[test]
    fn wave_render_passes_frames_through() {
        let source: Vec<i16> = (0..4 * FRAME_SIZE).map(|i| (i % 512) as i16 * 10).collect();
        let mut storage = MemoryStorage::new();
        storage.insert("beep.wav", mono_samples_to_wav(&source, SAMPLE_RATE));

        let config = EngineConfig {
            wave_volume: 10,
            ..EngineConfig::default()
        };
        let out = render_wave(storage, "beep.wav", config).unwrap();
        assert_eq!(out.len(), source.len());
        assert_eq!(out[0], source[1]);
        assert_eq!(out[1], source[0]);
    }

    #[test]
    fn missing_wave_is_an_error() {
        let err = render_wave(MemoryStorage::new(), "nope.wav", EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Playback(PlaybackError::FileNotFound)));
    }
}

//! Notation interpreter.
//!
//! Consumes a pending notation string left to right and yields one
//! [`ToneEvent`] per decode. Tempo, octave and volume persist between
//! decodes and across submissions.
//!
//! Grammar (case-insensitive unless noted):
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `O<d>` | octave 4-7 (always consumes two characters) |
//! | `T<int>` | tempo 40-240 BPM |
//! | `V<int>` | volume 1-10 |
//! | `!` | reset tempo, octave and volume |
//! | `A`-`G`, `R` | note or rest, then modifiers `<int>` `.` `>` `<` `#` `+` `-` |
//! | `z` (lowercase) | 0.2 s end-of-sequence rest |
//! | `X<float>[M<float>]` | explicit frequency in Hz, optional duration in ms |
//!
//! Out-of-range values are consumed and ignored. Any other character
//! discards the rest of the pending text.

use alloc::string::String;
use core::fmt;

use crate::error::PlaybackError;
use crate::synth::ToneEvent;

pub const DEFAULT_TEMPO: u16 = 120;
pub const DEFAULT_OCTAVE: u8 = 5;
pub const DEFAULT_VOLUME: u8 = 5;

pub const MIN_TEMPO: u16 = 40;
pub const MAX_TEMPO: u16 = 240;
pub const MIN_OCTAVE: u8 = 4;
pub const MAX_OCTAVE: u8 = 7;
pub const MIN_VOLUME: u8 = 1;
pub const MAX_VOLUME: u8 = 10;

const MIN_DIVISOR: i64 = 1;
const MAX_DIVISOR: i64 = 2000;

const MIN_EXPLICIT_HZ: f32 = 20.0;
const MAX_EXPLICIT_HZ: f32 = 20_000.0;

/// Appended to every submission so the last note is pushed out of a
/// partially filled frame.
pub const END_REST: char = 'z';
pub const END_REST_DURATION_S: f32 = 0.2;

/// 2^(1/12)
const SEMITONE_RATIO: f32 = 1.059_463_1;

/// Frequencies of A-G at octave 4.
const NOTE_TABLE: [(u8, f32); 7] = [
    (b'A', 440.0),
    (b'B', 493.88),
    (b'C', 523.25),
    (b'D', 587.33),
    (b'E', 659.25),
    (b'F', 698.46),
    (b'G', 783.99),
];

const CONTEXT_LEN: usize = 16;

/// Where interpretation stopped on an unrecognized character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    /// Byte offset into the pending text at the time of the error.
    pub offset: usize,
    /// The offending character, `None` if the text ended mid-token.
    pub found: Option<char>,
    /// The start of the discarded text.
    pub context: heapless::String<CONTEXT_LEN>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(c) => write!(f, "unexpected {:?} at offset {}", c, self.offset)?,
            None => write!(f, "unexpected end of notes at offset {}", self.offset)?,
        }
        write!(f, " near {:?}", self.context.as_str())
    }
}

/// Incremental notation decoder with persistent tempo/octave/volume.
#[derive(Clone, Debug)]
pub struct NotationInterpreter {
    text: String,
    /// Bytes of `text` already consumed.
    pos: usize,
    max_pending: usize,
    tempo: u16,
    octave: u8,
    volume: u8,
    decoded: Option<ToneEvent>,
    last_error: Option<SyntaxError>,
}

impl NotationInterpreter {
    /// `max_pending` bounds the characters held at once.
    pub fn new(max_pending: usize) -> Self {
        Self {
            text: String::with_capacity(max_pending + 1),
            pos: 0,
            max_pending,
            tempo: DEFAULT_TEMPO,
            octave: DEFAULT_OCTAVE,
            volume: DEFAULT_VOLUME,
            decoded: None,
            last_error: None,
        }
    }

    pub fn tempo(&self) -> u16 {
        self.tempo
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Text not yet interpreted.
    pub fn pending(&self) -> &str {
        &self.text[self.pos..]
    }

    pub fn has_pending(&self) -> bool {
        self.pos < self.text.len()
    }

    /// The most recent syntax error, kept until the next one.
    pub fn last_error(&self) -> Option<&SyntaxError> {
        self.last_error.as_ref()
    }

    /// Append notes, keeping exactly one end rest at the tail.
    ///
    /// Fails without changing anything when the pending text would exceed
    /// the configured bound.
    pub fn push_notes(&mut self, notes: &str) -> Result<(), PlaybackError> {
        let pending = self.text.len() - self.pos;
        if pending + notes.len() > self.max_pending {
            return Err(PlaybackError::NotesOverflow {
                pending,
                incoming: notes.len(),
                max: self.max_pending,
            });
        }

        self.text.replace_range(..self.pos, "");
        self.pos = 0;
        if self.text.ends_with(END_REST) {
            self.text.pop();
        }
        self.text.push_str(notes);
        self.text.push(END_REST);
        Ok(())
    }

    /// Reset tempo, octave and volume to their defaults.
    pub fn set_defaults(&mut self) {
        self.tempo = DEFAULT_TEMPO;
        self.octave = DEFAULT_OCTAVE;
        self.volume = DEFAULT_VOLUME;
    }

    /// Drop pending text and any decoded tone. Settings are kept.
    pub fn clear(&mut self) {
        self.text.clear();
        self.pos = 0;
        self.decoded = None;
    }

    /// The decoded tone awaiting rendering.
    pub fn decoded(&self) -> Option<ToneEvent> {
        self.decoded
    }

    /// Decode the next tone, unless one is already waiting.
    ///
    /// Repeated calls return the same tone until [`commit`](Self::commit).
    pub fn step(&mut self) -> Option<ToneEvent> {
        if self.decoded.is_none() {
            self.decoded = self.decode_next();
        }
        self.decoded
    }

    /// Mark the decoded tone as rendered.
    pub fn commit(&mut self) {
        self.decoded = None;
    }

    fn decode_next(&mut self) -> Option<ToneEvent> {
        loop {
            let c = self.peek()?;
            match c {
                c if is_space(c) => self.advance(1),
                b'O' | b'o' => {
                    // The argument is one character, whatever its width.
                    self.advance(1);
                    let arg = self.pending().chars().next();
                    self.advance(arg.map_or(0, char::len_utf8));
                    if let Some(d @ '0'..='9') = arg {
                        let octave = d as u8 - b'0';
                        if (MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
                            self.octave = octave;
                        }
                    }
                }
                b'T' | b't' => {
                    self.advance(1);
                    let Some(tempo) = self.parse_int() else {
                        return self.syntax_error();
                    };
                    if (MIN_TEMPO as i64..=MAX_TEMPO as i64).contains(&tempo) {
                        self.tempo = tempo as u16;
                    }
                }
                b'V' | b'v' => {
                    self.advance(1);
                    let Some(volume) = self.parse_int() else {
                        return self.syntax_error();
                    };
                    if (MIN_VOLUME as i64..=MAX_VOLUME as i64).contains(&volume) {
                        self.volume = volume as u8;
                    }
                }
                b'!' => {
                    self.set_defaults();
                    self.advance(1);
                }
                b'A'..=b'G' | b'a'..=b'g' | b'R' | b'r' | b'z' => {
                    return Some(self.decode_note(c));
                }
                b'X' | b'x' => {
                    self.advance(1);
                    return self.decode_explicit();
                }
                _ => return self.syntax_error(),
            }
        }
    }

    /// Quarter-note length at the current tempo.
    fn beat_duration(&self) -> f32 {
        60.0 / self.tempo as f32
    }

    fn decode_note(&mut self, letter: u8) -> ToneEvent {
        self.advance(1);

        let mut duration = self.beat_duration();
        let mut frequency = match letter {
            b'z' => {
                duration = END_REST_DURATION_S;
                0.0
            }
            b'R' | b'r' => 0.0,
            _ => {
                let upper = letter.to_ascii_uppercase();
                NOTE_TABLE
                    .iter()
                    .find(|(name, _)| *name == upper)
                    .map_or(0.0, |&(_, hz)| hz)
            }
        };
        frequency *= (1u32 << (self.octave - MIN_OCTAVE)) as f32;

        // Each dot adds half of what the previous one added.
        let mut dot = duration;
        loop {
            match self.peek() {
                Some(b'0'..=b'9') => {
                    let divisor = self.parse_int().unwrap_or(0);
                    if (MIN_DIVISOR..=MAX_DIVISOR).contains(&divisor) {
                        duration *= 4.0 / divisor as f32;
                        dot = duration;
                    }
                }
                Some(b'.') => {
                    dot /= 2.0;
                    duration += dot;
                    self.advance(1);
                }
                Some(b'>') => {
                    frequency *= 2.0;
                    self.advance(1);
                }
                Some(b'<') => {
                    frequency /= 2.0;
                    self.advance(1);
                }
                Some(b'#' | b'+') => {
                    frequency *= SEMITONE_RATIO;
                    self.advance(1);
                }
                Some(b'-') => {
                    frequency /= SEMITONE_RATIO;
                    self.advance(1);
                }
                _ => break,
            }
        }

        ToneEvent::new(frequency, duration)
    }

    fn decode_explicit(&mut self) -> Option<ToneEvent> {
        let Some(mut frequency) = self.parse_float() else {
            return self.syntax_error();
        };
        if !(MIN_EXPLICIT_HZ..=MAX_EXPLICIT_HZ).contains(&frequency) {
            frequency = 0.0;
        }

        let mut duration = self.beat_duration();
        if matches!(self.peek(), Some(b'M' | b'm')) {
            self.advance(1);
            let Some(ms) = self.parse_float() else {
                return self.syntax_error();
            };
            duration = ms / 1000.0;
        }
        Some(ToneEvent::new(frequency, duration))
    }

    /// Record the error, discard everything pending, decode nothing.
    fn syntax_error(&mut self) -> Option<ToneEvent> {
        let rest = self.pending();
        let mut context = heapless::String::new();
        for c in rest.chars() {
            if context.push(c).is_err() {
                break;
            }
        }
        let error = SyntaxError {
            offset: self.pos,
            found: rest.chars().next(),
            context,
        };
        log::warn!("syntax error in notes: {}", error);
        self.last_error = Some(error);

        self.text.clear();
        self.pos = 0;
        None
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    /// Integer literal: optional leading space and sign, then digits.
    /// Saturates instead of overflowing.
    fn parse_int(&mut self) -> Option<i64> {
        let bytes = self.text.as_bytes();
        let mut i = self.pos;
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        let negative = match bytes.get(i) {
            Some(b'-') => {
                i += 1;
                true
            }
            Some(b'+') => {
                i += 1;
                false
            }
            _ => false,
        };

        let digits_start = i;
        let mut value: i64 = 0;
        while let Some(&b @ b'0'..=b'9') = bytes.get(i) {
            value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
            i += 1;
        }
        if i == digits_start {
            return None;
        }

        self.pos = i;
        Some(if negative { -value } else { value })
    }

    /// Decimal float literal: optional leading space and sign, digits with
    /// an optional fraction, then an optional exponent.
    fn parse_float(&mut self) -> Option<f32> {
        let bytes = self.text.as_bytes();
        let mut i = self.pos;
        while i < bytes.len() && is_space(bytes[i]) {
            i += 1;
        }
        let start = i;
        if matches!(bytes.get(i), Some(b'-' | b'+')) {
            i += 1;
        }

        let mut digits = 0;
        while matches!(bytes.get(i), Some(b'0'..=b'9')) {
            i += 1;
            digits += 1;
        }
        if bytes.get(i) == Some(&b'.') {
            i += 1;
            while matches!(bytes.get(i), Some(b'0'..=b'9')) {
                i += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return None;
        }

        // Exponent only counts when digits follow it.
        if matches!(bytes.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(bytes.get(j), Some(b'-' | b'+')) {
                j += 1;
            }
            if matches!(bytes.get(j), Some(b'0'..=b'9')) {
                while matches!(bytes.get(j), Some(b'0'..=b'9')) {
                    j += 1;
                }
                i = j;
            }
        }

        let value = self.text[start..i].parse::<f32>().ok()?;
        self.pos = i;
        Some(value)
    }
}

fn is_space(c: u8) -> bool {
    c.is_ascii_whitespace() || c == 0x0b
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn interp(notes: &str) -> NotationInterpreter {
        let mut it = NotationInterpreter::new(4000);
        it.push_notes(notes).unwrap();
        it
    }

    /// Decode and commit every tone in the pending text.
    fn decode_all(it: &mut NotationInterpreter) -> alloc::vec::Vec<ToneEvent> {
        let mut out = alloc::vec::Vec::new();
        while it.has_pending() {
            if let Some(tone) = it.step() {
                out.push(tone);
                it.commit();
            }
        }
        out
    }

    #[test]
    fn defaults() {
        let it = NotationInterpreter::new(10);
        assert_eq!(it.tempo(), 120);
        assert_eq!(it.octave(), 5);
        assert_eq!(it.volume(), 5);
        assert!(!it.has_pending());
    }

    #[test]
    fn submission_gets_end_rest() {
        let it = interp("CDE");
        assert_eq!(it.pending(), "CDEz");
    }

    #[test]
    fn second_submission_concatenates_with_one_end_rest() {
        let mut it = interp("CD");
        it.push_notes("EF").unwrap();
        assert_eq!(it.pending(), "CDEFz");
        it.push_notes("").unwrap();
        assert_eq!(it.pending(), "CDEFz");
    }

    #[test]
    fn overflow_rejected_without_change() {
        let mut it = NotationInterpreter::new(8);
        it.push_notes("CDEF").unwrap();
        let err = it.push_notes("GABC").unwrap_err();
        assert_eq!(
            err,
            PlaybackError::NotesOverflow { pending: 5, incoming: 4, max: 8 }
        );
        assert_eq!(it.pending(), "CDEFz");
        it.push_notes("GAB").unwrap();
        assert_eq!(it.pending(), "CDEFGABz");
    }

    #[test]
    fn consumed_text_frees_capacity() {
        let mut it = NotationInterpreter::new(6);
        it.push_notes("CDEF").unwrap();
        it.step();
        it.commit();
        it.step();
        it.commit();
        assert_eq!(it.pending(), "EFz");
        it.push_notes("GAB").unwrap();
        assert_eq!(it.pending(), "EFGABz");
    }

    #[test]
    fn quarter_note_in_octave_five() {
        let mut it = interp("A");
        let tone = it.step().unwrap();
        assert_relative_eq!(tone.frequency_hz, 880.0);
        assert_relative_eq!(tone.duration_s, 0.5);
    }

    #[test]
    fn lowercase_letters_match_uppercase() {
        let mut it = interp("c o4 g");
        let tones = decode_all(&mut it);
        assert_relative_eq!(tones[0].frequency_hz, 1046.5);
        assert_relative_eq!(tones[1].frequency_hz, 783.99);
    }

    #[test]
    fn step_is_idempotent_until_commit() {
        let mut it = interp("CD");
        let first = it.step().unwrap();
        assert_eq!(it.step(), Some(first));
        assert_eq!(it.pending(), "Dz");
        it.commit();
        assert_ne!(it.step(), Some(first));
    }

    #[test]
    fn valid_settings_apply() {
        let mut it = interp("O7 T200 V9");
        decode_all(&mut it);
        assert_eq!(it.octave(), 7);
        assert_eq!(it.tempo(), 200);
        assert_eq!(it.volume(), 9);
    }

    #[test]
    fn every_in_range_setting_applies() {
        for octave in 4..=7u8 {
            let mut it = interp(&alloc::format!("O{}", octave));
            decode_all(&mut it);
            assert_eq!(it.octave(), octave);
        }
        for tempo in 40..=240u16 {
            let mut it = interp(&alloc::format!("t{}", tempo));
            decode_all(&mut it);
            assert_eq!(it.tempo(), tempo);
        }
        for volume in 1..=10u8 {
            let mut it = interp(&alloc::format!("v{}", volume));
            decode_all(&mut it);
            assert_eq!(it.volume(), volume);
        }
    }

    #[test]
    fn out_of_range_settings_are_consumed_and_ignored() {
        let mut it = interp("O3 O8 T39 T241 V0 V11 T-5 A");
        let tones = decode_all(&mut it);
        assert_eq!(it.octave(), 5);
        assert_eq!(it.tempo(), 120);
        assert_eq!(it.volume(), 5);
        assert!(it.last_error().is_none());
        // Parsing continued past every ignored token.
        assert_relative_eq!(tones[0].frequency_hz, 880.0);
    }

    #[test]
    fn octave_always_consumes_two_characters() {
        let mut it = interp("OCA");
        let tone = it.step().unwrap();
        // "OC" was eaten as an invalid octave, leaving A.
        assert_relative_eq!(tone.frequency_hz, 880.0);
        assert_eq!(it.octave(), 5);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut it = interp("O7 T60 V2 ! C");
        let tone = it.step().unwrap();
        assert_eq!((it.tempo(), it.octave(), it.volume()), (120, 5, 5));
        assert_relative_eq!(tone.duration_s, 0.5);
    }

    #[test]
    fn tempo_sets_beat_length() {
        let mut it = interp("T60 C");
        assert_relative_eq!(it.step().unwrap().duration_s, 1.0);
    }

    #[test]
    fn duration_divisor() {
        let mut it = interp("C8 C1 C2000 C0 C2001");
        let tones = decode_all(&mut it);
        assert_relative_eq!(tones[0].duration_s, 0.25);
        assert_relative_eq!(tones[1].duration_s, 2.0);
        assert_relative_eq!(tones[2].duration_s, 0.001);
        // Out-of-range divisors are ignored.
        assert_relative_eq!(tones[3].duration_s, 0.5);
        assert_relative_eq!(tones[4].duration_s, 0.5);
    }

    #[test]
    fn dotted_notes() {
        let mut it = interp("C4. C.. C8.");
        let tones = decode_all(&mut it);
        // A dot extends the divided length: C8. is 0.25 + 0.125, not
        // 0.25 + half a quarter.
        assert_relative_eq!(tones[0].duration_s, 0.75);
        assert_relative_eq!(tones[1].duration_s, 0.875);
        assert_relative_eq!(tones[2].duration_s, 0.375);
    }

    #[test]
    fn octave_shift_modifiers() {
        let mut it = interp("A> A< A>>");
        let tones = decode_all(&mut it);
        assert_relative_eq!(tones[0].frequency_hz, 1760.0);
        assert_relative_eq!(tones[1].frequency_hz, 440.0);
        assert_relative_eq!(tones[2].frequency_hz, 3520.0);
    }

    #[test]
    fn sharps_and_flats() {
        let mut it = interp("O4 A# A+ A- A#-");
        let tones = decode_all(&mut it);
        assert_relative_eq!(tones[0].frequency_hz, 466.16, epsilon = 0.01);
        assert_relative_eq!(tones[1].frequency_hz, 466.16, epsilon = 0.01);
        assert_relative_eq!(tones[2].frequency_hz, 415.30, epsilon = 0.01);
        assert_relative_eq!(tones[3].frequency_hz, 440.0, epsilon = 0.001);
    }

    #[test]
    fn rests_are_silent() {
        let mut it = interp("R r2");
        let tones = decode_all(&mut it);
        assert!(tones[0].is_silence());
        assert_relative_eq!(tones[0].duration_s, 0.5);
        assert_relative_eq!(tones[1].duration_s, 1.0);
    }

    #[test]
    fn end_rest_is_fixed_length() {
        let mut it = interp("T40");
        let tone = it.step().unwrap();
        assert!(tone.is_silence());
        assert_relative_eq!(tone.duration_s, 0.2);
        assert!(!it.has_pending());
    }

    #[test]
    fn explicit_frequency_and_duration() {
        let mut it = interp("O7 T40 X440M500");
        let tone = it.step().unwrap();
        assert_relative_eq!(tone.frequency_hz, 440.0);
        assert_relative_eq!(tone.duration_s, 0.5);
    }

    #[test]
    fn explicit_frequency_without_duration_uses_beat() {
        let mut it = interp("x261.63");
        let tone = it.step().unwrap();
        assert_relative_eq!(tone.frequency_hz, 261.63);
        assert_relative_eq!(tone.duration_s, 0.5);
    }

    #[test]
    fn explicit_frequency_outside_audible_range_is_silence() {
        let mut it = interp("X19M100 X20001m100 X2e4M100");
        let tones = decode_all(&mut it);
        assert!(tones[0].is_silence());
        assert!(tones[1].is_silence());
        assert_relative_eq!(tones[2].frequency_hz, 20000.0);
        assert_relative_eq!(tones[0].duration_s, 0.1);
    }

    #[test]
    fn syntax_error_discards_remaining_text() {
        let mut it = interp("C Q D E");
        assert!(it.step().is_some());
        it.commit();

        assert_eq!(it.step(), None);
        assert!(!it.has_pending());
        let err = it.last_error().unwrap();
        assert_eq!(err.found, Some('Q'));
        assert_eq!(err.context.as_str(), "Q D Ez");
    }

    #[test]
    fn uppercase_z_is_a_syntax_error() {
        let mut it = interp("Z");
        assert_eq!(it.step(), None);
        assert_eq!(it.last_error().unwrap().found, Some('Z'));
    }

    #[test]
    fn missing_literal_is_a_syntax_error() {
        let mut it = interp("T C");
        assert_eq!(it.step(), None);
        assert!(!it.has_pending());
        assert_eq!(it.tempo(), 120);
        assert!(it.last_error().is_some());
    }

    #[test]
    fn non_ascii_is_a_syntax_error() {
        let mut it = interp("C♯");
        assert!(it.step().is_some());
        it.commit();
        assert_eq!(it.step(), None);
        assert_eq!(it.last_error().unwrap().found, Some('♯'));
    }

    #[test]
    fn octave_argument_may_be_multibyte() {
        let mut it = interp("O\u{e9} C");
        let tone = it.step().unwrap();
        assert_eq!(it.octave(), DEFAULT_OCTAVE);
        assert_relative_eq!(tone.frequency_hz, 1046.5);
        assert!(it.last_error().is_none());

        it.commit();
        it.push_notes("D").unwrap();
        assert_eq!(it.pending(), "Dz");
    }

    #[test]
    fn octave_at_end_swallows_end_rest() {
        let mut it = interp("C O");
        assert!(it.step().is_some());
        it.commit();
        assert_eq!(it.step(), None);
        assert!(!it.has_pending());
        assert!(it.last_error().is_none());
    }

    #[test]
    fn multibyte_after_octave_digit_is_a_syntax_error() {
        let mut it = interp("O6\u{1F3B5}");
        assert_eq!(it.step(), None);
        assert_eq!(it.octave(), 6);
        assert_eq!(it.last_error().unwrap().found, Some('\u{1F3B5}'));
        assert_eq!(it.last_error().unwrap().offset, 2);
    }

    #[test]
    fn clear_keeps_settings() {
        let mut it = interp("T90 O6 C D");
        it.step();
        it.clear();
        assert!(!it.has_pending());
        assert_eq!(it.decoded(), None);
        assert_eq!((it.tempo(), it.octave()), (90, 6));
    }
}

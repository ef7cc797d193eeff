//! Generative sequencer
//!
//! Plays an endless, self-correcting walk through a diatonic triad
//! progression on a sixteenth-note pulse. Each pulse emits a bass note on the
//! quarter, an optional mid-register note on off-beats, and a lead note that
//! is usually a chord tone and sometimes any scale tone. Every 12 pulses the
//! chord moves by a random step; steps are remembered so the walk tends back
//! toward where it came from. Every full lap of the progression the key rises
//! a fifth.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::harmony::{random_scale_note, random_triad_note, MAJOR_SCALE, TRIAD_PROGRESSION};
use crate::note_queue::NoteOffQueue;

pub const DEFAULT_TEMPO: f64 = 55.0;
pub const DEFAULT_VELOCITY: u8 = 127;

/// Pulses spent on each triad
pub const PULSES_PER_TRIAD: u64 = 12;

/// Notes sound half an octave below the register they are generated in
const REGISTER_OFFSET: i32 = -6;
const FIFTH: i32 = 7;

const BASS_OCTAVES: [i32; 2] = [3, 4];
const MID_OCTAVES: [i32; 2] = [4, 5];
const LEAD_OCTAVES: [i32; 2] = [5, 6];
const HIGH_OCTAVES: [i32; 2] = [6, 7];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Beats per minute; one pulse is a sixteenth note
    pub tempo: f64,
    pub velocity: u8,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

impl SequencerConfig {
    /// `(60 / 4) / tempo` seconds, or `None` for a tempo that is not a
    /// positive finite number
    pub fn pulse_period(&self) -> Option<Duration> {
        if !(self.tempo.is_finite() && self.tempo > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64((60.0 / 4.0) / self.tempo)
            .ok()
            .filter(|p| !p.is_zero())
    }
}

/// Note-on produced by a pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub velocity: u8,
}

pub struct GenerativeSequencer {
    config: SequencerConfig,
    /// Fixed by the first `start`
    pulse: Option<Duration>,
    count: u64,
    triad_index: usize,
    root_offset: i32,
    /// Negations of the fresh steps taken so far; popping one undoes a move
    reverse_deltas: Vec<i32>,
    rng: fastrand::Rng,
    note_offs: NoteOffQueue,
}

impl GenerativeSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self::with_rng(config, fastrand::Rng::new())
    }

    /// Deterministic note choice for a given seed
    pub fn with_seed(config: SequencerConfig, seed: u64) -> Self {
        Self::with_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: SequencerConfig, rng: fastrand::Rng) -> Self {
        Self {
            config,
            pulse: None,
            count: 0,
            triad_index: 0,
            root_offset: 0,
            reverse_deltas: Vec::new(),
            rng,
            note_offs: NoteOffQueue::new(),
        }
    }

    /// Fix the pulse period from the configured tempo
    ///
    /// Only the first successful call does anything; later calls return the
    /// period already in use. Returns `None` while the tempo is unusable.
    pub fn start(&mut self) -> Option<Duration> {
        if let Some(pulse) = self.pulse {
            return Some(pulse);
        }
        let Some(pulse) = self.config.pulse_period() else {
            warn!(tempo = self.config.tempo, "Sequencer tempo must be positive");
            return None;
        };
        self.pulse = Some(pulse);
        info!(
            tempo = self.config.tempo,
            pulse_ms = pulse.as_secs_f64() * 1000.0,
            "Sequencer started"
        );
        Some(pulse)
    }

    pub fn is_started(&self) -> bool {
        self.pulse.is_some()
    }

    pub fn pulse_period(&self) -> Option<Duration> {
        self.pulse
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Takes effect on the first `start`; a running pulse keeps its period
    pub fn set_tempo(&mut self, tempo: f64) {
        self.config.tempo = tempo;
    }

    pub fn pulse_count(&self) -> u64 {
        self.count
    }

    pub fn triad_index(&self) -> usize {
        self.triad_index
    }

    pub fn current_triad(&self) -> [usize; 3] {
        TRIAD_PROGRESSION[self.triad_index % TRIAD_PROGRESSION.len()]
    }

    /// Key transposition in semitones, `0..12`
    pub fn root_offset(&self) -> i32 {
        self.root_offset
    }

    pub fn reverse_deltas(&self) -> &[i32] {
        &self.reverse_deltas
    }

    /// Run one pulse at time `now`
    ///
    /// Returns the note-ons in emission order (bass, mid, lead). Each one has
    /// its note-off queued a quarter pulse after `now`. Does nothing before
    /// `start`.
    pub fn tick(&mut self, now: Instant) -> Vec<NoteEvent> {
        let Some(pulse) = self.pulse else {
            trace!("Pulse ignored, sequencer not started");
            return Vec::new();
        };

        let triad = self.current_triad();
        let mut notes = Vec::with_capacity(3);

        if self.count % 4 == 0 {
            notes.push(random_triad_note(&mut self.rng, &MAJOR_SCALE, &triad, &BASS_OCTAVES));
        }
        if self.count % 2 == 1 && self.rng.f64() * 6.0 > 1.0 {
            notes.push(random_triad_note(&mut self.rng, &MAJOR_SCALE, &triad, &MID_OCTAVES));
        }
        if self.rng.f64() * 3.0 > 1.0 {
            notes.push(random_triad_note(&mut self.rng, &MAJOR_SCALE, &triad, &LEAD_OCTAVES));
        } else {
            notes.push(random_scale_note(&mut self.rng, &MAJOR_SCALE, &HIGH_OCTAVES));
        }

        let release_at = now + pulse / 4;
        let mut events = Vec::with_capacity(notes.len());
        for note in notes {
            let pitch = self.to_midi(note);
            self.note_offs.schedule(pitch, release_at);
            events.push(NoteEvent { pitch, velocity: self.config.velocity });
        }
        trace!(pulse = self.count, notes = events.len(), "Pulse");

        if self.count > 0 && self.count % PULSES_PER_TRIAD == 0 {
            let step = self.next_triad_step();
            let len = TRIAD_PROGRESSION.len() as i32;
            self.triad_index = (self.triad_index as i32 + step).rem_euclid(len) as usize;
            debug!(step, triad_index = self.triad_index, "Chord change");
        }

        if self.count > 0 && self.count % (TRIAD_PROGRESSION.len() as u64 * PULSES_PER_TRIAD) == 0 {
            self.root_offset = (self.root_offset + FIFTH).rem_euclid(12);
            debug!(root_offset = self.root_offset, "Key change");
        }

        self.count += 1;
        events
    }

    /// Pop every note-off that is due at `now`
    pub fn take_due_note_offs(&mut self, now: Instant) -> Vec<u8> {
        self.note_offs.pop_due(now)
    }

    pub fn next_note_off(&self) -> Option<Instant> {
        self.note_offs.next_due()
    }

    /// Forget pending note-offs (after an all-notes-off), returning their pitches
    pub fn cancel_note_offs(&mut self) -> Vec<u8> {
        self.note_offs.clear()
    }

    pub fn pending_note_offs(&self) -> usize {
        self.note_offs.len()
    }

    fn to_midi(&self, note: i32) -> u8 {
        (note + self.root_offset + REGISTER_OFFSET).clamp(0, 127) as u8
    }

    /// Chord step for the next change
    ///
    /// The further the progression sits from the tonic, and the more moves
    /// are remembered, the likelier it is to undo the most recent one.
    fn next_triad_step(&mut self) -> i32 {
        let len = TRIAD_PROGRESSION.len();
        let distance = if self.triad_index > len / 2 {
            len - self.triad_index
        } else {
            self.triad_index
        };

        if self.rng.usize(0..=distance + self.reverse_deltas.len()) > 1 {
            if let Some(step) = self.reverse_deltas.pop() {
                debug!(step, remembered = self.reverse_deltas.len(), "Undoing earlier chord move");
                return step;
            }
        }

        let magnitude = if self.rng.bool() { 1 } else { 2 };
        let step = if self.rng.bool() { magnitude } else { -magnitude };
        self.reverse_deltas.push(-step);
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmony::pitch_class;

    fn started(seed: u64) -> GenerativeSequencer {
        let mut seq = GenerativeSequencer::with_seed(SequencerConfig::default(), seed);
        seq.start();
        seq
    }

    #[test]
    fn test_pulse_period() {
        let config = SequencerConfig {
            tempo: 60.0,
            velocity: 100,
        };
        assert_eq!(config.pulse_period(), Some(Duration::from_millis(250)));
        let default = SequencerConfig::default().pulse_period().unwrap();
        assert!((default.as_secs_f64() - 15.0 / 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_tempo() {
        for tempo in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let mut seq = GenerativeSequencer::new(SequencerConfig { tempo, velocity: 127 });
            assert_eq!(seq.start(), None);
            assert!(!seq.is_started());
            assert!(seq.tick(Instant::now()).is_empty());
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut seq = GenerativeSequencer::with_seed(SequencerConfig::default(), 3);
        let first = seq.start().unwrap();
        seq.set_tempo(180.0);
        assert_eq!(seq.start(), Some(first));
        assert_eq!(seq.pulse_period(), Some(first));
    }

    #[test]
    fn test_tick_before_start_does_nothing() {
        let mut seq = GenerativeSequencer::with_seed(SequencerConfig::default(), 3);
        assert!(seq.tick(Instant::now()).is_empty());
        assert_eq!(seq.pulse_count(), 0);
        assert_eq!(seq.pending_note_offs(), 0);
    }

    #[test]
    fn test_notes_per_pulse() {
        let mut seq = started(11);
        let now = Instant::now();
        for c in 0..400u64 {
            let notes = seq.tick(now).len();
            match c % 4 {
                0 => assert_eq!(notes, 2, "pulse {c}"),
                2 => assert_eq!(notes, 1, "pulse {c}"),
                _ => assert!((1..=2).contains(&notes), "pulse {c}"),
            }
        }
    }

    #[test]
    fn test_notes_are_diatonic_in_current_key() {
        let mut seq = started(5);
        let now = Instant::now();
        for _ in 0..2_000 {
            let root = seq.root_offset();
            let triad = seq.current_triad();
            let notes = seq.tick(now);
            let c = seq.pulse_count() - 1;
            for (i, note) in notes.iter().enumerate() {
                let degree_class = pitch_class(note.pitch as i32 - root - REGISTER_OFFSET);
                assert!(MAJOR_SCALE.contains(&degree_class), "pitch {} root {root}", note.pitch);
                if c % 4 == 0 && i == 0 {
                    let chord: Vec<i32> = triad.iter().map(|&d| MAJOR_SCALE[d]).collect();
                    assert!(chord.contains(&degree_class));
                }
                assert_eq!(note.velocity, DEFAULT_VELOCITY);
            }
        }
    }

    #[test]
    fn test_note_offs_fire_a_quarter_pulse_later() {
        let mut seq = started(9);
        let pulse = seq.pulse_period().unwrap();
        let t0 = Instant::now();
        let notes = seq.tick(t0);
        assert_eq!(seq.pending_note_offs(), notes.len());

        assert!(seq.take_due_note_offs(t0).is_empty());
        assert_eq!(seq.next_note_off(), Some(t0 + pulse / 4));
        let released = seq.take_due_note_offs(t0 + pulse / 4);
        let played: Vec<u8> = notes.iter().map(|n| n.pitch).collect();
        assert_eq!(released, played);
        assert_eq!(seq.pending_note_offs(), 0);
    }

    #[test]
    fn test_cancel_note_offs() {
        let mut seq = started(9);
        let notes = seq.tick(Instant::now());
        assert_eq!(seq.cancel_note_offs().len(), notes.len());
        assert_eq!(seq.next_note_off(), None);
    }

    #[test]
    fn test_chord_holds_for_twelve_pulses() {
        let mut seq = started(21);
        let now = Instant::now();
        for _ in 0..=11 {
            seq.tick(now);
            assert_eq!(seq.triad_index(), 0);
        }
        // Pulse 12 always moves: every step is non-zero and smaller than the table
        seq.tick(now);
        assert_ne!(seq.triad_index(), 0);
    }

    #[test]
    fn test_circle_of_fifths() {
        let mut seq = started(2);
        let now = Instant::now();
        for _ in 0..84 {
            seq.tick(now);
        }
        assert_eq!(seq.root_offset(), 0);
        // Pulse 84 completes the first lap
        seq.tick(now);
        assert_eq!(seq.root_offset(), 7);
        for _ in 85..=168 {
            seq.tick(now);
        }
        assert_eq!(seq.root_offset(), 2);
    }

    #[test]
    fn test_state_stays_in_range() {
        let now = Instant::now();
        for seed in 0..40 {
            let mut seq = started(seed);
            let mut max_stack = 0;
            for _ in 0..20_000 {
                seq.tick(now);
                assert!(seq.triad_index() < 7);
                assert!((0..12).contains(&seq.root_offset()));
                max_stack = max_stack.max(seq.reverse_deltas().len());
            }
            assert!(seq.reverse_deltas().iter().all(|d| matches!(d, -2 | -1 | 1 | 2)));
            // Popping gets likelier as the stack grows, so it never runs away
            assert!(max_stack < 200, "seed {seed} stack grew to {max_stack}");
        }
    }

    #[test]
    fn test_reverse_delta_bookkeeping() {
        let mut seq = started(17);
        let now = Instant::now();
        for c in 0..5_000u64 {
            let before_index = seq.triad_index() as i32;
            let before_stack = seq.reverse_deltas().to_vec();
            seq.tick(now);
            if c == 0 || c % PULSES_PER_TRIAD != 0 {
                assert_eq!(seq.reverse_deltas(), &before_stack[..]);
                continue;
            }
            let after = seq.reverse_deltas();
            let moved = seq.triad_index() as i32 - before_index;
            if after.len() == before_stack.len() + 1 {
                // Fresh step: its negation was remembered
                let step = -after[after.len() - 1];
                assert_eq!(moved.rem_euclid(7), step.rem_euclid(7));
                assert_eq!(&after[..before_stack.len()], &before_stack[..]);
            } else {
                // Undo: the last remembered step was taken
                assert_eq!(after.len() + 1, before_stack.len());
                let step = before_stack[before_stack.len() - 1];
                assert_eq!(moved.rem_euclid(7), step.rem_euclid(7));
            }
        }
    }

    #[test]
    fn test_same_seed_same_music() {
        let now = Instant::now();
        let mut a = started(99);
        let mut b = started(99);
        for _ in 0..500 {
            assert_eq!(a.tick(now), b.tick(now));
        }
        assert_eq!(a.triad_index(), b.triad_index());
    }
}

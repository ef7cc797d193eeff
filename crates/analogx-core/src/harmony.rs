//! Diatonic pitch material for the generative sequencer

// ============================================================================
// Scale and Progression
// ============================================================================

/// Major scale, semitones from the root
pub const MAJOR_SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Triads as scale-degree indices (0 = tonic)
///
/// Walking the table forward gives I, vi, IV, ii, vii°, iii, V: each chord
/// shares two tones with its neighbour.
pub const TRIAD_PROGRESSION: [[usize; 3]; 7] = [
    [0, 2, 4], // I
    [5, 0, 2], // vi
    [3, 5, 0], // IV
    [1, 3, 5], // ii
    [6, 1, 3], // vii°
    [2, 4, 6], // iii
    [4, 6, 1], // V
];

/// Returned by [`closest_valid_note`] when nothing in the search radius fits
pub const SNAP_FALLBACK_PITCH: i32 = 0;

/// Widest distance, in semitones, that [`closest_valid_note`] will look
pub const SNAP_RADIUS: i32 = 6;

pub fn pitch_class(note: i32) -> i32 {
    note.rem_euclid(12)
}

/// Pitch classes of a triad on the given scale
///
/// Degrees wrap around the scale; `scale` must not be empty.
pub fn triad_pitch_classes(scale: &[i32], triad: &[usize; 3]) -> [i32; 3] {
    triad.map(|degree| scale[degree % scale.len()])
}

pub fn is_valid_note(note: i32, valid: &[i32]) -> bool {
    valid.iter().any(|&n| pitch_class(n) == pitch_class(note))
}

/// Nearest note whose pitch class is in `valid`
///
/// Searches outward one semitone at a time, trying `note + d` before
/// `note - d`. Falls back to [`SNAP_FALLBACK_PITCH`] if nothing within
/// [`SNAP_RADIUS`] matches, which only happens for an empty or unreachable
/// target set.
pub fn closest_valid_note(note: i32, valid: &[i32]) -> i32 {
    for delta in 0..=SNAP_RADIUS {
        let up = note + delta;
        if is_valid_note(up, valid) {
            return up;
        }
        let down = note - delta;
        if is_valid_note(down, valid) {
            return down;
        }
    }
    SNAP_FALLBACK_PITCH
}

// ============================================================================
// Random Note Choice
// ============================================================================

/// Random scale degree in a random octave from `octaves`
///
/// An empty `scale` or `octaves` gives [`SNAP_FALLBACK_PITCH`].
pub fn random_scale_note(rng: &mut fastrand::Rng, scale: &[i32], octaves: &[i32]) -> i32 {
    if scale.is_empty() || octaves.is_empty() {
        return SNAP_FALLBACK_PITCH;
    }
    let note = scale[rng.usize(..scale.len())];
    let octave = octaves[rng.usize(..octaves.len())];
    octave * 12 + note
}

/// Random scale note snapped onto the triad, or [`SNAP_FALLBACK_PITCH`] for
/// an empty `scale` or `octaves`
pub fn random_triad_note(
    rng: &mut fastrand::Rng,
    scale: &[i32],
    triad: &[usize; 3],
    octaves: &[i32],
) -> i32 {
    if scale.is_empty() || octaves.is_empty() {
        return SNAP_FALLBACK_PITCH;
    }
    let valid = triad_pitch_classes(scale, triad);
    closest_valid_note(random_scale_note(rng, scale, octaves), &valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triads_are_thirds() {
        for triad in TRIAD_PROGRESSION {
            assert_eq!((triad[1] + 7 - triad[0]) % 7, 2);
            assert_eq!((triad[2] + 7 - triad[1]) % 7, 2);
        }
    }

    #[test]
    fn test_triad_pitch_classes() {
        assert_eq!(triad_pitch_classes(&MAJOR_SCALE, &TRIAD_PROGRESSION[0]), [0, 4, 7]);
        assert_eq!(triad_pitch_classes(&MAJOR_SCALE, &TRIAD_PROGRESSION[1]), [9, 0, 4]);
        assert_eq!(triad_pitch_classes(&MAJOR_SCALE, &TRIAD_PROGRESSION[6]), [7, 11, 2]);
    }

    #[test]
    fn test_closest_prefers_exact_then_up() {
        let c_major = [0, 4, 7];
        assert_eq!(closest_valid_note(60, &c_major), 60);
        // D# is one below E
        assert_eq!(closest_valid_note(63, &c_major), 64);
        // D: C and E are both two away, upward is tried first
        assert_eq!(closest_valid_note(62, &c_major), 64);
        assert_eq!(closest_valid_note(61, &c_major), 60);
    }

    #[test]
    fn test_closest_fallback() {
        assert_eq!(closest_valid_note(60, &[]), SNAP_FALLBACK_PITCH);
    }

    #[test]
    fn test_snap_lands_in_target_set() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..2_000 {
            let size = rng.usize(0..4);
            let valid: Vec<i32> = (0..size).map(|_| rng.i32(0..12)).collect();
            let candidate = rng.i32(0..128);
            let reachable =
                (-SNAP_RADIUS..=SNAP_RADIUS).any(|d| is_valid_note(candidate + d, &valid));

            let snapped = closest_valid_note(candidate, &valid);
            if reachable {
                assert!(
                    is_valid_note(snapped, &valid),
                    "{candidate} -> {snapped} not in {valid:?}"
                );
                assert!((snapped - candidate).abs() <= SNAP_RADIUS);
            } else {
                assert_eq!(snapped, SNAP_FALLBACK_PITCH);
            }
        }
    }

    #[test]
    fn test_random_notes_stay_in_octave_band() {
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..500 {
            let note = random_scale_note(&mut rng, &MAJOR_SCALE, &[6, 7]);
            assert!((72..96).contains(&note));
            assert!(MAJOR_SCALE.contains(&pitch_class(note)));

            let triad = TRIAD_PROGRESSION[rng.usize(..7)];
            let snapped = random_triad_note(&mut rng, &MAJOR_SCALE, &triad, &[3, 4]);
            assert!(is_valid_note(snapped, &triad_pitch_classes(&MAJOR_SCALE, &triad)));
        }
    }

    #[test]
    fn test_empty_choices_fall_back() {
        let mut rng = fastrand::Rng::with_seed(3);
        assert_eq!(random_scale_note(&mut rng, &[], &[4, 5]), SNAP_FALLBACK_PITCH);
        assert_eq!(random_scale_note(&mut rng, &MAJOR_SCALE, &[]), SNAP_FALLBACK_PITCH);
        let triad = TRIAD_PROGRESSION[4];
        assert_eq!(random_triad_note(&mut rng, &[], &triad, &[4]), SNAP_FALLBACK_PITCH);
        assert_eq!(random_triad_note(&mut rng, &MAJOR_SCALE, &triad, &[]), SNAP_FALLBACK_PITCH);
    }
}

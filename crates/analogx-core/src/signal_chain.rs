//! Control surface of the external signal chain
//!
//! The DSP graph (oscillators, filter, crusher, delay, reverb) belongs to the
//! audio engine. The control plane only sees it through [`SignalChain`]: a
//! fixed, ordered set of named parameters in physical units, a handful of
//! stages that can be started or bypassed, and note on/off.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParamError;

/// Unit domain of a chain parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamUnit {
    Seconds,
    Hertz,
    /// Dimensionless level, mix, feedback or depth
    Amount,
    Semitones,
    /// Discrete selector (waveform)
    Index,
}

impl ParamUnit {
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Semitones | Self::Index)
    }
}

/// Every continuous or discrete parameter the control plane writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainParam {
    DelayTime,
    DelayMix,
    /// Dry/wet balance in front of the delay; the delay on/off switch drives it
    DelayBalance,
    ReverbFeedback,
    ReverbMix,
    /// Dry/wet balance of the stereo widener; its on/off switch drives it
    WidenBalance,
    Waveform1,
    Waveform2,
    Osc1Semitones,
    Osc2Semitones,
    OscBalance,
    Osc2Detune,
    SubMix,
    Morph,
    FmMix,
    FmModIndex,
    NoiseMix,
    LfoWaveform,
    LfoAmplitude,
    LfoRate,
    FilterCutoff,
    FilterResonance,
    CrushSampleRate,
    Attack,
    Decay,
    Sustain,
    Release,
    MasterVolume,
}

impl ChainParam {
    pub const ALL: [ChainParam; 28] = [
        Self::DelayTime,
        Self::DelayMix,
        Self::DelayBalance,
        Self::ReverbFeedback,
        Self::ReverbMix,
        Self::WidenBalance,
        Self::Waveform1,
        Self::Waveform2,
        Self::Osc1Semitones,
        Self::Osc2Semitones,
        Self::OscBalance,
        Self::Osc2Detune,
        Self::SubMix,
        Self::Morph,
        Self::FmMix,
        Self::FmModIndex,
        Self::NoiseMix,
        Self::LfoWaveform,
        Self::LfoAmplitude,
        Self::LfoRate,
        Self::FilterCutoff,
        Self::FilterResonance,
        Self::CrushSampleRate,
        Self::Attack,
        Self::Decay,
        Self::Sustain,
        Self::Release,
        Self::MasterVolume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DelayTime => "delay_time",
            Self::DelayMix => "delay_mix",
            Self::DelayBalance => "delay_balance",
            Self::ReverbFeedback => "reverb_feedback",
            Self::ReverbMix => "reverb_mix",
            Self::WidenBalance => "widen_balance",
            Self::Waveform1 => "waveform1",
            Self::Waveform2 => "waveform2",
            Self::Osc1Semitones => "osc1_semitones",
            Self::Osc2Semitones => "osc2_semitones",
            Self::OscBalance => "osc_balance",
            Self::Osc2Detune => "osc2_detune",
            Self::SubMix => "sub_mix",
            Self::Morph => "morph",
            Self::FmMix => "fm_mix",
            Self::FmModIndex => "fm_mod_index",
            Self::NoiseMix => "noise_mix",
            Self::LfoWaveform => "lfo_waveform",
            Self::LfoAmplitude => "lfo_amplitude",
            Self::LfoRate => "lfo_rate",
            Self::FilterCutoff => "filter_cutoff",
            Self::FilterResonance => "filter_resonance",
            Self::CrushSampleRate => "crush_sample_rate",
            Self::Attack => "attack",
            Self::Decay => "decay",
            Self::Sustain => "sustain",
            Self::Release => "release",
            Self::MasterVolume => "master_volume",
        }
    }

    pub fn unit(&self) -> ParamUnit {
        match self {
            Self::DelayTime | Self::Attack | Self::Decay | Self::Release => ParamUnit::Seconds,
            Self::LfoRate | Self::FilterCutoff | Self::CrushSampleRate => ParamUnit::Hertz,
            Self::Osc1Semitones | Self::Osc2Semitones => ParamUnit::Semitones,
            Self::Waveform1 | Self::Waveform2 | Self::LfoWaveform => ParamUnit::Index,
            _ => ParamUnit::Amount,
        }
    }

    /// Accepted range, inclusive
    pub fn range(&self) -> (f64, f64) {
        match self {
            Self::DelayTime => (0.001, 10.0),
            Self::ReverbFeedback | Self::FilterResonance => (0.0, 0.99),
            Self::Waveform1 | Self::Waveform2 | Self::LfoWaveform => (0.0, 3.0),
            Self::Osc1Semitones | Self::Osc2Semitones => (-12.0, 12.0),
            Self::Osc2Detune => (-0.25, 0.25),
            Self::Morph => (-1.0, 1.0),
            Self::FmMix => (0.0, 1.25),
            Self::FmModIndex => (0.0, 15.0),
            Self::LfoAmplitude => (0.0, 1_200.0),
            Self::LfoRate => (0.0, 5.0),
            // Strictly positive so the log curves can always invert them
            Self::FilterCutoff => (1.0, 30_000.0),
            Self::CrushSampleRate => (1.0, 10_000.0),
            Self::Attack | Self::Decay | Self::Release => (0.0, 10.0),
            Self::DelayMix
            | Self::DelayBalance
            | Self::ReverbMix
            | Self::WidenBalance
            | Self::OscBalance
            | Self::SubMix
            | Self::NoiseMix
            | Self::Sustain
            | Self::MasterVolume => (0.0, 1.0),
        }
    }

    /// Check a value against this parameter's range
    pub fn validate(&self, value: f64) -> Result<f64, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite {
                param: *self,
                value,
            });
        }
        let (min, max) = self.range();
        if value < min || value > max {
            return Err(ParamError::OutOfRange {
                param: *self,
                value,
                min,
                max,
            });
        }
        Ok(value)
    }
}

impl fmt::Display for ChainParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stages that are switched on/off rather than faded with a mix dial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Vco1,
    Vco2,
    /// Off means stopped (silent), not bypassed
    Filter,
    /// Off means bypassed
    BitCrusher,
    /// Off means bypassed
    Reverb,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::Vco1,
        Self::Vco2,
        Self::Filter,
        Self::BitCrusher,
        Self::Reverb,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vco1 => "vco1",
            Self::Vco2 => "vco2",
            Self::Filter => "filter",
            Self::BitCrusher => "bit_crusher",
            Self::Reverb => "reverb",
        }
    }
}

pub const MIDI_NOTE_MAX: u8 = 127;

/// Parameter surface of the signal chain
///
/// Implementations serialize concurrent access themselves; every call must
/// return in bounded time (no disk or network I/O), since the sequencer clock
/// calls `play_note`/`stop_note` on its own thread.
pub trait SignalChain: Send {
    /// Current value of a parameter in its physical unit
    fn param(&self, param: ChainParam) -> f64;
    /// Write a parameter. A rejected write leaves the previous value in place.
    fn set_param(&mut self, param: ChainParam, value: f64) -> Result<(), ParamError>;
    fn is_enabled(&self, stage: Stage) -> bool;
    fn set_enabled(&mut self, stage: Stage, enabled: bool);
    fn play_note(&mut self, pitch: u8, velocity: u8);
    fn stop_note(&mut self, pitch: u8);
    /// Stop every pitch in the MIDI range, sounding or not
    fn all_notes_off(&mut self) {
        for pitch in 0..=MIDI_NOTE_MAX {
            self.stop_note(pitch);
        }
    }
}

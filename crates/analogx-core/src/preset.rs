//! Preset documents: capture, apply and the JSON contract
//!
//! A preset is a full snapshot of the instrument. Every field is required when
//! decoding; nothing is default-filled. Cutoff and crush are stored as knob
//! positions so that a preset reproduces the exact knob it was taken from,
//! whatever curve sits between the knob and the engine.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::curve::{CRUSH_CURVE, CUTOFF_CURVE};
use crate::error::{DecodeError, EncodeError};
use crate::signal_chain::{ChainParam, SignalChain, Stage};
use crate::units::{Amount, Hertz, Normalized, Seconds};

/// Highest LFO waveform selector the filter section understands
pub const LFO_WAVEFORM_MAX: u32 = 3;

const LEFT_DOUBLE_QUOTE: char = '\u{201C}';
const RIGHT_DOUBLE_QUOTE: char = '\u{201D}';

/// Keyboard performance toggles that travel with a preset but are not chain state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerformanceFlags {
    pub hold: bool,
    pub mono: bool,
}

/// Result of applying a preset to a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub flags: PerformanceFlags,
    /// Writes the chain refused; those parameters kept their previous value
    pub rejected: usize,
}

/// Snapshot of every mutable parameter of the instrument
///
/// Field order here is the serialized field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDocument {
    pub delay_enabled: bool,
    pub reverb_enabled: bool,
    /// Stereo widener
    pub fatten_enabled: bool,
    pub delay_time: Seconds,
    pub delay_mix: Amount,
    pub reverb_amount: Amount,
    pub reverb_mix: Amount,

    pub vco1_enabled: bool,
    pub vco2_enabled: bool,
    pub vco_waveform1: u32,
    pub vco_waveform2: u32,
    pub osc1_semitones: i32,
    pub osc2_semitones: i32,
    pub osc_mix: Amount,
    pub osc2_detune: Amount,
    pub sub_mix: Amount,
    pub osc_morph: Amount,
    pub fm_mix: Amount,
    pub fm_mod: Amount,

    pub lfo_waveform: u32,
    pub lfo_amount: Amount,
    pub lfo_rate: Hertz,

    pub filter_cutoff: Normalized,
    pub filter_resonance: Amount,
    pub filter_enabled: bool,
    pub bitcrush_enabled: bool,
    pub crush_amount: Normalized,
    pub noise_mix: Amount,

    pub hold_enabled: bool,
    pub mono_enabled: bool,

    pub attack_duration: Seconds,
    pub decay_duration: Seconds,
    pub sustain_level: Amount,
    pub release_duration: Seconds,
    pub master_volume: Amount,
}

fn index_param(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

fn semitone_param(value: f64) -> i32 {
    value.round() as i32
}

impl PresetDocument {
    /// Read the whole chain into a new document
    pub fn capture<C: SignalChain + ?Sized>(chain: &C, flags: PerformanceFlags) -> Self {
        let amount = |param| Amount(chain.param(param));
        let seconds = |param| Seconds(chain.param(param));

        Self {
            delay_enabled: chain.param(ChainParam::DelayBalance) > 0.0,
            reverb_enabled: chain.is_enabled(Stage::Reverb),
            fatten_enabled: chain.param(ChainParam::WidenBalance) > 0.0,
            delay_time: seconds(ChainParam::DelayTime),
            delay_mix: amount(ChainParam::DelayMix),
            reverb_amount: amount(ChainParam::ReverbFeedback),
            reverb_mix: amount(ChainParam::ReverbMix),

            vco1_enabled: chain.is_enabled(Stage::Vco1),
            vco2_enabled: chain.is_enabled(Stage::Vco2),
            vco_waveform1: index_param(chain.param(ChainParam::Waveform1)),
            vco_waveform2: index_param(chain.param(ChainParam::Waveform2)),
            osc1_semitones: semitone_param(chain.param(ChainParam::Osc1Semitones)),
            osc2_semitones: semitone_param(chain.param(ChainParam::Osc2Semitones)),
            osc_mix: amount(ChainParam::OscBalance),
            osc2_detune: amount(ChainParam::Osc2Detune),
            sub_mix: amount(ChainParam::SubMix),
            osc_morph: amount(ChainParam::Morph),
            fm_mix: amount(ChainParam::FmMix),
            fm_mod: amount(ChainParam::FmModIndex),

            lfo_waveform: index_param(chain.param(ChainParam::LfoWaveform)),
            lfo_amount: amount(ChainParam::LfoAmplitude),
            lfo_rate: Hertz(chain.param(ChainParam::LfoRate)),

            filter_cutoff: CUTOFF_CURVE.hz_to_knob(Hertz(chain.param(ChainParam::FilterCutoff))),
            filter_resonance: amount(ChainParam::FilterResonance),
            filter_enabled: chain.is_enabled(Stage::Filter),
            bitcrush_enabled: chain.is_enabled(Stage::BitCrusher),
            crush_amount: CRUSH_CURVE.hz_to_knob(Hertz(chain.param(ChainParam::CrushSampleRate))),
            noise_mix: amount(ChainParam::NoiseMix),

            hold_enabled: flags.hold,
            mono_enabled: flags.mono,

            attack_duration: seconds(ChainParam::Attack),
            decay_duration: seconds(ChainParam::Decay),
            sustain_level: amount(ChainParam::Sustain),
            release_duration: seconds(ChainParam::Release),
            master_volume: amount(ChainParam::MasterVolume),
        }
    }

    /// Push every field into the chain in one pass
    ///
    /// Takes the chain by `&mut`, so a caller holding a shared chain behind a
    /// lock applies the whole document before anyone else can touch it. A
    /// rejected write is logged and skipped; the remaining fields still land.
    pub fn apply<C: SignalChain + ?Sized>(&self, chain: &mut C) -> ApplyOutcome {
        let writes: [(ChainParam, f64); 28] = [
            (ChainParam::DelayTime, self.delay_time.get()),
            (ChainParam::DelayMix, self.delay_mix.get()),
            (ChainParam::DelayBalance, if self.delay_enabled { 1.0 } else { 0.0 }),
            (ChainParam::ReverbFeedback, self.reverb_amount.get()),
            (ChainParam::ReverbMix, self.reverb_mix.get()),
            (ChainParam::NoiseMix, self.noise_mix.get()),
            (ChainParam::CrushSampleRate, CRUSH_CURVE.knob_to_hz(self.crush_amount).get()),
            (ChainParam::WidenBalance, if self.fatten_enabled { 1.0 } else { 0.0 }),
            (ChainParam::Attack, self.attack_duration.get()),
            (ChainParam::Decay, self.decay_duration.get()),
            (ChainParam::Sustain, self.sustain_level.get()),
            (ChainParam::Release, self.release_duration.get()),
            (ChainParam::MasterVolume, self.master_volume.get()),
            (ChainParam::Waveform1, f64::from(self.vco_waveform1)),
            (ChainParam::Waveform2, f64::from(self.vco_waveform2)),
            (ChainParam::Morph, self.osc_morph.get()),
            (ChainParam::OscBalance, self.osc_mix.get()),
            (ChainParam::SubMix, self.sub_mix.get()),
            (ChainParam::Osc2Detune, self.osc2_detune.get()),
            (ChainParam::Osc1Semitones, f64::from(self.osc1_semitones)),
            (ChainParam::Osc2Semitones, f64::from(self.osc2_semitones)),
            (ChainParam::LfoWaveform, f64::from(self.lfo_waveform.min(LFO_WAVEFORM_MAX))),
            (ChainParam::LfoAmplitude, self.lfo_amount.get()),
            (ChainParam::LfoRate, self.lfo_rate.get()),
            (ChainParam::FilterResonance, self.filter_resonance.get()),
            (ChainParam::FilterCutoff, CUTOFF_CURVE.knob_to_hz(self.filter_cutoff).get()),
            (ChainParam::FmMix, self.fm_mix.get()),
            (ChainParam::FmModIndex, self.fm_mod.get()),
        ];

        let mut rejected = 0;
        for (param, value) in writes {
            if let Err(e) = chain.set_param(param, value) {
                warn!("Preset field not applied: {}", e);
                rejected += 1;
            }
        }

        chain.set_enabled(Stage::Reverb, self.reverb_enabled);
        chain.set_enabled(Stage::Vco1, self.vco1_enabled);
        chain.set_enabled(Stage::Vco2, self.vco2_enabled);
        chain.set_enabled(Stage::BitCrusher, self.bitcrush_enabled);
        chain.set_enabled(Stage::Filter, self.filter_enabled);

        debug!(rejected, "Preset applied");
        ApplyOutcome {
            flags: self.performance_flags(),
            rejected,
        }
    }

    pub fn performance_flags(&self) -> PerformanceFlags {
        PerformanceFlags {
            hold: self.hold_enabled,
            mono: self.mono_enabled,
        }
    }

    /// Compact JSON, fields in declaration order
    pub fn to_json(&self) -> Result<String, EncodeError> {
        // serde_json writes non-finite floats as `null`, which could never be
        // decoded again
        let value = serde_json::to_value(self)?;
        if let Some(fields) = value.as_object() {
            if let Some((field, _)) = fields.iter().find(|(_, v)| v.is_null()) {
                return Err(EncodeError::NonFinite(field.clone()));
            }
        }
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_json(std::str::from_utf8(bytes)?)
    }

    /// Decode text pasted from a clipboard, where quotes may have been
    /// "smartened" into typographic double quotes
    pub fn from_clipboard_text(text: &str) -> Result<Self, DecodeError> {
        let text = text.replace([LEFT_DOUBLE_QUOTE, RIGHT_DOUBLE_QUOTE], "\"");
        Self::from_json(&text)
    }
}

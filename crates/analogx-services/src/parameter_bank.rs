//! In-memory signal chain state
//!
//! Holds every chain parameter in physical units the way the audio engine
//! exposes them. Used as the control plane's view of the engine and as the
//! chain under test.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use analogx_core::signal_chain::MIDI_NOTE_MAX;
use analogx_core::{
    ChainParam, Normalized, ParamError, SignalChain, Stage, CRUSH_CURVE, CUTOFF_CURVE,
};
use tracing::trace;

/// Chain shared between the UI side and the sequencer clock
pub type SharedChain = Arc<Mutex<dyn SignalChain>>;

/// Note traffic seen by the chain, when recording is switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMessage {
    On { pitch: u8, velocity: u8 },
    Off { pitch: u8 },
    AllOff,
}

#[derive(Debug, Clone)]
pub struct ParameterBank {
    values: HashMap<ChainParam, f64>,
    enabled: HashMap<Stage, bool>,
    /// Sounding pitch -> velocity
    sounding: BTreeMap<u8, u8>,
    note_log: Option<Vec<NoteMessage>>,
}

impl Default for ParameterBank {
    /// Power-on state of the instrument
    fn default() -> Self {
        let values = HashMap::from([
            (ChainParam::DelayTime, 0.5),
            (ChainParam::DelayMix, 0.5),
            (ChainParam::DelayBalance, 0.0),
            (ChainParam::ReverbFeedback, 0.88),
            (ChainParam::ReverbMix, 0.4),
            (ChainParam::WidenBalance, 0.0),
            (ChainParam::Waveform1, 0.0),
            (ChainParam::Waveform2, 0.0),
            (ChainParam::Osc1Semitones, 0.0),
            (ChainParam::Osc2Semitones, 0.0),
            (ChainParam::OscBalance, 0.5),
            (ChainParam::Osc2Detune, 0.0),
            (ChainParam::SubMix, 0.0),
            (ChainParam::Morph, 0.0),
            (ChainParam::FmMix, 0.0),
            (ChainParam::FmModIndex, 0.0),
            (ChainParam::NoiseMix, 0.0),
            (ChainParam::LfoWaveform, 0.0),
            (ChainParam::LfoAmplitude, 0.0),
            (ChainParam::LfoRate, 1.4),
            (ChainParam::FilterCutoff, CUTOFF_CURVE.knob_to_hz(Normalized(0.36)).get()),
            (ChainParam::FilterResonance, 0.5),
            (ChainParam::CrushSampleRate, CRUSH_CURVE.knob_to_hz(Normalized(0.0)).get()),
            (ChainParam::Attack, 0.1),
            (ChainParam::Decay, 0.1),
            (ChainParam::Sustain, 0.66),
            (ChainParam::Release, 0.5),
            (ChainParam::MasterVolume, 1.0),
        ]);
        let enabled = HashMap::from([
            (Stage::Vco1, true),
            (Stage::Vco2, true),
            (Stage::Filter, false),
            (Stage::BitCrusher, false),
            (Stage::Reverb, false),
        ]);
        Self {
            values,
            enabled,
            sounding: BTreeMap::new(),
            note_log: None,
        }
    }
}

impl ParameterBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a log of every note message from now on
    pub fn recording_notes(mut self) -> Self {
        self.note_log = Some(Vec::new());
        self
    }

    pub fn into_shared(self) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(self))
    }

    pub fn sounding_notes(&self) -> Vec<u8> {
        self.sounding.keys().copied().collect()
    }

    pub fn is_sounding(&self, pitch: u8) -> bool {
        self.sounding.contains_key(&pitch)
    }

    pub fn note_log(&self) -> &[NoteMessage] {
        self.note_log.as_deref().unwrap_or(&[])
    }

    fn log(&mut self, message: NoteMessage) {
        if let Some(log) = self.note_log.as_mut() {
            log.push(message);
        }
    }
}

impl SignalChain for ParameterBank {
    fn param(&self, param: ChainParam) -> f64 {
        self.values.get(&param).copied().unwrap_or(0.0)
    }

    fn set_param(&mut self, param: ChainParam, value: f64) -> Result<(), ParamError> {
        let value = param.validate(value)?;
        trace!(%param, value, "Set parameter");
        self.values.insert(param, value);
        Ok(())
    }

    fn is_enabled(&self, stage: Stage) -> bool {
        self.enabled.get(&stage).copied().unwrap_or(false)
    }

    fn set_enabled(&mut self, stage: Stage, enabled: bool) {
        self.enabled.insert(stage, enabled);
    }

    fn play_note(&mut self, pitch: u8, velocity: u8) {
        if pitch > MIDI_NOTE_MAX {
            return;
        }
        self.sounding.insert(pitch, velocity);
        self.log(NoteMessage::On { pitch, velocity });
    }

    fn stop_note(&mut self, pitch: u8) {
        self.sounding.remove(&pitch);
        self.log(NoteMessage::Off { pitch });
    }

    fn all_notes_off(&mut self) {
        self.sounding.clear();
        self.log(NoteMessage::AllOff);
    }
}

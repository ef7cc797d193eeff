//! analogx-core: Control-plane domain types for the AnalogX synthesizer

pub mod curve;
mod error;
pub mod harmony;
mod note_queue;
pub mod preset;
pub mod sequencer;
pub mod signal_chain;
pub mod units;

pub use curve::{
    KnobCurve, KnobScaling, LogCurve, CRUSH_CURVE, CUTOFF_CURVE, HZ_ROUND_TRIP_TOLERANCE,
};
pub use error::{AnalogxError, CurveDomainError, DecodeError, EncodeError, ParamError, Result};
pub use note_queue::{NoteOffQueue, ScheduledNoteOff};
pub use preset::{ApplyOutcome, PerformanceFlags, PresetDocument};
pub use sequencer::{GenerativeSequencer, NoteEvent, SequencerConfig};
pub use signal_chain::{ChainParam, ParamUnit, SignalChain, Stage};
pub use units::{Amount, Hertz, Normalized, Seconds};

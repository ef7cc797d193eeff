//! analogx-services: signal chain state, sequencer clock, preset persistence

pub mod context;
pub mod parameter_bank;
pub mod preset_store;
pub mod sequencer_clock;

pub use context::{ContextError, SynthContext};
pub use parameter_bank::{NoteMessage, ParameterBank, SharedChain};
pub use preset_store::{PresetStore, StoreError, EXPORT_FILE, LAST_PRESET_FILE};
pub use sequencer_clock::{ClockError, ClockStatus, SequencerClock};

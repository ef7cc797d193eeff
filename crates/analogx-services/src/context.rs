//! Process-wide synth context
//!
//! Built once at startup and handed to whoever needs the chain, the
//! sequencer clock or the preset store.

use std::path::PathBuf;
use std::time::Duration;

use analogx_core::{DecodeError, GenerativeSequencer, PerformanceFlags, PresetDocument};
use thiserror::Error;
use tracing::{info, warn};

use crate::parameter_bank::SharedChain;
use crate::preset_store::{PresetStore, StoreError};
use crate::sequencer_clock::{ClockError, SequencerClock};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Signal chain lock poisoned")]
    ChainPoisoned,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Pasted preset is not valid: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Clock(#[from] ClockError),
}

pub struct SynthContext {
    chain: SharedChain,
    clock: SequencerClock,
    store: PresetStore,
    flags: PerformanceFlags,
}

impl SynthContext {
    pub fn new(chain: SharedChain, sequencer: GenerativeSequencer, store: PresetStore) -> Self {
        Self {
            clock: SequencerClock::new(chain.clone(), sequencer),
            chain,
            store,
            flags: PerformanceFlags::default(),
        }
    }

    pub fn chain(&self) -> SharedChain {
        self.chain.clone()
    }

    pub fn store(&self) -> &PresetStore {
        &self.store
    }

    pub fn clock(&self) -> &SequencerClock {
        &self.clock
    }

    pub fn flags(&self) -> PerformanceFlags {
        self.flags
    }

    pub fn set_hold(&mut self, hold: bool) {
        self.flags.hold = hold;
    }

    pub fn set_mono(&mut self, mono: bool) {
        self.flags.mono = mono;
    }

    pub fn capture_preset(&self) -> Result<PresetDocument, ContextError> {
        let chain = self.chain.lock().map_err(|_| ContextError::ChainPoisoned)?;
        Ok(PresetDocument::capture(&*chain, self.flags))
    }

    /// Apply a whole document under one lock so the clock never sees it
    /// half-written. Returns the number of rejected fields.
    pub fn apply_preset(&mut self, preset: &PresetDocument) -> Result<usize, ContextError> {
        let outcome = {
            let mut chain = self.chain.lock().map_err(|_| ContextError::ChainPoisoned)?;
            preset.apply(&mut *chain)
        };
        self.flags = outcome.flags;
        Ok(outcome.rejected)
    }

    /// Load `last-preset.json` if there is one. A corrupt or unreadable file
    /// is logged and the current state is kept.
    pub fn restore_last_preset(&mut self) -> bool {
        match self.store.load_last() {
            Ok(Some(preset)) => match self.apply_preset(&preset) {
                Ok(rejected) => {
                    info!(rejected, "Restored last preset");
                    true
                }
                Err(e) => {
                    warn!("Failed to apply last preset: {}", e);
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!("Keeping defaults, last preset not loaded: {}", e);
                false
            }
        }
    }

    pub fn save_current(&self) -> Result<PathBuf, ContextError> {
        let preset = self.capture_preset()?;
        let path = self.store.save_last(&preset)?;
        info!(path = %path.display(), "Preset saved");
        Ok(path)
    }

    pub fn export_current(&self) -> Result<(PathBuf, String), ContextError> {
        let preset = self.capture_preset()?;
        Ok(self.store.export(&preset)?)
    }

    /// Decode clipboard text and apply it; nothing is written unless the
    /// whole document decodes
    pub fn paste_preset(&mut self, text: &str) -> Result<usize, ContextError> {
        let preset = PresetDocument::from_clipboard_text(text)?;
        self.apply_preset(&preset)
    }

    pub fn start_sequencer(&mut self) -> Result<Duration, ContextError> {
        Ok(self.clock.start()?)
    }

    pub fn stop_sequencer(&mut self) {
        self.clock.stop();
    }

    pub fn all_notes_off(&mut self) {
        self.clock.all_notes_off();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::{Arc, Mutex};

    use analogx_core::{Amount, ChainParam, SequencerConfig, SignalChain};

    use super::*;
    use crate::parameter_bank::{NoteMessage, ParameterBank};
    use crate::preset_store::LAST_PRESET_FILE;

    fn context(name: &str) -> (SynthContext, Arc<Mutex<ParameterBank>>, PathBuf) {
        let dir = std::env::temp_dir()
            .join(format!("analogx-context-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let bank = ParameterBank::default().recording_notes().into_shared();
        let shared: SharedChain = bank.clone();
        let config = SequencerConfig {
            tempo: 600.0,
            velocity: 127,
        };
        let sequencer = GenerativeSequencer::with_seed(config, 11);
        let ctx = SynthContext::new(shared, sequencer, PresetStore::new(&dir));
        (ctx, bank, dir)
    }

    #[test]
    fn test_restore_missing_keeps_defaults() {
        let (mut ctx, bank, _dir) = context("missing");
        assert!(!ctx.restore_last_preset());
        let default =
            PresetDocument::capture(&ParameterBank::default(), PerformanceFlags::default());
        assert_eq!(PresetDocument::capture(&*bank.lock().unwrap(), ctx.flags()), default);
    }

    #[test]
    fn test_restore_corrupt_keeps_defaults() {
        let (mut ctx, bank, dir) = context("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LAST_PRESET_FILE), "{\"delayEnabled\": \"true\"}").unwrap();
        assert!(!ctx.restore_last_preset());
        assert_eq!(bank.lock().unwrap().param(ChainParam::ReverbMix), 0.4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_then_restore() {
        let (mut ctx, bank, dir) = context("restore");
        bank.lock().unwrap().set_param(ChainParam::ReverbMix, 0.75).unwrap();
        ctx.set_hold(true);
        ctx.save_current().unwrap();

        let fresh_bank = ParameterBank::default().into_shared();
        let shared: SharedChain = fresh_bank.clone();
        let sequencer = GenerativeSequencer::new(SequencerConfig::default());
        let mut fresh = SynthContext::new(shared, sequencer, PresetStore::new(&dir));
        assert!(fresh.restore_last_preset());
        assert_eq!(fresh_bank.lock().unwrap().param(ChainParam::ReverbMix), 0.75);
        assert!(fresh.flags().hold);
        assert!(!fresh.flags().mono);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_paste_with_smart_quotes() {
        let (mut ctx, bank, _dir) = context("paste");
        let mut preset = ctx.capture_preset().unwrap();
        preset.delay_mix = Amount(0.2);
        preset.mono_enabled = true;
        let text = preset.to_json().unwrap().replacen('"', "\u{201C}", 1);
        assert_eq!(ctx.paste_preset(&text).unwrap(), 0);
        assert_eq!(bank.lock().unwrap().param(ChainParam::DelayMix), 0.2);
        assert!(ctx.flags().mono);
    }

    #[test]
    fn test_bad_paste_changes_nothing() {
        let (mut ctx, bank, _dir) = context("badpaste");
        let before = ctx.capture_preset().unwrap();
        let mut text = before.to_json().unwrap();
        text.truncate(text.len() / 2);
        assert!(matches!(ctx.paste_preset(&text), Err(ContextError::Decode(_))));
        assert_eq!(PresetDocument::capture(&*bank.lock().unwrap(), ctx.flags()), before);
    }

    #[test]
    fn test_export_current() {
        let (ctx, _bank, dir) = context("export");
        let (path, text) = ctx.export_current().unwrap();
        assert!(path.ends_with("asx-preset-export.json"));
        assert_eq!(PresetDocument::from_json(&text).unwrap(), ctx.capture_preset().unwrap());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_sequencer_lifecycle() {
        let (mut ctx, bank, _dir) = context("sequencer");
        let pulse = ctx.start_sequencer().unwrap();
        assert_eq!(ctx.start_sequencer().unwrap(), pulse);
        std::thread::sleep(pulse * 4);
        ctx.all_notes_off();
        ctx.stop_sequencer();
        assert!(!ctx.clock().is_running());
        let bank = bank.lock().unwrap();
        assert!(bank.sounding_notes().is_empty());
        assert_eq!(bank.note_log().last(), Some(&NoteMessage::AllOff));
    }
}

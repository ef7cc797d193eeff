//! Clock thread driving the generative sequencer

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use analogx_core::{ChainParam, GenerativeSequencer, NoteEvent};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parameter_bank::SharedChain;

/// Delay time follows the pulse: a dotted sixteenth
const DELAY_PULSES: f64 = 1.5;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Tempo {0} does not give a usable pulse")]
    InvalidTempo(f64),
    #[error("Failed to spawn clock thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Sequencer was lost when the clock thread panicked")]
    SequencerLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockCommand {
    AllNotesOff,
    Stop,
}

/// Sequencer position, readable from any thread without locking
pub struct ClockStatus {
    running: AtomicBool,
    pulse_count: AtomicU64,
    triad_index: AtomicUsize,
    root_offset: AtomicI32,
}

impl ClockStatus {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            pulse_count: AtomicU64::new(0),
            triad_index: AtomicUsize::new(0),
            root_offset: AtomicI32::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulse_count.load(Ordering::Relaxed)
    }

    pub fn triad_index(&self) -> usize {
        self.triad_index.load(Ordering::Relaxed)
    }

    pub fn root_offset(&self) -> i32 {
        self.root_offset.load(Ordering::Relaxed)
    }

    fn update(&self, sequencer: &GenerativeSequencer) {
        self.pulse_count.store(sequencer.pulse_count(), Ordering::Relaxed);
        self.triad_index.store(sequencer.triad_index(), Ordering::Relaxed);
        self.root_offset.store(sequencer.root_offset(), Ordering::Relaxed);
    }
}

impl Default for ClockStatus {
    fn default() -> Self {
        Self::new()
    }
}

struct Worker {
    commands: Sender<ClockCommand>,
    handle: JoinHandle<GenerativeSequencer>,
}

/// Runs a [`GenerativeSequencer`] on its own thread against a shared chain
///
/// The sequencer moves into the thread while running and comes back on
/// `stop`, so a restarted clock continues where it left off with the same
/// pulse period.
pub struct SequencerClock {
    chain: SharedChain,
    sequencer: Option<GenerativeSequencer>,
    worker: Option<Worker>,
    status: Arc<ClockStatus>,
    pulse: Option<Duration>,
}

impl SequencerClock {
    pub fn new(chain: SharedChain, sequencer: GenerativeSequencer) -> Self {
        let status = Arc::new(ClockStatus::new());
        status.update(&sequencer);
        Self {
            chain,
            pulse: sequencer.pulse_period(),
            sequencer: Some(sequencer),
            worker: None,
            status,
        }
    }

    pub fn status(&self) -> Arc<ClockStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn pulse_period(&self) -> Option<Duration> {
        self.pulse
    }

    /// Start pulsing; a second call while running is a no-op
    pub fn start(&mut self) -> Result<Duration, ClockError> {
        if let (Some(pulse), Some(_)) = (self.pulse, self.worker.as_ref()) {
            return Ok(pulse);
        }
        let Some(mut sequencer) = self.sequencer.take() else {
            return Err(ClockError::SequencerLost);
        };

        let Some(pulse) = sequencer.start() else {
            let tempo = sequencer.config().tempo;
            self.sequencer = Some(sequencer);
            return Err(ClockError::InvalidTempo(tempo));
        };
        self.pulse = Some(pulse);
        self.sync_delay(pulse);

        let (tx, rx) = unbounded();
        let chain = self.chain.clone();
        let status = self.status.clone();
        status.running.store(true, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name("analogx-clock".into())
            .spawn(move || Self::run(sequencer, chain, rx, status, pulse));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.status.running.store(false, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        self.worker = Some(Worker {
            commands: tx,
            handle,
        });
        info!(pulse_ms = pulse.as_secs_f64() * 1000.0, "Sequencer clock started");
        Ok(pulse)
    }

    /// Stop pulsing and silence everything; safe to call when stopped
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = worker.commands.send(ClockCommand::Stop);
        match worker.handle.join() {
            Ok(sequencer) => self.sequencer = Some(sequencer),
            Err(_) => warn!("Sequencer clock thread panicked"),
        }
        self.status.running.store(false, Ordering::Relaxed);
        info!("Sequencer clock stopped");
    }

    /// Silence every pitch now and drop pending note-offs
    pub fn all_notes_off(&mut self) {
        if let Some(worker) = &self.worker {
            if worker.commands.send(ClockCommand::AllNotesOff).is_ok() {
                return;
            }
        }
        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.cancel_note_offs();
        }
        match self.chain.lock() {
            Ok(mut chain) => chain.all_notes_off(),
            Err(_) => warn!("Signal chain lock poisoned, all-notes-off skipped"),
        }
    }

    fn sync_delay(&self, pulse: Duration) {
        let Ok(mut chain) = self.chain.lock() else {
            warn!("Signal chain lock poisoned, delay time not synced");
            return;
        };
        if let Err(e) = chain.set_param(ChainParam::DelayTime, pulse.as_secs_f64() * DELAY_PULSES) {
            warn!("Delay time not synced to tempo: {}", e);
        }
    }

    fn run(
        mut sequencer: GenerativeSequencer,
        chain: SharedChain,
        commands: Receiver<ClockCommand>,
        status: Arc<ClockStatus>,
        pulse: Duration,
    ) -> GenerativeSequencer {
        let mut next_pulse = Instant::now();

        loop {
            let now = Instant::now();

            let released = sequencer.take_due_note_offs(now);
            if !released.is_empty() {
                Self::release(&chain, &released);
            }

            if now >= next_pulse {
                let notes = sequencer.tick(now);
                Self::trigger(&chain, &notes);
                status.update(&sequencer);

                next_pulse += pulse;
                if next_pulse < now {
                    // Fell behind (suspended process); resync rather than burst
                    debug!("Clock overrun, skipping missed pulses");
                    next_pulse = now + pulse;
                }
            }

            let wake = sequencer
                .next_note_off()
                .map_or(next_pulse, |due| due.min(next_pulse));
            match commands.recv_timeout(wake.saturating_duration_since(Instant::now())) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(ClockCommand::AllNotesOff) => Self::silence(&mut sequencer, &chain),
                Ok(ClockCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    Self::silence(&mut sequencer, &chain);
                    break;
                }
            }
        }

        status.running.store(false, Ordering::Relaxed);
        sequencer
    }

    fn trigger(chain: &SharedChain, notes: &[NoteEvent]) {
        if notes.is_empty() {
            return;
        }
        let Ok(mut chain) = chain.lock() else {
            warn!("Signal chain lock poisoned, pulse dropped");
            return;
        };
        for note in notes {
            chain.play_note(note.pitch, note.velocity);
        }
    }

    fn release(chain: &SharedChain, pitches: &[u8]) {
        let Ok(mut chain) = chain.lock() else {
            warn!("Signal chain lock poisoned, note-offs dropped");
            return;
        };
        for &pitch in pitches {
            chain.stop_note(pitch);
        }
    }

    fn silence(sequencer: &mut GenerativeSequencer, chain: &SharedChain) {
        let pending = sequencer.cancel_note_offs();
        debug!(pending = pending.len(), "All notes off");
        match chain.lock() {
            Ok(mut chain) => chain.all_notes_off(),
            Err(_) => warn!("Signal chain lock poisoned, all-notes-off skipped"),
        }
    }
}

impl Drop for SequencerClock {
    fn drop(&mut self) {
        self.stop();
    }
}

//! analogx: headless generative run of the AnalogX control plane

mod config;

use std::thread;
use std::time::Duration;

use analogx_core::{GenerativeSequencer, SequencerConfig};
use analogx_services::{ParameterBank, PresetStore, SharedChain, SynthContext};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("analogx=debug".parse()?))
        .init();

    let config = config::load_config();
    tracing::info!(path = %config::config_path().display(), "Starting AnalogX");

    let sequencer_config = SequencerConfig {
        tempo: config.sequencer.tempo,
        velocity: config.sequencer.velocity,
    };
    let sequencer = match config.sequencer.seed {
        Some(seed) => GenerativeSequencer::with_seed(sequencer_config, seed),
        None => GenerativeSequencer::new(sequencer_config),
    };

    let chain: SharedChain = ParameterBank::default().into_shared();
    let store = PresetStore::new(config.presets.dir());
    let mut ctx = SynthContext::new(chain, sequencer, store);
    ctx.restore_last_preset();

    let run_for = Duration::try_from_secs_f64(config.sequencer.run_seconds)
        .context("run_seconds must be a non-negative number")?;
    let pulse = ctx.start_sequencer()?;
    tracing::info!(
        tempo = config.sequencer.tempo,
        pulse_ms = pulse.as_secs_f64() * 1000.0,
        "Sequencer running for {:?}",
        run_for
    );

    let status = ctx.clock().status();
    thread::sleep(run_for);
    ctx.stop_sequencer();
    tracing::info!(
        pulses = status.pulse_count(),
        triad = status.triad_index(),
        root = status.root_offset(),
        "Sequencer finished"
    );

    if config.presets.save_on_exit {
        // A failed save is reported, never fatal
        if let Err(e) = ctx.save_current() {
            tracing::error!("Failed to save preset: {}", e);
        }
    }
    if config.presets.export_on_exit {
        let (path, text) = ctx.export_current().context("Failed to export preset")?;
        tracing::info!(path = %path.display(), "Preset exported");
        println!("{text}");
    }

    Ok(())
}

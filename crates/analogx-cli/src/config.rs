use std::path::PathBuf;

use analogx_core::sequencer::{DEFAULT_TEMPO, DEFAULT_VELOCITY};

#[derive(Debug, serde::Serialize, serde::Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub sequencer: SequencerSection,
    #[serde(default)]
    pub presets: PresetsSection,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SequencerSection {
    pub tempo: f64,
    pub velocity: u8,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
    pub run_seconds: f64,
}

impl Default for SequencerSection {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            velocity: DEFAULT_VELOCITY,
            seed: None,
            run_seconds: 30.0,
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PresetsSection {
    pub dir: Option<PathBuf>,
    pub save_on_exit: bool,
    pub export_on_exit: bool,
}

impl Default for PresetsSection {
    fn default() -> Self {
        Self {
            dir: None,
            save_on_exit: true,
            export_on_exit: false,
        }
    }
}

impl PresetsSection {
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("analogx")
        })
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("analogx")
        .join("config.toml")
}

pub fn load_config() -> AppConfig {
    let path = config_path();
    let Ok(text) = std::fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    parse_config(&text).unwrap_or_else(|e| {
        tracing::warn!("Ignoring {}: {}", path.display(), e);
        AppConfig::default()
    })
}

fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(text)
}

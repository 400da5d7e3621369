//! Shared configuration: predefined durations, optional adjustment deltas and
//! selectable project names. The document itself is maintained by an
//! external config API; this side only reads it, validates uploads into it,
//! and turns labels into tenths for the selection controls.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{clock, model::NEUTRAL};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub predefined_times: Vec<String>,
    /// Later config revisions dropped this list; it stays optional rather
    /// than required or removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_times: Option<Vec<String>>,
    pub names: Vec<String>,
}

impl Default for Config {
    /// The built-in fallback used whenever the external document cannot be
    /// loaded. The page keeps working on these values.
    fn default() -> Self {
        Self {
            predefined_times: vec!["0:30".into(), "1:00".into(), "2:30".into()],
            change_times: Some(vec!["0:30".into(), "-0:30".into()]),
            names: vec!["Projekt A".into(), "Projekt B".into()],
        }
    }
}

/// One selectable duration or delta button: the label as shipped in the
/// config, plus its parsed value.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeControl {
    pub label: String,
    pub tenths: i64,
}

/// The rendered selection controls, rebuilt wholesale after every config
/// (re)load.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlSet {
    pub predefined: Vec<TimeControl>,
    pub changes: Vec<TimeControl>,
    /// Project names with the "Neutral" sentinel appended last.
    pub names: Vec<String>,
}

pub fn render_controls(config: &Config) -> ControlSet {
    let to_control = |label: &String| TimeControl {
        label: label.clone(),
        tenths: clock::parse_label(label),
    };

    let mut names = config.names.clone();
    names.push(NEUTRAL.to_string());

    ControlSet {
        predefined: config.predefined_times.iter().map(to_control).collect(),
        changes: config
            .change_times
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(to_control)
            .collect(),
        names,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadReceipt {
    pub message: String,
}

pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn document_path(&self) -> &Path {
        &self.path
    }

    /// Load the config document. Any failure falls back to the built-in
    /// default; loading never takes the page down.
    pub fn load(&self) -> Config {
        if !self.path.exists() {
            warn!(
                "config document {} not found, using default config",
                self.path.display()
            );
            return Config::default();
        }

        match self.try_load() {
            Ok(config) => {
                info!("config loaded from {}", self.path.display());
                config
            }
            Err(err) => {
                error!("failed to load config, using default config: {err:?}");
                Config::default()
            }
        }
    }

    fn try_load(&self) -> Result<Config> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config from {}", self.path.display()))?;
        serde_json::from_str(&contents).context("config document is not a valid config")
    }

    /// Validate and install an uploaded config file. A file that does not
    /// parse as a config is rejected with the failure detail and the current
    /// document is left untouched.
    pub fn upload(&self, source: &Path) -> Result<UploadReceipt> {
        let contents = std::fs::read_to_string(source)
            .with_context(|| format!("failed to read uploaded file {}", source.display()))?;

        serde_json::from_str::<Config>(&contents)
            .context("invalid JSON format in uploaded file")?;

        std::fs::write(&self.path, &contents).with_context(|| {
            format!("failed to write config document {}", self.path.display())
        })?;

        info!("config document replaced ({} bytes)", contents.len());
        Ok(UploadReceipt {
            message: format!(
                "config uploaded successfully! File size: {} bytes",
                contents.len()
            ),
        })
    }
}

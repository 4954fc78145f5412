//! Configuration loading for keyspan.
//!
//! Settings are layered, later sources winning:
//!
//! 1. Compiled defaults (two hands of five fingers, one-octave span, 88 keys)
//! 2. `/etc/keyspan/config.toml` (system)
//! 3. `~/.config/keyspan/config.toml` (user)
//! 4. `./keyspan.toml`, or the file passed on the command line
//! 5. Environment variables (`KEYSPAN_*`)
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Example Config
//!
//! ```toml
//! [player]
//! hands = 2
//! fingers = 5
//! span = 7.5
//!
//! [piano]
//! lowest_key = "A0"
//! highest_key = "C8"
//!
//! [report]
//! finger_overflow = "warn"
//! abort_on_fail = true
//!
//! [input]
//! channels = [1, 2]
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use keyspan_conf::KeyspanConfig;
//!
//! let config = KeyspanConfig::load().expect("Failed to load config");
//! let resolved = config.resolve().expect("Invalid config");
//! println!("{} hands", resolved.constraints.hands);
//! ```

pub mod limits;
pub mod loader;
pub mod run;

pub use limits::{ChecksConfig, PianoConfig, PlayerConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use run::{InputConfig, LoggingConfig, ReportConfig};

use keyspan::keys::parse_key_name;
use keyspan::{Constraints, IngestOptions, Policy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Complete keyspan configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyspanConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub piano: PianoConfig,
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration turned into the values the checker consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub constraints: Constraints,
    pub policy: Policy,
    pub ingest: IngestOptions,
}

impl KeyspanConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace `./keyspan.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = KeyspanConfig::default();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
        }

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_into(&path, &mut config)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;

        Ok((config, sources))
    }

    /// Validate and convert into checker inputs.
    pub fn resolve(&self) -> Result<Resolved, ConfigError> {
        let lowest_key = parse_key_name(&self.piano.lowest_key)
            .map_err(|e| ConfigError::invalid("piano.lowest_key", e.to_string()))?;
        let highest_key = parse_key_name(&self.piano.highest_key)
            .map_err(|e| ConfigError::invalid("piano.highest_key", e.to_string()))?;

        let constraints = Constraints {
            hands: self.player.hands,
            fingers_per_hand: self.player.fingers,
            max_span: self.player.span,
            lowest_key,
            highest_key,
            max_notes: self.player.max_notes,
            check_range: self.checks.range,
            check_player: self.checks.player,
        };
        constraints
            .validate()
            .map_err(|e| ConfigError::invalid("player/piano", e.to_string()))?;

        if let Some(bad) = self.input.channels.iter().find(|&&c| !(1..=16).contains(&c)) {
            return Err(ConfigError::invalid(
                "input.channels",
                format!("channel {bad} is outside 1-16"),
            ));
        }

        let policy = Policy {
            hide_warnings: self.report.hide_warnings,
            abort_on_fail: self.report.abort_on_fail,
            finger_overflow: self.report.finger_overflow,
            finger_overflow_tolerance: self.report.finger_overflow_tolerance,
        };

        let ingest = IngestOptions {
            include_drums: self.input.include_drums,
            tracks: (!self.input.tracks.is_empty()).then(|| self.input.tracks.clone()),
            channels: (!self.input.channels.is_empty())
                .then(|| self.input.channels.iter().map(|c| c - 1).collect()),
        };

        Ok(Resolved {
            constraints,
            policy,
            ingest,
        })
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Built by hand for stable ordering and comments
        let mut output = String::new();

        output.push_str("# keyspan configuration\n\n");

        output.push_str("[player]\n");
        output.push_str(&format!("hands = {}\n", self.player.hands));
        output.push_str(&format!("fingers = {}\n", self.player.fingers));
        output.push_str(&format!("span = {:?}\n", self.player.span));
        match self.player.max_notes {
            Some(n) => output.push_str(&format!("max_notes = {}\n", n)),
            None => output.push_str("# max_notes = hands * fingers\n"),
        }

        output.push_str("\n[piano]\n");
        output.push_str(&format!("lowest_key = \"{}\"\n", self.piano.lowest_key));
        output.push_str(&format!("highest_key = \"{}\"\n", self.piano.highest_key));

        output.push_str("\n[checks]\n");
        output.push_str(&format!("range = {}\n", self.checks.range));
        output.push_str(&format!("player = {}\n", self.checks.player));

        output.push_str("\n[report]\n");
        output.push_str(&format!("hide_warnings = {}\n", self.report.hide_warnings));
        output.push_str(&format!("abort_on_fail = {}\n", self.report.abort_on_fail));
        output.push_str(&format!(
            "finger_overflow = \"{}\"\n",
            self.report.finger_overflow
        ));
        output.push_str(&format!(
            "finger_overflow_tolerance = {}\n",
            self.report.finger_overflow_tolerance
        ));
        output.push_str(&format!("note_names = {}\n", self.report.note_names));
        output.push_str(&format!("seconds = {}\n", self.report.seconds));

        output.push_str("\n[input]\n");
        output.push_str(&format!("include_drums = {}\n", self.input.include_drums));
        output.push_str(&format!("tracks = {:?}\n", self.input.tracks));
        output.push_str(&format!("channels = {:?}\n", self.input.channels));

        output.push_str("\n[logging]\n");
        output.push_str(&format!("level = \"{}\"\n", self.logging.level));

        output
    }
}

//! How a run reads its input and reports.

use keyspan::OverflowSeverity;
use serde::{Deserialize, Serialize};

/// Reporting policy and presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Leave warnings out of the output. They still count toward the verdict.
    #[serde(default)]
    pub hide_warnings: bool,

    /// Stop at the first fail.
    #[serde(default)]
    pub abort_on_fail: bool,

    /// `fail` or `warn`.
    /// Default: fail
    #[serde(default)]
    pub finger_overflow: OverflowSeverity,

    /// Keys over capacity still reported as a warning when
    /// `finger_overflow = "warn"`.
    /// Default: 1
    #[serde(default = "ReportConfig::default_tolerance")]
    pub finger_overflow_tolerance: usize,

    /// Show keys as note names rather than MIDI numbers.
    /// Default: true
    #[serde(default = "ReportConfig::default_true")]
    pub note_names: bool,

    /// Show times in seconds rather than ticks.
    /// Default: true
    #[serde(default = "ReportConfig::default_true")]
    pub seconds: bool,
}

impl ReportConfig {
    fn default_tolerance() -> usize {
        1
    }

    fn default_true() -> bool {
        true
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hide_warnings: false,
            abort_on_fail: false,
            finger_overflow: OverflowSeverity::Fail,
            finger_overflow_tolerance: Self::default_tolerance(),
            note_names: true,
            seconds: true,
        }
    }
}

/// Which MIDI events are read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Read the GM percussion channel (10).
    #[serde(default)]
    pub include_drums: bool,

    /// Track indices to read. Empty reads every track.
    #[serde(default)]
    pub tracks: Vec<usize>,

    /// Channels to read, 1-16. Empty reads every channel.
    #[serde(default)]
    pub channels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error or a full
    /// `RUST_LOG`-style filter).
    /// Default: warn
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

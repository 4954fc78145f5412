//! keyspan - check whether a MIDI file can be played on a piano
//!
//! Settings come from config files and `KEYSPAN_*` variables (see
//! `keyspan-conf`); flags given here win over both.
//!
//! Exit status: 0 playable, 3 playable with warnings, 1 not playable,
//! 2 bad input or configuration.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use keyspan::OverflowSeverity;
use keyspan_conf::KeyspanConfig;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

mod render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "keyspan")]
#[command(about = "Check whether a MIDI file can be played by a pianist")]
#[command(version)]
struct Cli {
    /// MIDI file to check
    #[arg(required_unless_present = "print_config")]
    file: Option<PathBuf>,

    /// Number of hands
    #[arg(short = 'H', long)]
    hands: Option<usize>,

    /// Fingers per hand
    #[arg(short, long)]
    fingers: Option<usize>,

    /// Widest reach of one hand, in white keys (black keys count 0.5)
    #[arg(short, long)]
    span: Option<f64>,

    /// Most keys held at once [default: hands * fingers]
    #[arg(short = 'n', long)]
    max_notes: Option<usize>,

    /// Lowest key on the piano, as a note name or MIDI number
    #[arg(short, long)]
    lowest_key: Option<String>,

    /// Highest key on the piano, as a note name or MIDI number
    #[arg(short = 'r', long)]
    highest_key: Option<String>,

    /// Stop at the first fail
    #[arg(short = 'A', long)]
    abort_on_fail: bool,

    /// Do not print warnings
    #[arg(short = 'W', long)]
    hide_warnings: bool,

    /// Print MIDI key numbers instead of note names
    #[arg(short = 'N', long)]
    no_note_names: bool,

    /// Print times in ticks instead of seconds
    #[arg(short = 'T', long)]
    ticks: bool,

    /// Skip the key range checks
    #[arg(short = 'P', long)]
    no_piano_res: bool,

    /// Skip the hand, finger, span and note count checks
    #[arg(short = 'Y', long)]
    no_player_res: bool,

    /// Severity of holding more keys than fingers allow
    #[arg(long, value_name = "fail|warn")]
    finger_overflow: Option<OverflowSeverity>,

    /// Extra keys still reported as a warning with --finger-overflow warn
    #[arg(long)]
    tolerance: Option<usize>,

    /// Read the percussion channel too
    #[arg(long)]
    drums: bool,

    /// Only read this track (repeatable)
    #[arg(long = "track", value_name = "INDEX")]
    tracks: Vec<usize>,

    /// Only read this channel, 1-16 (repeatable)
    #[arg(long = "channel", value_name = "CHANNEL")]
    channels: Vec<u8>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Config file to use instead of ./keyspan.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Lay flags that were given over the loaded configuration.
    fn apply(&self, config: &mut KeyspanConfig) {
        if let Some(v) = self.hands {
            config.player.hands = v;
        }
        if let Some(v) = self.fingers {
            config.player.fingers = v;
        }
        if let Some(v) = self.span {
            config.player.span = v;
        }
        if let Some(v) = self.max_notes {
            config.player.max_notes = Some(v);
        }
        if let Some(v) = &self.lowest_key {
            config.piano.lowest_key = v.clone();
        }
        if let Some(v) = &self.highest_key {
            config.piano.highest_key = v.clone();
        }
        if let Some(v) = self.finger_overflow {
            config.report.finger_overflow = v;
        }
        if let Some(v) = self.tolerance {
            config.report.finger_overflow_tolerance = v;
        }
        if !self.tracks.is_empty() {
            config.input.tracks = self.tracks.clone();
        }
        if !self.channels.is_empty() {
            config.input.channels = self.channels.clone();
        }

        config.report.abort_on_fail |= self.abort_on_fail;
        config.report.hide_warnings |= self.hide_warnings;
        config.report.note_names &= !self.no_note_names;
        config.report.seconds &= !self.ticks;
        config.checks.range &= !self.no_piano_res;
        config.checks.player &= !self.no_player_res;
        config.input.include_drums |= self.drums;
    }
}

fn init_tracing(level: &str) {
    // stdout carries the report
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let (mut config, sources) = KeyspanConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config);
    init_tracing(&config.logging.level);
    tracing::debug!(
        files = ?sources.files,
        env = ?sources.env_overrides,
        "configuration loaded"
    );

    if cli.print_config {
        print!("{}", config.to_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let resolved = config.resolve()?;
    let path = cli.file.context("No MIDI file given")?;
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;

    let analysis = keyspan::analyze(
        &bytes,
        &resolved.constraints,
        &resolved.policy,
        &resolved.ingest,
    )
    .with_context(|| format!("Failed to check {}", path.display()))?;

    match cli.format {
        Format::Text => {
            let style = render::Style {
                note_names: config.report.note_names,
                seconds: config.report.seconds,
                color: !cli.no_color
                    && std::env::var_os("NO_COLOR").is_none()
                    && std::io::stdout().is_terminal(),
            };
            print!("{}", render::text(&analysis, &style));
        }
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(match analysis.report.verdict {
        keyspan::Verdict::Playable => ExitCode::SUCCESS,
        keyspan::Verdict::PlayableWithWarnings => ExitCode::from(3),
        keyspan::Verdict::NotPlayable => ExitCode::FAILURE,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("keyspan: {e:#}");
            ExitCode::from(2)
        }
    }
}

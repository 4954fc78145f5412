//! Human-readable report output.

use keyspan::keys::key_name;
use keyspan::midi::AnomalyKind;
use keyspan::{Analysis, Entry, Finding, HandGroup, Severity, TempoMap, Tick, Verdict};
use owo_colors::OwoColorize;
use std::fmt::Write;

const INDENT: &str = "      ";

/// Presentation switches for text output.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub note_names: bool,
    pub seconds: bool,
    pub color: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            note_names: true,
            seconds: true,
            color: false,
        }
    }
}

impl Style {
    fn key(&self, key: u8) -> String {
        if self.note_names {
            key_name(key)
        } else {
            key.to_string()
        }
    }

    fn keys(&self, keys: &[u8]) -> String {
        keys.iter()
            .map(|&k| self.key(k))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn time(&self, tempo: &TempoMap, tick: Tick) -> String {
        if self.seconds {
            format!("{:.3}s", tempo.seconds_at(tick))
        } else {
            format!("tick {tick}")
        }
    }

    fn label(&self, severity: Severity) -> String {
        match (severity, self.color) {
            (Severity::Fail, true) => "Fail:".red().bold().to_string(),
            (Severity::Fail, false) => "Fail:".to_string(),
            (Severity::Warning, true) => "Warning:".yellow().bold().to_string(),
            (Severity::Warning, false) => "Warning:".to_string(),
        }
    }
}

/// Render every entry followed by a one-line summary.
pub fn text(analysis: &Analysis, style: &Style) -> String {
    let mut out = String::new();
    for entry in &analysis.report.entries {
        render_entry(&mut out, entry, &analysis.tempo, style);
    }
    out.push_str(&summary(analysis, style));
    out.push('\n');
    out
}

fn render_entry(out: &mut String, entry: &Entry, tempo: &TempoMap, style: &Style) {
    let (headline, details) = describe(&entry.finding, style);
    let _ = writeln!(
        out,
        "{} {} at {}",
        style.label(entry.severity),
        headline,
        style.time(tempo, entry.tick)
    );
    for line in details {
        let _ = writeln!(out, "{INDENT}{line}");
    }
}

fn describe(finding: &Finding, style: &Style) -> (String, Vec<String>) {
    match finding {
        Finding::OutOfRange {
            keys,
            lowest,
            highest,
        } => (
            "Keys out of range".to_string(),
            vec![format!(
                "{} outside {} to {}.",
                style.keys(keys),
                style.key(*lowest),
                style.key(*highest)
            )],
        ),
        Finding::NoteLimit { keys, held, max } => (
            "Too many keys held at once".to_string(),
            vec![
                format!("{held} keys held, maximum is {max}."),
                format!("Keys: {}.", style.keys(keys)),
            ],
        ),
        Finding::FingerOverflow {
            held,
            capacity,
            within_reach,
            assigned,
            residual,
            ..
        } => {
            let mut details = vec![format!(
                "{held} keys held, at most {capacity} can be pressed at once."
            )];
            if !within_reach {
                details.push("The keys are also spread wider than the hands can reach.".into());
            }
            details.extend(hand_lines(assigned, residual, style));
            ("Not enough fingers".to_string(), details)
        }
        Finding::SpanOverflow {
            groups_needed,
            hands,
            assigned,
            residual,
            ..
        } => {
            let mut details = vec![format!(
                "Keys need {groups_needed} hand positions, {hands} available."
            )];
            details.extend(hand_lines(assigned, residual, style));
            ("Keys spread too wide".to_string(), details)
        }
        Finding::Anomaly(anomaly) => {
            let what = match anomaly.issue {
                AnomalyKind::DuplicatePress => "pressed while already held",
                AnomalyKind::OrphanRelease => "released while not held",
                AnomalyKind::ZeroLengthNote => "pressed and released on the same tick",
                AnomalyKind::UnterminatedNote => "never released",
            };
            (
                format!("Key {} {what}", style.key(anomaly.key)),
                vec![format!(
                    "Track {}, channel {}.",
                    anomaly.track,
                    anomaly.channel + 1
                )],
            )
        }
    }
}

fn hand_lines(assigned: &[HandGroup], residual: &[u8], style: &Style) -> Vec<String> {
    let mut lines: Vec<String> = assigned
        .iter()
        .enumerate()
        .map(|(i, hand)| {
            if hand.is_empty() {
                format!("Hand {}: free.", i + 1)
            } else {
                format!("Hand {}: {}.", i + 1, style.keys(&hand.keys))
            }
        })
        .collect();
    if !residual.is_empty() {
        lines.push(format!("Left over: {}.", style.keys(residual)));
    }
    lines
}

fn summary(analysis: &Analysis, style: &Style) -> String {
    let report = &analysis.report;
    let counts = &report.counts;

    let mut line = match report.verdict {
        Verdict::Playable => "All tests passed!".to_string(),
        Verdict::PlayableWithWarnings => {
            format!("Playable, with {}.", plural(counts.warnings, "warning"))
        }
        Verdict::NotPlayable => format!(
            "Not playable: {}, {}.",
            plural(counts.fails, "fail"),
            plural(counts.warnings, "warning")
        ),
    };
    if counts.hidden_warnings > 0 {
        let _ = write!(line, " ({} hidden)", counts.hidden_warnings);
    }
    if report.aborted {
        line.push_str(" Stopped at the first fail.");
    }

    if !style.color {
        return line;
    }
    match report.verdict {
        Verdict::Playable => line.green().to_string(),
        Verdict::PlayableWithWarnings => line.yellow().to_string(),
        Verdict::NotPlayable => line.red().to_string(),
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

//! Turning per-interval findings into a verdict.

use crate::check::{self, Finding};
use crate::constraints::Constraints;
use crate::midi::Anomaly;
use crate::note::Tick;
use crate::timeline::PolyphonyInterval;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;

/// How a finding affects playability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Fail,
}

/// Severity given to finger overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowSeverity {
    #[default]
    Fail,
    /// Warn when the overflow is within the tolerance, fail otherwise.
    Warn,
}

impl FromStr for OverflowSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "warn" | "warning" => Ok(Self::Warn),
            other => Err(format!("expected \"fail\" or \"warn\", got {other:?}")),
        }
    }
}

impl fmt::Display for OverflowSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => f.write_str("fail"),
            Self::Warn => f.write_str("warn"),
        }
    }
}

/// Run-wide reporting policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Leave warnings out of the entries. They still affect the verdict.
    pub hide_warnings: bool,
    /// Stop evaluating at the first fail.
    pub abort_on_fail: bool,
    pub finger_overflow: OverflowSeverity,
    /// Keys over capacity still treated as a warning under `Warn`.
    pub finger_overflow_tolerance: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            hide_warnings: false,
            abort_on_fail: false,
            finger_overflow: OverflowSeverity::Fail,
            finger_overflow_tolerance: 1,
        }
    }
}

impl Policy {
    pub fn severity(&self, finding: &Finding) -> Severity {
        match finding {
            Finding::FingerOverflow {
                held,
                capacity,
                within_reach,
                ..
            } => match self.finger_overflow {
                OverflowSeverity::Warn
                    if *within_reach
                        && held.saturating_sub(*capacity) <= self.finger_overflow_tolerance =>
                {
                    Severity::Warning
                }
                _ => Severity::Fail,
            },
            Finding::Anomaly(_) => Severity::Warning,
            Finding::OutOfRange { .. }
            | Finding::NoteLimit { .. }
            | Finding::SpanOverflow { .. } => Severity::Fail,
        }
    }
}

/// Outcome for a single interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalVerdict {
    Playable,
    Warning,
    Fail,
}

impl IntervalVerdict {
    pub fn of(findings: &[Finding], policy: &Policy) -> Self {
        findings
            .iter()
            .map(|f| match policy.severity(f) {
                Severity::Warning => IntervalVerdict::Warning,
                Severity::Fail => IntervalVerdict::Fail,
            })
            .max()
            .unwrap_or(IntervalVerdict::Playable)
    }
}

/// Outcome for the whole performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Playable,
    PlayableWithWarnings,
    NotPlayable,
}

/// A surfaced finding and where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub tick: Tick,
    pub severity: Severity,
    pub finding: Finding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub fails: usize,
    /// All warnings, including hidden ones.
    pub warnings: usize,
    pub hidden_warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub verdict: Verdict,
    pub entries: Vec<Entry>,
    pub counts: Counts,
    pub intervals_evaluated: usize,
    /// Evaluation stopped early on a fail.
    pub aborted: bool,
}

/// Accumulates findings in timeline order.
///
/// Source anomalies are merged in by tick ahead of the interval that starts
/// at or after them.
#[derive(Debug)]
pub struct Reporter {
    policy: Policy,
    anomalies: VecDeque<Anomaly>,
    entries: Vec<Entry>,
    counts: Counts,
    evaluated: usize,
    aborted: bool,
}

impl Reporter {
    pub fn new(policy: Policy, mut anomalies: Vec<Anomaly>) -> Self {
        anomalies.sort_by_key(|a| a.tick);
        Self {
            policy,
            anomalies: anomalies.into(),
            entries: Vec::new(),
            counts: Counts::default(),
            evaluated: 0,
            aborted: false,
        }
    }

    /// Record one evaluated interval. Breaks once evaluation must stop.
    pub fn observe(&mut self, tick: Tick, findings: Vec<Finding>) -> ControlFlow<()> {
        if self.aborted {
            return ControlFlow::Break(());
        }
        self.flush_anomalies(Some(tick));
        self.evaluated += 1;

        let mut failed = false;
        for finding in findings {
            let severity = self.policy.severity(&finding);
            failed |= severity == Severity::Fail;
            self.record(tick, severity, finding);
        }

        if failed && self.policy.abort_on_fail {
            tracing::debug!(tick, "aborting on first fail");
            self.aborted = true;
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    pub fn finish(mut self) -> Report {
        if !self.aborted {
            self.flush_anomalies(None);
        }

        let verdict = if self.counts.fails > 0 {
            Verdict::NotPlayable
        } else if self.counts.warnings > 0 {
            Verdict::PlayableWithWarnings
        } else {
            Verdict::Playable
        };

        Report {
            verdict,
            entries: self.entries,
            counts: self.counts,
            intervals_evaluated: self.evaluated,
            aborted: self.aborted,
        }
    }

    fn flush_anomalies(&mut self, through: Option<Tick>) {
        while let Some(anomaly) = self.anomalies.front() {
            if through.is_some_and(|t| anomaly.tick > t) {
                break;
            }
            if let Some(anomaly) = self.anomalies.pop_front() {
                self.record(anomaly.tick, Severity::Warning, Finding::Anomaly(anomaly));
            }
        }
    }

    fn record(&mut self, tick: Tick, severity: Severity, finding: Finding) {
        match severity {
            Severity::Fail => self.counts.fails += 1,
            Severity::Warning => {
                self.counts.warnings += 1;
                if self.policy.hide_warnings {
                    self.counts.hidden_warnings += 1;
                    return;
                }
            }
        }
        self.entries.push(Entry {
            tick,
            severity,
            finding,
        });
    }
}

/// Evaluate every interval in order and reduce to a report.
pub fn run(
    intervals: &[PolyphonyInterval],
    constraints: &Constraints,
    policy: &Policy,
    anomalies: Vec<Anomaly>,
) -> Report {
    run_with_instants(intervals, &[], constraints, policy, anomalies)
}

/// Like [`run`], with zero-length instants checked at their tick, after the
/// interval starting there. Findings an instant shares with the interval
/// sounding around it are not repeated.
#[tracing::instrument(skip_all, fields(intervals = intervals.len(), instants = instants.len()))]
pub fn run_with_instants(
    intervals: &[PolyphonyInterval],
    instants: &[PolyphonyInterval],
    constraints: &Constraints,
    policy: &Policy,
    anomalies: Vec<Anomaly>,
) -> Report {
    let mut reporter = Reporter::new(policy.clone(), anomalies);
    let mut pending = instants.iter().peekable();

    'intervals: for interval in intervals {
        while let Some(instant) = pending.next_if(|i| i.start < interval.start) {
            if check_instant(&mut reporter, instant, &[], constraints, policy).is_break() {
                break 'intervals;
            }
        }

        let findings = check::evaluate(interval, constraints);
        tracing::debug!(
            start = interval.start,
            end = interval.end,
            verdict = ?IntervalVerdict::of(&findings, policy),
            "evaluated interval"
        );
        let shared = if pending.peek().is_some_and(|i| i.start < interval.end) {
            findings.clone()
        } else {
            Vec::new()
        };
        if reporter.observe(interval.start, findings).is_break() {
            break;
        }

        while let Some(instant) = pending.next_if(|i| i.start < interval.end) {
            if check_instant(&mut reporter, instant, &shared, constraints, policy).is_break() {
                break 'intervals;
            }
        }
    }

    for instant in pending {
        if check_instant(&mut reporter, instant, &[], constraints, policy).is_break() {
            break;
        }
    }

    let report = reporter.finish();
    tracing::debug!(
        verdict = ?report.verdict,
        fails = report.counts.fails,
        warnings = report.counts.warnings,
        "report complete"
    );
    report
}

fn check_instant(
    reporter: &mut Reporter,
    instant: &PolyphonyInterval,
    shared: &[Finding],
    constraints: &Constraints,
    policy: &Policy,
) -> ControlFlow<()> {
    let mut findings = check::evaluate(instant, constraints);
    findings.retain(|f| !shared.contains(f));
    tracing::debug!(
        tick = instant.start,
        verdict = ?IntervalVerdict::of(&findings, policy),
        "evaluated strike"
    );
    reporter.observe(instant.start, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::AnomalyKind;
    use pretty_assertions::assert_eq;

    fn interval(start: Tick, pitches: &[u8]) -> PolyphonyInterval {
        PolyphonyInterval {
            start,
            end: start + 100,
            active_pitches: pitches.to_vec(),
        }
    }

    fn anomaly(tick: Tick) -> Anomaly {
        Anomaly {
            tick,
            key: 60,
            channel: 0,
            track: 0,
            issue: AnomalyKind::OrphanRelease,
        }
    }

    fn overflow(held: usize, capacity: usize) -> Finding {
        Finding::FingerOverflow {
            keys: Vec::new(),
            held,
            capacity,
            within_reach: true,
            assigned: Vec::new(),
            residual: Vec::new(),
        }
    }

    #[test]
    fn clean_performance_is_playable() {
        let intervals = [interval(0, &[60]), interval(100, &[60, 64, 67])];
        let report = run(&intervals, &Constraints::default(), &Policy::default(), vec![]);

        assert_eq!(report.verdict, Verdict::Playable);
        assert!(report.entries.is_empty());
        assert_eq!(report.intervals_evaluated, 2);
    }

    #[test]
    fn abort_keeps_only_the_first_fail() {
        let intervals = [
            interval(0, &[60]),
            interval(100, &[10]),
            interval(200, &[5]),
            interval(300, &[0]),
        ];
        let policy = Policy {
            abort_on_fail: true,
            ..Default::default()
        };
        let report = run(&intervals, &Constraints::default(), &policy, vec![]);

        assert_eq!(report.verdict, Verdict::NotPlayable);
        assert!(report.aborted);
        assert_eq!(report.intervals_evaluated, 2);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].tick, 100);
    }

    #[test]
    fn without_abort_every_fail_is_collected() {
        let intervals = [interval(0, &[10]), interval(100, &[60]), interval(200, &[5])];
        let report = run(&intervals, &Constraints::default(), &Policy::default(), vec![]);

        let ticks: Vec<Tick> = report.entries.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![0, 200]);
        assert_eq!(report.counts.fails, 2);
        assert!(!report.aborted);
    }

    #[test]
    fn hidden_warnings_still_set_the_verdict() {
        let policy = Policy {
            hide_warnings: true,
            ..Default::default()
        };
        let report = run(
            &[interval(0, &[60])],
            &Constraints::default(),
            &policy,
            vec![anomaly(50)],
        );

        assert_eq!(report.verdict, Verdict::PlayableWithWarnings);
        assert!(report.entries.is_empty());
        assert_eq!(
            report.counts,
            Counts {
                fails: 0,
                warnings: 1,
                hidden_warnings: 1
            }
        );
    }

    #[test]
    fn anomalies_interleave_by_tick() {
        let intervals = [interval(0, &[10]), interval(200, &[10, 60])];
        let report = run(
            &intervals,
            &Constraints::default(),
            &Policy::default(),
            vec![anomaly(500), anomaly(100)],
        );

        let order: Vec<(Tick, Severity)> =
            report.entries.iter().map(|e| (e.tick, e.severity)).collect();
        assert_eq!(
            order,
            vec![
                (0, Severity::Fail),
                (100, Severity::Warning),
                (200, Severity::Fail),
                (500, Severity::Warning),
            ]
        );
    }

    #[test]
    fn anomalies_after_an_abort_are_dropped() {
        let policy = Policy {
            abort_on_fail: true,
            ..Default::default()
        };
        let report = run(
            &[interval(0, &[10]), interval(100, &[60])],
            &Constraints::default(),
            &policy,
            vec![anomaly(50)],
        );
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.counts.warnings, 0);
    }

    #[test]
    fn finger_overflow_severity_follows_policy() {
        let strict = Policy::default();
        assert_eq!(strict.severity(&overflow(11, 10)), Severity::Fail);

        let lenient = Policy {
            finger_overflow: OverflowSeverity::Warn,
            ..Default::default()
        };
        assert_eq!(lenient.severity(&overflow(11, 10)), Severity::Warning);
        assert_eq!(lenient.severity(&overflow(12, 10)), Severity::Fail);

        let tolerant = Policy {
            finger_overflow_tolerance: 2,
            ..lenient
        };
        assert_eq!(tolerant.severity(&overflow(12, 10)), Severity::Warning);
    }

    #[test]
    fn lenient_overflow_makes_eleven_notes_a_warning() {
        let keys: Vec<u8> = (60..=70).collect();
        let policy = Policy {
            finger_overflow: OverflowSeverity::Warn,
            ..Default::default()
        };
        let report = run(&[interval(0, &keys)], &Constraints::default(), &policy, vec![]);
        assert_eq!(report.verdict, Verdict::PlayableWithWarnings);
    }

    #[test]
    fn lenient_overflow_still_fails_keys_out_of_reach() {
        let keys = [24, 26, 28, 29, 60, 62, 64, 65, 96, 98, 100];
        let policy = Policy {
            finger_overflow: OverflowSeverity::Warn,
            finger_overflow_tolerance: 5,
            ..Default::default()
        };
        let report = run(&[interval(0, &keys)], &Constraints::default(), &policy, vec![]);

        assert_eq!(report.verdict, Verdict::NotPlayable);
        assert!(matches!(
            report.entries[0].finding,
            Finding::FingerOverflow {
                held: 11,
                capacity: 8,
                within_reach: false,
                ..
            }
        ));
    }

    fn instant(tick: Tick, pitches: &[u8]) -> PolyphonyInterval {
        PolyphonyInterval {
            start: tick,
            end: tick,
            active_pitches: pitches.to_vec(),
        }
    }

    #[test]
    fn struck_key_out_of_range_fails() {
        let intervals = [interval(0, &[60])];
        let instants = [instant(0, &[5, 60])];
        let report = run_with_instants(
            &intervals,
            &instants,
            &Constraints::default(),
            &Policy::default(),
            vec![],
        );

        assert_eq!(report.verdict, Verdict::NotPlayable);
        assert_eq!(report.intervals_evaluated, 2);
        assert!(matches!(
            &report.entries[..],
            [Entry {
                tick: 0,
                finding: Finding::OutOfRange { .. },
                ..
            }]
        ));
    }

    #[test]
    fn instants_do_not_repeat_the_surrounding_fail() {
        let intervals = [interval(0, &[10, 60])];
        let instants = [instant(50, &[10, 60, 62])];
        let report = run_with_instants(
            &intervals,
            &instants,
            &Constraints::default(),
            &Policy::default(),
            vec![],
        );

        assert_eq!(report.counts.fails, 1);
        assert_eq!(report.entries[0].tick, 0);
    }

    #[test]
    fn instants_in_silence_are_ordered_by_tick() {
        let intervals = [interval(100, &[60])];
        let instants = [instant(50, &[5]), instant(300, &[120])];
        let report = run_with_instants(
            &intervals,
            &instants,
            &Constraints::default(),
            &Policy::default(),
            vec![],
        );

        let ticks: Vec<Tick> = report.entries.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![50, 300]);
        assert_eq!(report.intervals_evaluated, 3);
    }

    #[test]
    fn interval_verdict_takes_the_worst_finding() {
        let policy = Policy::default();
        assert_eq!(IntervalVerdict::of(&[], &policy), IntervalVerdict::Playable);
        assert_eq!(
            IntervalVerdict::of(&[Finding::Anomaly(anomaly(0))], &policy),
            IntervalVerdict::Warning
        );
        assert_eq!(
            IntervalVerdict::of(&[Finding::Anomaly(anomaly(0)), overflow(11, 10)], &policy),
            IntervalVerdict::Fail
        );
    }

    #[test]
    fn overflow_severity_parses() {
        assert_eq!("warn".parse::<OverflowSeverity>(), Ok(OverflowSeverity::Warn));
        assert_eq!("FAIL".parse::<OverflowSeverity>(), Ok(OverflowSeverity::Fail));
        assert!("maybe".parse::<OverflowSeverity>().is_err());
    }
}

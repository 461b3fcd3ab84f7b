//! Before/after comparison of analyzer output for one issue.

use sigfix_protocol::{Issue, LineRange, Signal};
use sigfix_signals::SignalReport;

pub const NO_LONG_FUNCTION_IN_RANGE: &str = "no long function found in evidence range";

/// Outcome of re-analysing overlay content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Improved { message: String, details: String },
    NotImproved { message: String, details: String },
    /// The issue's evidence does not match what the analyzer sees
    Inconclusive { reason: String },
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Improved { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Improved { message, .. } | Self::NotImproved { message, .. } => message.clone(),
            Self::Inconclusive { reason } => format!("Verification inconclusive: {reason}"),
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::Improved { details, .. } | Self::NotImproved { details, .. } => {
                Some(details.clone())
            }
            Self::Inconclusive { .. } => None,
        }
    }
}

/// Compare `before` and `after` reports for the signal `issue` claims to fix.
pub fn verify_fix(
    issue: &Issue,
    threshold: usize,
    before: &SignalReport,
    after: &SignalReport,
) -> Verdict {
    match issue.signal {
        Signal::LongFunctions => verify_long_function(issue, threshold, before, after),
        Signal::DuplicateBlocks => verify_duplicates(before, after),
        other => Verdict::Inconclusive {
            reason: format!("no verifier for signal {other}"),
        },
    }
}

fn verify_long_function(
    issue: &Issue,
    threshold: usize,
    before: &SignalReport,
    after: &SignalReport,
) -> Verdict {
    let ranges: Vec<(&str, LineRange)> = issue
        .evidence
        .iter()
        .filter_map(|item| item.range().map(|range| (item.file.as_str(), range)))
        .collect();

    let Some(before_len) = max_length_in(before, &ranges, threshold) else {
        return Verdict::Inconclusive {
            reason: NO_LONG_FUNCTION_IN_RANGE.to_string(),
        };
    };

    match max_length_in(after, &ranges, 0) {
        None => Verdict::Improved {
            message: "Long function no longer present in evidence range".to_string(),
            details: format!("{before_len} -> < {threshold}"),
        },
        Some(after_len) if after_len < before_len => Verdict::Improved {
            message: "Long function shortened".to_string(),
            details: format!("{before_len} -> {after_len}"),
        },
        Some(after_len) => Verdict::NotImproved {
            message: "Long function was not shortened".to_string(),
            details: format!("{before_len} -> {after_len}"),
        },
    }
}

/// Longest function of at least `min_len` lines starting inside any range.
///
/// Only functions that start inside a range count, not every function that
/// overlaps it: an enclosing wrapper (a module-level closure around the
/// evidence) overlaps too and would otherwise stand in for the flagged
/// function.
fn max_length_in(report: &SignalReport, ranges: &[(&str, LineRange)], min_len: usize) -> Option<usize> {
    report
        .functions
        .iter()
        .filter(|span| span.length >= min_len)
        .filter(|span| {
            ranges
                .iter()
                .any(|(file, range)| span.file == *file && range.contains(span.start_line))
        })
        .map(|span| span.length)
        .max()
}

fn verify_duplicates(before: &SignalReport, after: &SignalReport) -> Verdict {
    let (before_count, after_count) = (before.duplicates.len(), after.duplicates.len());
    let details = format!("duplicate blocks: {before_count} -> {after_count}");
    if after_count < before_count {
        Verdict::Improved {
            message: "Duplicate blocks reduced".to_string(),
            details,
        }
    } else {
        Verdict::NotImproved {
            message: "Duplicate blocks did not decrease".to_string(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sigfix_protocol::{Confidence, EvidenceItem, IssueType, Metric};
    use sigfix_signals::{BlockOccurrence, DuplicateBlock, FunctionSpan};

    fn long_issue() -> Issue {
        Issue {
            issue_type: IssueType::Complexity,
            signal: Signal::LongFunctions,
            confidence: Confidence::Medium,
            evidence: vec![EvidenceItem::new(
                "a.ts",
                LineRange::new(10, 81),
                vec![Metric::loc(72)],
            )],
        }
    }

    fn report(functions: Vec<FunctionSpan>) -> SignalReport {
        SignalReport {
            functions,
            ..SignalReport::default()
        }
    }

    #[test]
    fn shortened_function_is_verified() {
        let before = report(vec![FunctionSpan::new("a.ts", "f", LineRange::new(10, 81))]);
        let after = report(vec![
            FunctionSpan::new("a.ts", "f", LineRange::new(10, 39)),
            FunctionSpan::new("a.ts", "helper", LineRange::new(41, 60)),
        ]);
        let verdict = verify_fix(&long_issue(), 50, &before, &after);
        assert!(verdict.is_verified());
        assert_eq!(verdict.details().as_deref(), Some("72 -> 30"));
    }

    #[test]
    fn vanished_function_counts_as_success() {
        let before = report(vec![FunctionSpan::new("a.ts", "f", LineRange::new(10, 81))]);
        let verdict = verify_fix(&long_issue(), 50, &before, &report(vec![]));
        assert!(verdict.is_verified());
        assert_eq!(verdict.details().as_deref(), Some("72 -> < 50"));
    }

    #[test]
    fn unchanged_length_is_not_verified() {
        let before = report(vec![FunctionSpan::new("a.ts", "f", LineRange::new(10, 81))]);
        let verdict = verify_fix(&long_issue(), 50, &before, &before.clone());
        assert!(!verdict.is_verified());
        assert_eq!(verdict.details().as_deref(), Some("72 -> 72"));
    }

    #[test]
    fn mismatched_evidence_is_inconclusive() {
        let before = report(vec![FunctionSpan::new("a.ts", "f", LineRange::new(100, 180))]);
        let verdict = verify_fix(&long_issue(), 50, &before, &before.clone());
        assert_eq!(
            verdict,
            Verdict::Inconclusive {
                reason: NO_LONG_FUNCTION_IN_RANGE.to_string()
            }
        );
        assert!(verdict.message().contains(NO_LONG_FUNCTION_IN_RANGE));
    }

    #[test]
    fn enclosing_wrapper_is_ignored() {
        let before = report(vec![
            FunctionSpan::new("a.ts", "outer", LineRange::new(1, 200)),
            FunctionSpan::new("a.ts", "f", LineRange::new(10, 81)),
        ]);
        let after = report(vec![
            FunctionSpan::new("a.ts", "outer", LineRange::new(1, 160)),
            FunctionSpan::new("a.ts", "f", LineRange::new(10, 41)),
        ]);
        let verdict = verify_fix(&long_issue(), 50, &before, &after);
        assert_eq!(verdict.details().as_deref(), Some("72 -> 32"));
    }

    #[test]
    fn duplicate_count_must_strictly_drop() {
        let block = DuplicateBlock {
            hash: "h".into(),
            length: 10,
            occurrences: vec![BlockOccurrence {
                file: "a.ts".into(),
                start_line: 1,
                end_line: 10,
            }],
        };
        let before = SignalReport {
            duplicates: vec![block.clone(), block.clone()],
            ..SignalReport::default()
        };
        let after = SignalReport {
            duplicates: vec![block],
            ..SignalReport::default()
        };
        let issue = Issue {
            signal: Signal::DuplicateBlocks,
            issue_type: IssueType::Duplication,
            ..long_issue()
        };

        let improved = verify_fix(&issue, 50, &before, &after);
        assert!(improved.is_verified());
        assert_eq!(improved.details().as_deref(), Some("duplicate blocks: 2 -> 1"));
        assert!(!verify_fix(&issue, 50, &after, &after).is_verified());
    }
}

use crate::config::SignalConfig;
use crate::engine::SignalReport;
use sigfix_protocol::{Confidence, EvidenceItem, Issue, IssueType, LineRange, Metric, Signal};

/// Rank and cap analyzer output into evidence-bearing issues.
///
/// Ordering is deterministic: long functions longest first, duplicate blocks
/// most-occurring first, cycles by path.
pub fn build_issues(report: &SignalReport, config: &SignalConfig) -> Vec<Issue> {
    let mut issues = Vec::new();

    let threshold = config.long_function_threshold;
    for span in report
        .long_functions(threshold)
        .into_iter()
        .take(config.max_long_function_issues)
    {
        let confidence = if span.length >= threshold.saturating_mul(2) {
            Confidence::High
        } else {
            Confidence::Medium
        };
        issues.push(Issue {
            issue_type: IssueType::Complexity,
            signal: Signal::LongFunctions,
            confidence,
            evidence: vec![EvidenceItem::new(
                span.file.clone(),
                span.range(),
                vec![Metric::loc(span.length)],
            )],
        });
    }

    for block in report.duplicates.iter().take(config.max_duplicate_issues) {
        let evidence = block
            .occurrences
            .iter()
            .take(config.max_occurrences_per_issue)
            .map(|occ| {
                EvidenceItem::new(
                    occ.file.clone(),
                    LineRange::new(occ.start_line, occ.end_line),
                    vec![
                        Metric::loc(block.length),
                        Metric::count(block.occurrences.len()),
                        Metric::hash(block.hash.clone()),
                    ],
                )
            })
            .collect();
        issues.push(Issue {
            issue_type: IssueType::Duplication,
            signal: Signal::DuplicateBlocks,
            confidence: Confidence::High,
            evidence,
        });
    }

    for cycle in report.cycles.iter().take(config.max_cycle_issues) {
        let side = |file: &str, range: LineRange| {
            EvidenceItem::new(file, range, vec![Metric::loc(range.len()), Metric::count(1)])
        };
        issues.push(Issue {
            issue_type: IssueType::Architecture,
            signal: Signal::DependencyCycles,
            confidence: Confidence::High,
            evidence: vec![
                side(cycle.from.as_str(), cycle.from_range),
                side(cycle.to.as_str(), cycle.to_range),
            ],
        });
    }

    if report.files_analyzed > 0 && report.test_files.is_empty() {
        // No file/line can substantiate an absence; the guard marks this incomplete.
        issues.push(Issue {
            issue_type: IssueType::Testing,
            signal: Signal::TestPresence,
            confidence: Confidence::Low,
            evidence: Vec::new(),
        });
    }

    issues
}

//! Structural validation of issue evidence.
//!
//! The guard is the single authority on whether an issue may be acted upon
//! downstream. It is total: every issue comes out stamped, and an incomplete
//! issue always carries a reason.

use sigfix_protocol::{metric_types, EvidenceItem, GuardedIssue, Issue, Metric, MetricValue};

pub const REASON_NO_EVIDENCE: &str = "no evidence items provided";
pub const REASON_MISSING_FILE: &str = "evidence item missing file path";
pub const REASON_START_NOT_POSITIVE: &str = "evidence item start line must be a positive integer";
pub const REASON_END_NOT_POSITIVE: &str = "evidence item end line must be a positive integer";
pub const REASON_INVERTED_RANGE: &str = "evidence item end line precedes start line";
pub const REASON_MISSING_METRICS: &str = "evidence item missing metrics";
pub const REASON_INVALID_METRIC: &str = "evidence item has invalid metric";

pub fn guard_issue(issue: Issue) -> GuardedIssue {
    match first_failure(&issue.evidence) {
        Some(reason) => GuardedIssue {
            issue,
            evidence_complete: false,
            missing_evidence_reason: Some(reason.to_string()),
        },
        None => GuardedIssue {
            issue,
            evidence_complete: true,
            missing_evidence_reason: None,
        },
    }
}

pub fn guard_issues(issues: Vec<Issue>) -> Vec<GuardedIssue> {
    let guarded: Vec<GuardedIssue> = issues.into_iter().map(guard_issue).collect();
    let incomplete = guarded.iter().filter(|g| !g.evidence_complete).count();
    if incomplete > 0 {
        log::debug!("{incomplete} of {} issues lack complete evidence", guarded.len());
    }
    guarded
}

/// Rules run in order across all items; the first failing rule wins.
fn first_failure(items: &[EvidenceItem]) -> Option<&'static str> {
    if items.is_empty() {
        return Some(REASON_NO_EVIDENCE);
    }
    if items.iter().any(|item| item.file.trim().is_empty()) {
        return Some(REASON_MISSING_FILE);
    }
    for item in items {
        if item.start_line < 1 {
            return Some(REASON_START_NOT_POSITIVE);
        }
        if item.end_line < 1 {
            return Some(REASON_END_NOT_POSITIVE);
        }
        if item.end_line < item.start_line {
            return Some(REASON_INVERTED_RANGE);
        }
    }
    if items.iter().any(|item| item.metrics.is_empty()) {
        return Some(REASON_MISSING_METRICS);
    }
    if items
        .iter()
        .flat_map(|item| item.metrics.iter())
        .any(|metric| !metric_is_valid(metric))
    {
        return Some(REASON_INVALID_METRIC);
    }
    None
}

fn metric_is_valid(metric: &Metric) -> bool {
    let kind = metric.metric_type.trim();
    if kind.is_empty() {
        return false;
    }
    let numeric_kind = kind == metric_types::LOC || kind == metric_types::COUNT;
    let textual_kind = kind == metric_types::HASH;

    match &metric.value {
        MetricValue::Number(n) => !textual_kind && n.is_finite() && *n >= 0.0,
        MetricValue::Text(s) => !numeric_kind && !s.trim().is_empty(),
    }
}

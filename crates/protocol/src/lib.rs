//! Wire types shared by the signal engine, the patch pipeline and the CLI.
//!
//! Every type serializes to camelCase JSON; the shapes are what downstream
//! narration, patch generation and git-apply collaborators consume.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Metric type tags carried by evidence items.
pub mod metric_types {
    pub const LOC: &str = "loc";
    pub const COUNT: &str = "count";
    pub const HASH: &str = "hash";
}

/// Mechanically detected structural fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Signal {
    LongFunctions,
    DuplicateBlocks,
    DependencyCycles,
    TestPresence,
}

impl Signal {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LongFunctions => "longFunctions",
            Self::DuplicateBlocks => "duplicateBlocks",
            Self::DependencyCycles => "dependencyCycles",
            Self::TestPresence => "testPresence",
        }
    }

    /// Whether a before/after verification rule exists for this signal.
    /// Signals without one are never offered to the patch pipeline.
    pub const fn has_verifier(self) -> bool {
        matches!(self, Self::LongFunctions | Self::DuplicateBlocks)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Complexity,
    Duplication,
    Architecture,
    Testing,
}

impl IssueType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::Duplication => "duplication",
            Self::Architecture => "architecture",
            Self::Testing => "testing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Metric payload: numeric (`loc`, `count`) or textual (`hash`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn loc(lines: usize) -> Self {
        Self::number(metric_types::LOC, lines as f64)
    }

    pub fn count(count: usize) -> Self {
        Self::number(metric_types::COUNT, count as f64)
    }

    pub fn hash(hash: impl Into<String>) -> Self {
        Self {
            metric_type: metric_types::HASH.to_string(),
            value: MetricValue::Text(hash.into()),
        }
    }

    pub fn number(metric_type: impl Into<String>, value: f64) -> Self {
        Self {
            metric_type: metric_type.into(),
            value: MetricValue::Number(value),
        }
    }
}

/// Inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineRange {
    #[must_use]
    pub const fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end_line < self.start_line
    }

    #[must_use]
    pub const fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// A file + line range + metrics tuple substantiating a signal.
///
/// Lines are signed so that evidence arriving from outside the engine can be
/// represented as-is and rejected by the guard instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub file: String,
    pub start_line: i64,
    pub end_line: i64,
    pub metrics: Vec<Metric>,
}

impl EvidenceItem {
    pub fn new(file: impl Into<String>, range: LineRange, metrics: Vec<Metric>) -> Self {
        Self {
            file: file.into(),
            start_line: range.start_line as i64,
            end_line: range.end_line as i64,
            metrics,
        }
    }

    /// The item's range, when both bounds are positive and ordered.
    pub fn range(&self) -> Option<LineRange> {
        if self.start_line < 1 || self.end_line < self.start_line {
            return None;
        }
        Some(LineRange::new(
            usize::try_from(self.start_line).ok()?,
            usize::try_from(self.end_line).ok()?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub signal: Signal,
    pub confidence: Confidence,
    pub evidence: Vec<EvidenceItem>,
}

/// An issue stamped by the evidence guard. Only complete issues may be acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuardedIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub evidence_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_evidence_reason: Option<String>,
}

impl GuardedIssue {
    /// Distinct evidence files in first-seen order.
    pub fn evidence_files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for item in &self.issue.evidence {
            if !files.iter().any(|f| f == &item.file) {
                files.push(item.file.clone());
            }
        }
        files
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FixSuggestion {
    pub issue_id: String,
    pub issue_type: IssueType,
    pub signal: Signal,
    pub files: Vec<String>,
    pub patch: String,
    pub verified: bool,
    pub verification_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_details: Option<String>,
}

/// Repository-wide numbers derived from one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignalSummary {
    pub files_analyzed: usize,
    pub function_count: usize,
    pub max_function_length: usize,
    pub mean_function_length: f64,
    pub long_function_count: usize,
    pub duplicate_block_count: usize,
    pub dependency_cycle_count: usize,
    pub test_file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub schema_version: u32,
    pub summary: SignalSummary,
    pub issues: Vec<GuardedIssue>,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

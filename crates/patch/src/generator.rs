//! Patch generation collaborator and the prompts it receives.

use crate::config::GeneratorSettings;
use async_trait::async_trait;
use sigfix_protocol::{GuardedIssue, LineRange, MetricValue, Signal};
use sigfix_signals::SourceSet;
use std::fmt::Write as _;

/// One request to the patch generator.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub issue_id: String,
    pub prompt: String,
    pub settings: GeneratorSettings,
    /// 1-based
    pub attempt: usize,
    /// Set on the re-prompt after an invalid diff
    pub strict: bool,
}

/// Source of candidate patches. Output is untrusted text.
#[async_trait]
pub trait PatchGenerator: Send + Sync {
    async fn generate(&self, request: &PatchRequest) -> anyhow::Result<String>;
}

/// Replays fixed responses: attempt `n` gets response `n`, the last one repeats.
#[derive(Debug, Clone)]
pub struct StaticPatchGenerator {
    responses: Vec<String>,
}

impl StaticPatchGenerator {
    pub fn new(patch: impl Into<String>) -> Self {
        Self {
            responses: vec![patch.into()],
        }
    }

    pub fn sequence(responses: Vec<String>) -> Self {
        Self { responses }
    }
}

#[async_trait]
impl PatchGenerator for StaticPatchGenerator {
    async fn generate(&self, request: &PatchRequest) -> anyhow::Result<String> {
        let idx = request.attempt.saturating_sub(1).min(self.responses.len().saturating_sub(1));
        self.responses
            .get(idx)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no patch available for {}", request.issue_id))
    }
}

/// Prompt with the issue's evidence, allowed ranges and numbered snippets.
pub fn build_prompt(issue: &GuardedIssue, sources: &SourceSet, context: usize) -> String {
    let signal = issue.issue.signal;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Fix a {} issue ({}, confidence {}).",
        signal,
        issue.issue.issue_type.as_str(),
        issue.issue.confidence.as_str()
    );
    let _ = writeln!(prompt, "{}\n", task_guidance(signal));

    prompt.push_str("Evidence:\n");
    for item in &issue.issue.evidence {
        let metrics: Vec<String> = item
            .metrics
            .iter()
            .map(|m| match &m.value {
                MetricValue::Number(n) => format!("{}={}", m.metric_type, n),
                MetricValue::Text(s) => format!("{}={}", m.metric_type, s),
            })
            .collect();
        let _ = writeln!(
            prompt,
            "- {} lines {}-{} ({})",
            item.file,
            item.start_line,
            item.end_line,
            metrics.join(", ")
        );
    }

    prompt.push_str("\nAllowed edit ranges (any change outside these lines is rejected):\n");
    for item in &issue.issue.evidence {
        let _ = writeln!(prompt, "- {}: {}-{}", item.file, item.start_line, item.end_line);
    }

    prompt.push_str("\nSource:\n");
    for item in &issue.issue.evidence {
        let Some(range) = item.range() else {
            continue;
        };
        match sources.get(&item.file) {
            Some(source) => {
                let _ = writeln!(
                    prompt,
                    "### {} (lines {}-{})",
                    item.file, range.start_line, range.end_line
                );
                prompt.push_str(&numbered_snippet(&source.content, range, context));
                prompt.push('\n');
            }
            None => {
                let _ = writeln!(prompt, "### {} (content unavailable)\n", item.file);
            }
        }
    }

    prompt.push_str(DIFF_FORMAT);
    prompt
}

/// Re-prompt after an unparseable response.
pub fn build_strict_prompt(base: &str, error: &str) -> String {
    format!(
        "{base}\n\nYour previous response was rejected: {error}\n\
         Return ONLY a unified diff with no commentary.\n\
         Every file section must be a '--- a/<path>' line immediately followed by '+++ b/<path>'.\n\
         Every hunk must start with '@@ -<oldStart>,<oldLines> +<newStart>,<newLines> @@'.\n\
         Body lines must start with ' ', '+' or '-', and at least one line must change.\n"
    )
}

/// `{line:>5} | {text}` for each line of `range`, widened by `context` lines.
pub fn numbered_snippet(content: &str, range: LineRange, context: usize) -> String {
    let first = range.start_line.saturating_sub(context).max(1);
    let last = range.end_line.saturating_add(context);

    let mut out = String::new();
    for (idx, text) in content.lines().enumerate() {
        let line = idx + 1;
        if line < first {
            continue;
        }
        if line > last {
            break;
        }
        let _ = writeln!(out, "{line:>5} | {text}");
    }
    out
}

fn task_guidance(signal: Signal) -> &'static str {
    match signal {
        Signal::LongFunctions => {
            "Shorten the function by extracting cohesive steps into helpers placed inside the allowed range. Preserve behavior."
        }
        Signal::DuplicateBlocks => {
            "Remove one copy of the duplicated block by reusing shared code within the allowed ranges. Preserve behavior."
        }
        Signal::DependencyCycles | Signal::TestPresence => {
            "Address the issue using only the allowed ranges. Preserve behavior."
        }
    }
}

const DIFF_FORMAT: &str = concat!(
    "\nRespond with a unified diff only:\n",
    "--- a/<path>\n",
    "+++ b/<path>\n",
    "@@ -<oldStart>,<oldLines> +<newStart>,<newLines> @@\n",
    " context line\n",
    "-removed line\n",
    "+added line\n",
);

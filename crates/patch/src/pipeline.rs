use crate::apply::apply_patch;
use crate::config::{PipelineConfig, MAX_ATTEMPTS};
use crate::diff::parse_patch;
use crate::error::{PatchError, Result};
use crate::generator::{build_prompt, build_strict_prompt, PatchGenerator, PatchRequest};
use crate::scope::EvidenceScope;
use crate::verify::verify_fix;
use sigfix_protocol::{FixSuggestion, GuardedIssue};
use sigfix_signals::{AnalysisSnapshot, Overlay, SignalEngine, SourceProvider};
use std::sync::Arc;

/// Id of the issue at `index` in a guarded issue list.
pub fn issue_id(index: usize) -> String {
    format!("issue-{}", index + 1)
}

/// Turns guarded issues into verified or rejected fix suggestions.
///
/// Every failure is contained per issue: the worst outcome of a run is a list
/// of rejected suggestions. Disk content is never modified.
pub struct FixPipeline {
    engine: SignalEngine,
    generator: Arc<dyn PatchGenerator>,
    config: PipelineConfig,
}

impl FixPipeline {
    pub fn new(
        engine: SignalEngine,
        generator: Arc<dyn PatchGenerator>,
        config: PipelineConfig,
    ) -> std::result::Result<Self, String> {
        config.validate()?;
        Ok(Self {
            engine,
            generator,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Complete issues with a verifier, in order, capped at `max_fixes`.
    pub fn candidates<'a>(&self, issues: &'a [GuardedIssue]) -> Vec<(usize, &'a GuardedIssue)> {
        issues
            .iter()
            .enumerate()
            .filter(|(_, issue)| issue.evidence_complete && issue.issue.signal.has_verifier())
            .take(self.config.max_fixes)
            .collect()
    }

    /// Attempt each candidate strictly one after another.
    pub async fn run(
        &self,
        provider: &dyn SourceProvider,
        snapshot: &AnalysisSnapshot,
        issues: &[GuardedIssue],
    ) -> Vec<FixSuggestion> {
        let mut suggestions = Vec::new();
        for (index, issue) in self.candidates(issues) {
            suggestions.push(self.fix_issue(provider, snapshot, issue_id(index), issue).await);
        }
        let verified = suggestions.iter().filter(|s| s.verified).count();
        log::info!(
            "Fix pipeline finished: {verified}/{} suggestions verified",
            suggestions.len()
        );
        suggestions
    }

    /// Generate, validate, apply and verify a patch for one issue.
    pub async fn fix_issue(
        &self,
        provider: &dyn SourceProvider,
        snapshot: &AnalysisSnapshot,
        issue_id: String,
        issue: &GuardedIssue,
    ) -> FixSuggestion {
        if !issue.evidence_complete {
            let reason = issue
                .missing_evidence_reason
                .as_deref()
                .unwrap_or("evidence incomplete");
            return rejected(issue_id, issue, String::new(), format!("Issue not actionable: {reason}"));
        }
        if !issue.issue.signal.has_verifier() {
            return rejected(
                issue_id,
                issue,
                String::new(),
                format!("No verifier for signal {}", issue.issue.signal),
            );
        }

        let scope = EvidenceScope::from_issue(&issue.issue);
        let prompt = build_prompt(issue, &snapshot.sources, self.config.snippet_context);
        let mut raw_patch = String::new();
        let mut previous_error: Option<String> = None;
        let mut attempt = 1;

        // Bounded: only an invalid diff before the last attempt loops again.
        loop {
            let request = PatchRequest {
                issue_id: issue_id.clone(),
                prompt: match &previous_error {
                    Some(error) => build_strict_prompt(&prompt, error),
                    None => prompt.clone(),
                },
                settings: self.config.generator.clone(),
                attempt,
                strict: previous_error.is_some(),
            };

            raw_patch = match self.generator.generate(&request).await {
                Ok(text) => text,
                Err(e) => {
                    let err = PatchError::generator(format!("{e:#}"));
                    return rejected(issue_id, issue, raw_patch, err.to_string());
                }
            };

            match prepare_overlay(&raw_patch, &scope, snapshot) {
                Ok((overlay, files)) => {
                    return self
                        .verify(provider, snapshot, issue_id, issue, raw_patch, overlay, files)
                        .await;
                }
                Err(err) if err.is_invalid_diff() && attempt < MAX_ATTEMPTS => {
                    log::warn!("{issue_id}: invalid diff on attempt {attempt}, retrying: {err}");
                    previous_error = Some(err.to_string());
                    attempt += 1;
                }
                Err(err) => return rejected(issue_id, issue, raw_patch, err.to_string()),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn verify(
        &self,
        provider: &dyn SourceProvider,
        snapshot: &AnalysisSnapshot,
        issue_id: String,
        issue: &GuardedIssue,
        raw_patch: String,
        overlay: Overlay,
        files: Vec<String>,
    ) -> FixSuggestion {
        let after = self
            .engine
            .analyze_from(provider, &snapshot.paths, Some(&overlay))
            .await;
        let threshold = self.engine.config().long_function_threshold;
        let verdict = verify_fix(&issue.issue, threshold, &snapshot.report, &after);

        let verified = verdict.is_verified();
        if verified {
            log::info!("{issue_id}: verified ({})", verdict.details().unwrap_or_default());
        } else {
            log::warn!("{issue_id}: not verified: {}", verdict.message());
        }

        FixSuggestion {
            issue_id,
            issue_type: issue.issue.issue_type,
            signal: issue.issue.signal,
            files,
            patch: raw_patch,
            verified,
            verification_message: verdict.message(),
            verification_details: verdict.details(),
        }
    }
}

/// Parse, scope-check and apply a raw patch against the snapshot's content.
fn prepare_overlay(
    raw_patch: &str,
    scope: &EvidenceScope,
    snapshot: &AnalysisSnapshot,
) -> Result<(Overlay, Vec<String>)> {
    let patch = parse_patch(raw_patch)?;
    scope.validate(&patch)?;
    let overlay = apply_patch(&patch, &snapshot.sources)?;
    Ok((overlay, patch.paths()))
}

fn rejected(issue_id: String, issue: &GuardedIssue, patch: String, message: String) -> FixSuggestion {
    log::warn!("{issue_id}: rejected: {message}");
    FixSuggestion {
        issue_id,
        issue_type: issue.issue.issue_type,
        signal: issue.issue.signal,
        files: issue.evidence_files(),
        patch,
        verified: false,
        verification_message: message,
        verification_details: None,
    }
}

//! Evidence-scope validation: a patch may only touch lines its issue cites.

use crate::diff::{DiffLine, Hunk, PatchSet};
use crate::error::{PatchError, Result};
use sigfix_protocol::{Issue, LineRange};
use std::collections::BTreeMap;

/// Allowed line ranges per file, derived from one issue's evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceScope {
    ranges: BTreeMap<String, Vec<LineRange>>,
}

impl EvidenceScope {
    pub fn from_issue(issue: &Issue) -> Self {
        let mut scope = Self::default();
        for item in &issue.evidence {
            if let Some(range) = item.range() {
                scope.allow(item.file.clone(), range);
            }
        }
        scope
    }

    pub fn allow(&mut self, file: impl Into<String>, range: LineRange) {
        self.ranges.entry(file.into()).or_default().push(range);
    }

    pub fn ranges(&self, file: &str) -> &[LineRange] {
        self.ranges.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn allows(&self, file: &str, line: usize) -> bool {
        self.ranges(file).iter().any(|range| range.contains(line))
    }

    /// Reject the whole patch on the first edit outside the allowed ranges.
    pub fn validate(&self, patch: &PatchSet) -> Result<()> {
        for file in &patch.files {
            if self.ranges(&file.path).is_empty() {
                return Err(PatchError::FileOutOfScope {
                    file: file.path.clone(),
                });
            }

            for hunk in &file.hunks {
                let mut cursor = hunk.old_start;
                for line in &hunk.lines {
                    match line {
                        DiffLine::Context(_) => cursor = advance(&file.path, hunk, cursor)?,
                        DiffLine::Remove(_) => {
                            self.check(&file.path, cursor)?;
                            cursor = advance(&file.path, hunk, cursor)?;
                        }
                        DiffLine::Add(_) => self.check(&file.path, cursor)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn check(&self, file: &str, line: usize) -> Result<()> {
        if self.allows(file, line) {
            Ok(())
        } else {
            Err(PatchError::OutOfScopeEdit {
                file: file.to_string(),
                line,
            })
        }
    }
}

/// Next old-file line; a header near `usize::MAX` can never be in scope.
fn advance(file: &str, hunk: &Hunk, cursor: usize) -> Result<usize> {
    cursor
        .checked_add(1)
        .ok_or_else(|| PatchError::OutOfScopeEdit {
            file: file.to_string(),
            line: hunk.old_start,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_patch;
    use sigfix_protocol::{Confidence, EvidenceItem, IssueType, Metric, Signal};

    fn scope() -> EvidenceScope {
        let issue = Issue {
            issue_type: IssueType::Complexity,
            signal: Signal::LongFunctions,
            confidence: Confidence::Medium,
            evidence: vec![EvidenceItem::new(
                "src/a.ts",
                LineRange::new(10, 20),
                vec![Metric::loc(11)],
            )],
        };
        EvidenceScope::from_issue(&issue)
    }

    #[test]
    fn accepts_edits_strictly_inside_evidence() {
        let patch =
            parse_patch("--- a/src/a.ts\n+++ b/src/a.ts\n@@ -11,3 +11,2 @@\n x\n-y\n+z\n z2\n")
                .unwrap();
        assert!(scope().validate(&patch).is_ok());
    }

    #[test]
    fn rejects_edit_outside_range() {
        let patch = parse_patch("--- a/src/a.ts\n+++ b/src/a.ts\n@@ -19,3 +19,3 @@\n a\n b\n-c\n+d\n")
            .unwrap();
        let err = scope().validate(&patch).unwrap_err();
        assert!(matches!(err, PatchError::OutOfScopeEdit { line: 21, .. }));
        assert!(err.to_string().to_lowercase().contains("outside evidence"));
    }

    #[test]
    fn context_lines_may_extend_beyond_evidence() {
        let patch = parse_patch("--- a/src/a.ts\n+++ b/src/a.ts\n@@ -8,3 +8,3 @@\n a\n b\n-c\n+d\n")
            .unwrap();
        assert!(scope().validate(&patch).is_ok());
    }

    #[test]
    fn insertion_point_is_checked_without_advancing() {
        // Insertion before line 10 is in scope; before line 9 is not.
        let inside = parse_patch("--- a/src/a.ts\n+++ b/src/a.ts\n@@ -10 +10,2 @@\n+new\n keep\n").unwrap();
        assert!(scope().validate(&inside).is_ok());

        let outside = parse_patch("--- a/src/a.ts\n+++ b/src/a.ts\n@@ -9 +9,2 @@\n+new\n keep\n").unwrap();
        assert!(matches!(
            scope().validate(&outside),
            Err(PatchError::OutOfScopeEdit { line: 9, .. })
        ));
    }

    #[test]
    fn rejects_files_without_evidence() {
        let patch = parse_patch("--- a/src/b.ts\n+++ b/src/b.ts\n@@ -10 +10 @@\n-a\n+b\n").unwrap();
        assert!(matches!(
            scope().validate(&patch),
            Err(PatchError::FileOutOfScope { .. })
        ));
    }

    #[test]
    fn huge_hunk_start_is_rejected_without_overflow() {
        let patch = parse_patch(&format!(
            "--- a/src/a.ts\n+++ b/src/a.ts\n@@ -{} +1 @@\n ctx\n-x\n",
            usize::MAX
        ))
        .unwrap();
        assert!(matches!(
            scope().validate(&patch),
            Err(PatchError::OutOfScopeEdit { line, .. }) if line == usize::MAX
        ));
    }
}

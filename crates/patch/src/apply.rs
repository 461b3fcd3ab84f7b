use crate::diff::{merge_sections, DiffLine, FilePatch, PatchSet};
use crate::error::{PatchError, Result};
use sigfix_signals::{Overlay, SourceSet};

/// Apply every file section of `patch` on top of `base`, producing overlay content.
///
/// Each path is patched once, against its `base` content, with the hunks of
/// all its sections. Files absent from `base` start empty. Nothing is
/// written to disk.
pub fn apply_patch(patch: &PatchSet, base: &SourceSet) -> Result<Overlay> {
    let mut overlay = Overlay::new();
    for file in merge_sections(patch.files.clone()) {
        let original = base
            .get(&file.path)
            .map(|source| source.content.as_str())
            .unwrap_or_default();
        let updated = apply_file_patch(original, &file)?;
        overlay.insert(file.path, updated);
    }
    Ok(overlay)
}

/// Apply one file's hunks to `content`.
///
/// Hunk positions refer to the pre-patch content, so hunks are applied in a
/// single forward pass with one input cursor.
pub fn apply_file_patch(content: &str, patch: &FilePatch) -> Result<String> {
    let input: Vec<&str> = content.lines().collect();
    let mut output: Vec<&str> = Vec::with_capacity(input.len());
    let mut cursor = 0;

    let out_of_bounds = |start: usize| PatchError::HunkRangeOutOfBounds {
        file: patch.path.clone(),
        start,
        len: input.len(),
    };

    for hunk in &patch.hunks {
        // `-0,0` (file creation) starts before the first line.
        let start = hunk.old_start.saturating_sub(1);
        if start < cursor || start > input.len() {
            return Err(out_of_bounds(hunk.old_start));
        }
        output.extend_from_slice(&input[cursor..start]);
        cursor = start;

        for line in &hunk.lines {
            match line {
                DiffLine::Context(_) => {
                    let existing = input.get(cursor).ok_or_else(|| out_of_bounds(hunk.old_start))?;
                    output.push(*existing);
                    cursor += 1;
                }
                DiffLine::Remove(expected) => {
                    let existing = input.get(cursor).ok_or_else(|| out_of_bounds(hunk.old_start))?;
                    if existing.trim_end() != expected.trim_end() {
                        log::debug!(
                            "{}:{} removal text differs from patch: '{}' vs '{}'",
                            patch.path,
                            cursor + 1,
                            existing,
                            expected
                        );
                    }
                    cursor += 1;
                }
                DiffLine::Add(text) => output.push(text.as_str()),
            }
        }
    }
    output.extend_from_slice(&input[cursor..]);

    if output.is_empty() {
        return Ok(String::new());
    }
    let mut result = output.join("\n");
    if content.is_empty() || content.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_patch;
    use crate::scope::EvidenceScope;
    use pretty_assertions::assert_eq;
    use sigfix_protocol::LineRange;

    fn apply(content: &str, diff: &str) -> Result<String> {
        let patch = parse_patch(diff).unwrap();
        apply_file_patch(content, &patch.files[0])
    }

    #[test]
    fn replaces_lines_and_keeps_tail() {
        let out = apply(
            "a\nb\nc\nd\n",
            "--- a/f\n+++ b/f\n@@ -2,2 +2,2 @@\n b\n-c\n+C\n",
        )
        .unwrap();
        assert_eq!(out, "a\nb\nC\nd\n");
    }

    #[test]
    fn hunks_apply_in_one_forward_pass() {
        let out = apply(
            "1\n2\n3\n4\n5\n6\n",
            "--- a/f\n+++ b/f\n@@ -1 +1,2 @@\n 1\n+1.5\n@@ -5 +6 @@\n-5\n",
        )
        .unwrap();
        assert_eq!(out, "1\n1.5\n2\n3\n4\n6\n");
    }

    #[test]
    fn creates_file_from_nothing() {
        let out = apply("", "--- /dev/null\n+++ b/f\n@@ -0,0 +1,2 @@\n+x\n+y\n").unwrap();
        assert_eq!(out, "x\ny\n");
    }

    #[test]
    fn preserves_missing_trailing_newline() {
        let out = apply("a\nb", "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-a\n+A\n").unwrap();
        assert_eq!(out, "A\nb");
    }

    #[test]
    fn out_of_bounds_hunks_fail() {
        assert!(matches!(
            apply("a\nb\n", "--- a/f\n+++ b/f\n@@ -5 +5 @@\n-x\n+y\n"),
            Err(PatchError::HunkRangeOutOfBounds { start: 5, len: 2, .. })
        ));
        assert!(matches!(
            apply("a\nb\n", "--- a/f\n+++ b/f\n@@ -2,2 +2,2 @@\n-b\n-c\n+d\n"),
            Err(PatchError::HunkRangeOutOfBounds { .. })
        ));
        assert!(matches!(
            apply("a\nb\n", &format!("--- a/f\n+++ b/f\n@@ -{} +1 @@\n a\n-b\n", usize::MAX)),
            Err(PatchError::HunkRangeOutOfBounds { .. })
        ));
        // Second hunk starts before the first one ended.
        assert!(matches!(
            apply(
                "a\nb\nc\n",
                "--- a/f\n+++ b/f\n@@ -2 +2 @@\n-b\n+B\n@@ -1 +1 @@\n-a\n+A\n"
            ),
            Err(PatchError::HunkRangeOutOfBounds { start: 1, .. })
        ));
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count).map(|n| format!("line{n}\n")).collect()
    }

    fn evidence_10_to_20() -> EvidenceScope {
        let mut scope = EvidenceScope::default();
        scope.allow("f.ts", LineRange::new(10, 20));
        scope
    }

    #[test]
    fn repeated_sections_use_pre_patch_numbering() {
        let base = SourceSet::from_pairs([("f.ts", numbered_lines(40))]);
        let patch = parse_patch(
            "--- a/f.ts\n+++ b/f.ts\n@@ -10 +10,3 @@\n-line10\n+a\n+b\n+c\n--- a/f.ts\n+++ b/f.ts\n@@ -15 +17 @@\n-line15\n+Y\n",
        )
        .unwrap();
        assert!(evidence_10_to_20().validate(&patch).is_ok());

        let overlay = apply_patch(&patch, &base).unwrap();
        let lines: Vec<&str> = overlay.get("f.ts").unwrap().lines().collect();
        assert_eq!(&lines[9..12], &["a", "b", "c"]);
        assert_eq!(lines[15], "line14");
        assert_eq!(lines[16], "Y");
        assert_eq!(lines[17], "line16");
        assert_eq!(lines.len(), 42);
    }

    #[test]
    fn repeated_section_cannot_reach_past_evidence_after_removal() {
        let base = SourceSet::from_pairs([("f.ts", numbered_lines(40))]);
        let mut diff = String::from("--- a/f.ts\n+++ b/f.ts\n@@ -10,11 +10,0 @@\n");
        for n in 10..=20 {
            diff.push_str(&format!("-line{n}\n"));
        }
        diff.push_str("--- a/f.ts\n+++ b/f.ts\n@@ -15 +15 @@\n-line15\n+HACKED\n");
        let patch = parse_patch(&diff).unwrap();

        // Both sections name lines 10-20 of the original file; together they overlap.
        assert!(evidence_10_to_20().validate(&patch).is_ok());
        assert!(matches!(
            apply_patch(&patch, &base),
            Err(PatchError::HunkRangeOutOfBounds { start: 15, .. })
        ));
    }
}

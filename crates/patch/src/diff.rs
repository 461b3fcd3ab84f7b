//! Unified diff parsing.
//!
//! Generated patches are untrusted text. The parser tolerates markdown fences
//! and commentary between file sections, but any malformed structure is a
//! hard error rather than something to guess around.

use crate::error::{PatchError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid regex")
});

const DEV_NULL: &str = "/dev/null";

/// A parsed patch: one entry per target path that carried hunks.
///
/// Repeated `---`/`+++` sections for one path are merged, so every hunk of a
/// [`FilePatch`] is numbered against the pre-patch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSet {
    pub files: Vec<FilePatch>,
}

impl PatchSet {
    /// Distinct target paths in patch order.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for file in &self.files {
            if !paths.contains(&file.path) {
                paths.push(file.path.clone());
            }
        }
        paths
    }

    pub fn has_changes(&self) -> bool {
        self.files.iter().any(FilePatch::has_changes)
    }
}

/// Changes to a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// The file the patch applies to: the new path, or the old one on deletion
    pub path: String,
    /// `None` when the source is `/dev/null` (file creation)
    pub old_path: Option<String>,
    /// `None` when the destination is `/dev/null` (file deletion)
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    pub fn has_changes(&self) -> bool {
        self.hunks.iter().any(Hunk::has_changes)
    }
}

/// A single hunk in a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Starting line in old file
    pub old_start: usize,
    /// Number of lines in old file
    pub old_lines: usize,
    /// Starting line in new file
    pub new_start: usize,
    /// Number of lines in new file
    pub new_lines: usize,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn has_changes(&self) -> bool {
        self.lines
            .iter()
            .any(|line| !matches!(line, DiffLine::Context(_)))
    }
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    /// Context line (unchanged)
    Context(String),
    /// Added line
    Add(String),
    /// Removed line
    Remove(String),
}

/// Parse a unified diff blob.
pub fn parse_patch(text: &str) -> Result<PatchSet> {
    // Keep blob line numbers for error messages.
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .collect();

    let mut parser = Parser::default();
    let mut idx = 0;
    while idx < lines.len() {
        let (line_no, line) = lines[idx];
        idx += 1;

        // Markdown fences sit at column 0; a fenced line inside a hunk has a prefix.
        if line.starts_with("```") || line.starts_with("diff --git") || line.starts_with("index ") {
            parser.close_hunk();
            continue;
        }

        if line.starts_with("--- ") || line == "---" {
            if let Some(plus_idx) = following_plus_header(&lines, idx) {
                let (_, plus_line) = lines[plus_idx];
                parser.start_file(line_no, line, plus_line)?;
                idx = plus_idx + 1;
                continue;
            }
            if parser.in_hunk() {
                parser.push_body(line);
                continue;
            }
            return Err(PatchError::MalformedDiffHeader {
                line: line_no,
                text: line.to_string(),
            });
        }

        if line.starts_with("@@") {
            parser.start_hunk(line_no, line)?;
            continue;
        }

        if parser.in_hunk() {
            parser.push_body(line);
            continue;
        }

        if line.starts_with("+++ ") {
            return Err(PatchError::MalformedDiffHeader {
                line: line_no,
                text: line.to_string(),
            });
        }
        // Anything else outside a hunk is commentary.
    }

    let files = merge_sections(parser.finish());
    if files.is_empty() {
        return Err(PatchError::EmptyPatch);
    }
    let patch = PatchSet { files };
    if !patch.has_changes() {
        return Err(PatchError::NoActualChanges);
    }
    Ok(patch)
}

/// Fold sections naming the same path into the first one, hunks ordered by
/// `old_start`. Overlapping hunks stay overlapping and fail to apply.
pub(crate) fn merge_sections(sections: Vec<FilePatch>) -> Vec<FilePatch> {
    let mut merged: Vec<FilePatch> = Vec::with_capacity(sections.len());
    for section in sections {
        match merged.iter_mut().find(|file| file.path == section.path) {
            Some(file) => {
                log::debug!("Merging repeated section for {}", section.path);
                file.hunks.extend(section.hunks);
            }
            None => merged.push(section),
        }
    }
    for file in &mut merged {
        file.hunks.sort_by_key(|hunk| hunk.old_start);
    }
    merged
}

/// Index of the `+++` line pairing with a `---` line, skipping blank and `index` lines.
fn following_plus_header(lines: &[(usize, &str)], from: usize) -> Option<usize> {
    lines[from..]
        .iter()
        .position(|(_, line)| !line.trim().is_empty() && !line.starts_with("index "))
        .map(|offset| from + offset)
        .filter(|&pos| lines[pos].1.starts_with("+++ ") || lines[pos].1 == "+++")
}

#[derive(Default)]
struct Parser {
    files: Vec<FilePatch>,
    file: Option<FilePatch>,
    hunk: Option<Hunk>,
    /// Blank lines seen inside a hunk; they only count as context when more body follows
    pending_blank: usize,
}

impl Parser {
    fn in_hunk(&self) -> bool {
        self.hunk.is_some()
    }

    fn start_file(&mut self, line_no: usize, minus: &str, plus: &str) -> Result<()> {
        self.finish_file();

        let old_path = parse_file_path(minus, "---");
        let new_path = parse_file_path(plus, "+++");
        let path = new_path
            .clone()
            .or_else(|| old_path.clone())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PatchError::MalformedDiffHeader {
                line: line_no,
                text: minus.to_string(),
            })?;

        self.file = Some(FilePatch {
            path,
            old_path,
            new_path,
            hunks: Vec::new(),
        });
        Ok(())
    }

    fn start_hunk(&mut self, line_no: usize, header: &str) -> Result<()> {
        if self.file.is_none() {
            return Err(PatchError::HunkBeforeFileHeader { line: line_no });
        }
        let (old_start, old_lines, new_start, new_lines) =
            parse_hunk_header(header).ok_or_else(|| PatchError::MalformedHunkHeader {
                line: line_no,
                header: header.to_string(),
            })?;

        self.close_hunk();
        self.hunk = Some(Hunk {
            old_start,
            old_lines,
            new_start,
            new_lines,
            lines: Vec::new(),
        });
        Ok(())
    }

    fn push_body(&mut self, line: &str) {
        let Some(hunk) = self.hunk.as_mut() else {
            return;
        };

        let parsed = if line.is_empty() {
            self.pending_blank += 1;
            return;
        } else if let Some(rest) = line.strip_prefix('+') {
            DiffLine::Add(rest.to_string())
        } else if let Some(rest) = line.strip_prefix('-') {
            DiffLine::Remove(rest.to_string())
        } else if let Some(rest) = line.strip_prefix(' ') {
            DiffLine::Context(rest.to_string())
        } else if line.starts_with('\\') {
            // "\ No newline at end of file"
            return;
        } else {
            // Commentary ends the hunk.
            self.close_hunk();
            return;
        };

        for _ in 0..std::mem::take(&mut self.pending_blank) {
            hunk.lines.push(DiffLine::Context(String::new()));
        }
        hunk.lines.push(parsed);
    }

    fn close_hunk(&mut self) {
        self.pending_blank = 0;
        if let Some(hunk) = self.hunk.take() {
            if let Some(file) = self.file.as_mut() {
                file.hunks.push(hunk);
            }
        }
    }

    fn finish_file(&mut self) {
        self.close_hunk();
        if let Some(file) = self.file.take() {
            if file.hunks.is_empty() {
                log::debug!("Dropping file section without hunks: {}", file.path);
            } else {
                self.files.push(file);
            }
        }
    }

    fn finish(mut self) -> Vec<FilePatch> {
        self.finish_file();
        self.files
    }
}

/// Parse file path from a `---` or `+++` line; `None` for `/dev/null`.
fn parse_file_path(line: &str, marker: &str) -> Option<String> {
    let path = line.trim_start_matches(marker).trim();

    // Remove timestamps if present (e.g., "file.rs\t2024-01-01 00:00:00")
    let path = path.split('\t').next().unwrap_or(path).trim();
    if path == DEV_NULL {
        return None;
    }
    let path = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path);
    Some(path.to_string())
}

/// Parse hunk header: `@@ -1,5 +1,6 @@ optional annotation`; a missing count means 1.
fn parse_hunk_header(header: &str) -> Option<(usize, usize, usize, usize)> {
    let caps = HUNK_HEADER.captures(header)?;
    let number = |idx: usize, default: Option<usize>| -> Option<usize> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => default,
        }
    };
    Some((
        number(1, None)?,
        number(2, Some(1))?,
        number(3, None)?,
        number(4, Some(1))?,
    ))
}

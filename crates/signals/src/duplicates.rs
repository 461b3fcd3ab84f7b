//! Duplicate-block detection over normalized line corpora.
//!
//! Fixed windows seed candidates; each candidate is then extended one line at
//! a time while every occurrence still agrees, so reported lengths are the true
//! extent of the shared block. Grouping keys are the exact joined text: the
//! map's hash only buckets, equality decides.

use crate::normalize::NormalizedFile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateOptions {
    pub min_window: usize,
    pub max_window: usize,
    pub min_occurrences: usize,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            min_window: 10,
            max_window: 50,
            min_occurrences: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockOccurrence {
    pub file: String,
    /// Original 1-based line of the first normalized line
    pub start_line: usize,
    /// Original 1-based line of the last normalized line
    pub end_line: usize,
}

impl BlockOccurrence {
    fn contains(&self, other: &BlockOccurrence) -> bool {
        self.file == other.file
            && self.start_line <= other.start_line
            && other.end_line <= self.end_line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateBlock {
    /// Fingerprint of the maximal matched text
    pub hash: String,
    /// Length in normalized lines
    pub length: usize,
    /// Sorted, deduplicated by `(file, start_line, end_line)`
    pub occurrences: Vec<BlockOccurrence>,
}

#[derive(Clone, Copy)]
struct WindowRef {
    file: usize,
    start: usize,
}

/// Find duplicated blocks across `files`.
///
/// Result order: most occurrences first, then longer blocks, then hash.
pub fn detect_duplicates(files: &[&NormalizedFile], options: &DuplicateOptions) -> Vec<DuplicateBlock> {
    let min_window = options.min_window.max(1);
    let max_window = options.max_window.max(min_window);

    let mut windows: HashMap<String, Vec<WindowRef>> = HashMap::new();
    for (file_idx, file) in files.iter().enumerate() {
        if file.len() < min_window {
            continue;
        }
        for start in 0..=file.len() - min_window {
            let key = file.lines[start..start + min_window].join("\n");
            windows.entry(key).or_default().push(WindowRef {
                file: file_idx,
                start,
            });
        }
    }

    let mut merged: HashMap<String, BTreeSet<BlockOccurrence>> = HashMap::new();
    for occurrences in windows.into_values() {
        if occurrences.len() < options.min_occurrences {
            continue;
        }

        let length = extend_match(files, &occurrences, min_window, max_window);
        let baseline = occurrences[0];
        let text = files[baseline.file].lines[baseline.start..baseline.start + length].join("\n");

        let entry = merged.entry(text).or_default();
        for occurrence in &occurrences {
            let file = files[occurrence.file];
            entry.insert(BlockOccurrence {
                file: file.path.clone(),
                start_line: file.line_numbers[occurrence.start],
                end_line: file.line_numbers[occurrence.start + length - 1],
            });
        }
    }

    let mut blocks: Vec<DuplicateBlock> = merged
        .into_iter()
        .filter(|(_, occurrences)| occurrences.len() >= options.min_occurrences)
        .map(|(text, occurrences)| DuplicateBlock {
            hash: fingerprint(&text),
            length: text.lines().count(),
            occurrences: occurrences.into_iter().collect(),
        })
        .collect();

    blocks = drop_tail_blocks(blocks);
    blocks.sort_by(|a, b| {
        b.occurrences
            .len()
            .cmp(&a.occurrences.len())
            .then_with(|| b.length.cmp(&a.length))
            .then_with(|| a.hash.cmp(&b.hash))
    });

    log::debug!("Detected {} duplicate blocks", blocks.len());
    blocks
}

/// Greedily grow the shared length while every occurrence matches the baseline.
fn extend_match(
    files: &[&NormalizedFile],
    occurrences: &[WindowRef],
    min_window: usize,
    max_window: usize,
) -> usize {
    let baseline = occurrences[0];
    let base_lines = &files[baseline.file].lines;
    let mut length = min_window;

    while length < max_window {
        let Some(expected) = base_lines.get(baseline.start + length) else {
            break;
        };
        let all_match = occurrences.iter().all(|occ| {
            files[occ.file]
                .lines
                .get(occ.start + length)
                .is_some_and(|line| line == expected)
        });
        if !all_match {
            break;
        }
        length += 1;
    }

    length
}

/// Drop blocks that are the tail of a longer block seeded from an earlier
/// window offset: same occurrence count, every occurrence nested inside one
/// of the longer block's occurrences.
fn drop_tail_blocks(blocks: Vec<DuplicateBlock>) -> Vec<DuplicateBlock> {
    let keep: Vec<bool> = blocks
        .iter()
        .map(|candidate| {
            !blocks.iter().any(|longer| {
                longer.length > candidate.length
                    && longer.occurrences.len() == candidate.occurrences.len()
                    && candidate
                        .occurrences
                        .iter()
                        .all(|occ| longer.occurrences.iter().any(|outer| outer.contains(occ)))
            })
        })
        .collect();

    blocks
        .into_iter()
        .zip(keep)
        .filter_map(|(block, keep)| keep.then_some(block))
        .collect()
}

fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

use thiserror::Error;

/// Result type for patch pipeline operations
pub type Result<T> = std::result::Result<T, PatchError>;

/// Everything that can reject a generated patch.
///
/// The pipeline converts each of these into a rejected suggestion; none of
/// them abort a run.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Malformed diff header at line {line}: '{text}'")]
    MalformedDiffHeader { line: usize, text: String },

    #[error("Malformed hunk header at line {line}: '{header}'")]
    MalformedHunkHeader { line: usize, header: String },

    #[error("Hunk header at line {line} appears before any file header")]
    HunkBeforeFileHeader { line: usize },

    #[error("Patch contains no file changes")]
    EmptyPatch,

    #[error("Patch contains no changes")]
    NoActualChanges,

    #[error("Edit at {file}:{line} falls outside evidence ranges")]
    OutOfScopeEdit { file: String, line: usize },

    #[error("Patch touches {file}, which is outside evidence")]
    FileOutOfScope { file: String },

    #[error("Hunk starting at line {start} is out of bounds for {file} ({len} lines)")]
    HunkRangeOutOfBounds { file: String, start: usize, len: usize },

    #[error("Patch generation failed: {0}")]
    Generator(String),
}

impl PatchError {
    /// Create a generator error
    pub fn generator(msg: impl Into<String>) -> Self {
        Self::Generator(msg.into())
    }

    /// Parse-stage failures; only these earn a strict re-prompt.
    pub fn is_invalid_diff(&self) -> bool {
        matches!(
            self,
            Self::MalformedDiffHeader { .. }
                | Self::MalformedHunkHeader { .. }
                | Self::HunkBeforeFileHeader { .. }
                | Self::EmptyPatch
                | Self::NoActualChanges
        )
    }
}

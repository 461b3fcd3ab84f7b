//! # Sigfix Patch
//!
//! Evidence-scoped patch pipeline: generated diffs are parsed, confined to the
//! lines an issue cites, applied to an in-memory overlay and verified by
//! re-running the signal engine.
//!
//! ```text
//! GuardedIssue ──> PatchGenerator ──> parse_patch ──> EvidenceScope::validate
//!                       ^                  │ invalid diff (once)
//!                       └── strict prompt ─┘
//!
//! apply_patch ──> Overlay ──> SignalEngine (second pass) ──> verify_fix ──> FixSuggestion
//! ```

mod apply;
mod config;
mod diff;
mod error;
mod generator;
mod pipeline;
mod scope;
mod verify;

pub use apply::{apply_file_patch, apply_patch};
pub use config::{GeneratorSettings, PipelineConfig, MAX_ATTEMPTS};
pub use diff::{parse_patch, DiffLine, FilePatch, Hunk, PatchSet};
pub use error::{PatchError, Result};
pub use generator::{
    build_prompt, build_strict_prompt, numbered_snippet, PatchGenerator, PatchRequest,
    StaticPatchGenerator,
};
pub use pipeline::{issue_id, FixPipeline};
pub use scope::EvidenceScope;
pub use verify::{verify_fix, Verdict, NO_LONG_FUNCTION_IN_RANGE};

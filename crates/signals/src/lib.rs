//! # Sigfix Signals
//!
//! Static signal engine: line-exact structural facts about a source tree.
//!
//! ## Pipeline
//!
//! ```text
//! Sources (disk or overlay)
//!     │
//!     ├──> Source Indexer
//!     │      ├─ Tree-sitter parse → syntax tree
//!     │      └─ Normalizer → comment-free lines + original line numbers
//!     │
//!     ├──> Analyzers
//!     │      ├─ Function lengths (tree)
//!     │      ├─ Duplicate blocks (normalized lines)
//!     │      └─ Direct import cycles (tree → import graph)
//!     │
//!     ├──> Aggregator → ranked, capped issues
//!     │
//!     └──> Evidence Guard → issues stamped complete/incomplete
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sigfix_signals::{build_issues, guard_issues, SignalConfig, SignalEngine, SourceSet};
//!
//! let engine = SignalEngine::new(SignalConfig::default()).unwrap();
//! let sources = SourceSet::from_pairs([("src/a.ts", "export function a() {\n  return 1;\n}\n")]);
//!
//! let report = engine.analyze(&sources);
//! let issues = guard_issues(build_issues(&report, engine.config()));
//! assert_eq!(report.functions.len(), 1);
//! assert!(issues.iter().all(|i| i.evidence_complete || i.missing_evidence_reason.is_some()));
//! ```

mod aggregate;
mod config;
mod cycles;
mod duplicates;
mod engine;
mod error;
mod functions;
mod guard;
mod index;
mod language;
mod normalize;
mod scanner;
mod source;
mod syntax;

pub use aggregate::build_issues;
pub use config::SignalConfig;
pub use cycles::{resolve_specifier, DependencyCycle, ImportEdge, ImportGraph};
pub use duplicates::{detect_duplicates, BlockOccurrence, DuplicateBlock, DuplicateOptions};
pub use engine::{is_test_path, AnalysisSnapshot, SignalEngine, SignalReport};
pub use error::{Result, SignalError};
pub use functions::{collect_function_spans, long_functions, FunctionSpan, FunctionStats};
pub use guard::{guard_issue, guard_issues};
pub use index::{IndexedFile, SourceIndexer};
pub use language::{CommentStyle, Language, MODULE_EXTENSIONS};
pub use normalize::{normalize, strip_comments, NormalizedFile};
pub use scanner::FileScanner;
pub use source::{FileRecord, Overlay, SourceFile, SourceLoader, SourceProvider, SourceSet};
pub use syntax::{visit_items, SyntaxItem, ANONYMOUS};

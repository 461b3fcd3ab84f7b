use crate::config::SignalConfig;
use crate::cycles::{DependencyCycle, ImportGraph};
use crate::duplicates::{detect_duplicates, DuplicateBlock, DuplicateOptions};
use crate::error::{Result, SignalError};
use crate::functions::{collect_function_spans, long_functions, FunctionSpan, FunctionStats};
use crate::index::SourceIndexer;
use crate::source::{Overlay, SourceProvider, SourceSet};
use sigfix_protocol::SignalSummary;

/// Everything one analysis pass found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalReport {
    pub files_analyzed: usize,
    pub functions: Vec<FunctionSpan>,
    pub function_stats: FunctionStats,
    pub duplicates: Vec<DuplicateBlock>,
    pub cycles: Vec<DependencyCycle>,
    pub test_files: Vec<String>,
}

impl SignalReport {
    pub fn long_functions(&self, threshold: usize) -> Vec<&FunctionSpan> {
        long_functions(&self.functions, threshold)
    }

    pub fn summary(&self, threshold: usize) -> SignalSummary {
        SignalSummary {
            files_analyzed: self.files_analyzed,
            function_count: self.function_stats.count,
            max_function_length: self.function_stats.max_length,
            mean_function_length: self.function_stats.mean_length,
            long_function_count: self.long_functions(threshold).len(),
            duplicate_block_count: self.duplicates.len(),
            dependency_cycle_count: self.cycles.len(),
            test_file_count: self.test_files.len(),
        }
    }
}

/// File list, contents and findings of a baseline pass.
#[derive(Debug, Clone)]
pub struct AnalysisSnapshot {
    pub paths: Vec<String>,
    pub sources: SourceSet,
    pub report: SignalReport,
}

/// Runs every analyzer over a source set.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: SignalConfig,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Result<Self> {
        config.validate().map_err(SignalError::invalid_config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn analyze(&self, sources: &SourceSet) -> SignalReport {
        let mut indexer = SourceIndexer::new();
        let files = indexer.index(sources);

        let functions: Vec<FunctionSpan> = files.iter().flat_map(collect_function_spans).collect();
        let function_stats = FunctionStats::from_spans(&functions);

        let normalized: Vec<_> = files.iter().map(|f| &f.normalized).collect();
        let duplicates = detect_duplicates(&normalized, &self.duplicate_options());

        let cycles = ImportGraph::build(&files).direct_cycles();

        let test_files: Vec<String> = files
            .iter()
            .map(|f| f.record.path.clone())
            .filter(|p| is_test_path(p))
            .collect();

        log::info!(
            "Analyzed {} files: {} functions ({} long), {} duplicate blocks, {} cycles",
            files.len(),
            function_stats.count,
            long_functions(&functions, self.config.long_function_threshold).len(),
            duplicates.len(),
            cycles.len()
        );

        SignalReport {
            files_analyzed: files.len(),
            functions,
            function_stats,
            duplicates,
            cycles,
            test_files,
        }
    }

    /// Load `paths` through `provider` (overlay preferred) and analyze them.
    pub async fn analyze_from(
        &self,
        provider: &dyn SourceProvider,
        paths: &[String],
        overlay: Option<&Overlay>,
    ) -> SignalReport {
        let sources = provider.load(paths, overlay).await;
        self.analyze(&sources)
    }

    /// Baseline pass over on-disk (or in-memory) content.
    pub async fn snapshot(&self, provider: &dyn SourceProvider, paths: &[String]) -> AnalysisSnapshot {
        let sources = provider.load(paths, None).await;
        let report = self.analyze(&sources);
        AnalysisSnapshot {
            paths: sources.paths(),
            sources,
            report,
        }
    }

    fn duplicate_options(&self) -> DuplicateOptions {
        DuplicateOptions {
            min_window: self.config.min_window,
            max_window: self.config.max_window,
            min_occurrences: self.config.min_occurrences,
        }
    }
}

/// Whether `path` looks like a test file.
pub fn is_test_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    let file_name = lowered.rsplit('/').next().unwrap_or(&lowered);

    lowered.contains(".test.")
        || lowered.contains(".spec.")
        || lowered.contains("__tests__/")
        || lowered.starts_with("tests/")
        || lowered.contains("/tests/")
        || (file_name.starts_with("test_") && file_name.ends_with(".py"))
        || file_name.ends_with("_test.py")
        || file_name.ends_with("_test.rs")
}

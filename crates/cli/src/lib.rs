use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use sigfix_patch::{issue_id, FixPipeline, PipelineConfig, StaticPatchGenerator};
use sigfix_protocol::{
    serialize_json, AnalysisReport, FixSuggestion, GuardedIssue, MetricValue,
    REPORT_SCHEMA_VERSION,
};
use sigfix_signals::{
    build_issues, guard_issues, AnalysisSnapshot, FileScanner, SignalConfig, SignalEngine,
    SourceLoader,
};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CONFIG_FILE: &str = "sigfix.toml";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "sigfix")]
#[command(about = "Evidence-bound code signals and verified fixes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Config file (default: <root>/sigfix.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and print guarded issues
    Analyze(AnalyzeArgs),

    /// Validate, apply in memory and verify a patch for one issue
    Verify(VerifyArgs),

    /// Print JSON schemas of the report and fix suggestion
    Schema,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Output the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct VerifyArgs {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// 1-based issue number as listed by `analyze`
    #[arg(long)]
    issue: usize,

    /// Unified diff file; `-` reads stdin
    #[arg(long)]
    patch: PathBuf,

    /// Output the suggestion as JSON
    #[arg(long)]
    json: bool,
}

/// `sigfix.toml`: `[signals]` and `[pipeline]` tables, both optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    signals: SignalConfig,
    pipeline: PipelineConfig,
}

impl FileConfig {
    fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Analyze(args) => args.json,
        Commands::Verify(args) => args.json,
        Commands::Schema => true,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args, cli.config.as_deref()).await,
        Commands::Verify(args) => run_verify(args, cli.config.as_deref()).await,
        Commands::Schema => print_stdout(&schema_json()?),
    }
}

struct Session {
    engine: SignalEngine,
    loader: SourceLoader,
    snapshot: AnalysisSnapshot,
    issues: Vec<GuardedIssue>,
    pipeline_config: PipelineConfig,
}

async fn open_session(root: &Path, config: Option<&Path>) -> Result<Session> {
    if !root.is_dir() {
        bail!("Project root {} is not a directory", root.display());
    }
    let config = FileConfig::load(config, root)?;
    let engine = SignalEngine::new(config.signals).context("Invalid [signals] config")?;

    let paths = FileScanner::new(root).scan();
    let loader = SourceLoader::new(root);
    let snapshot = engine.snapshot(&loader, &paths).await;
    let issues = guard_issues(build_issues(&snapshot.report, engine.config()));

    Ok(Session {
        engine,
        loader,
        snapshot,
        issues,
        pipeline_config: config.pipeline,
    })
}

async fn run_analyze(args: AnalyzeArgs, config: Option<&Path>) -> Result<()> {
    let session = open_session(&args.root, config).await?;
    let threshold = session.engine.config().long_function_threshold;
    let report = AnalysisReport {
        schema_version: REPORT_SCHEMA_VERSION,
        summary: session.snapshot.report.summary(threshold),
        issues: session.issues,
    };

    if args.json {
        return print_stdout(&serialize_json(&report)?);
    }
    print_stdout(&render_report(&report))
}

async fn run_verify(args: VerifyArgs, config: Option<&Path>) -> Result<()> {
    let patch = read_patch(&args.patch)?;
    let session = open_session(&args.root, config).await?;

    let index = args
        .issue
        .checked_sub(1)
        .filter(|&idx| idx < session.issues.len())
        .with_context(|| {
            format!(
                "Issue {} does not exist ({} issues found)",
                args.issue,
                session.issues.len()
            )
        })?;

    let pipeline = FixPipeline::new(
        session.engine,
        Arc::new(StaticPatchGenerator::new(patch)),
        session.pipeline_config,
    )
    .map_err(anyhow::Error::msg)
    .context("Invalid [pipeline] config")?;

    let suggestion = pipeline
        .fix_issue(
            &session.loader,
            &session.snapshot,
            issue_id(index),
            &session.issues[index],
        )
        .await;

    if args.json {
        return print_stdout(&serialize_json(&suggestion)?);
    }
    print_stdout(&render_suggestion(&suggestion))
}

fn read_patch(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read patch from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read patch {}", path.display()))
}

fn schema_json() -> Result<String> {
    let schemas = serde_json::json!({
        "analysisReport": schemars::schema_for!(AnalysisReport),
        "guardedIssue": schemars::schema_for!(GuardedIssue),
        "fixSuggestion": schemars::schema_for!(FixSuggestion),
    });
    serialize_json(&schemas)
}

fn render_report(report: &AnalysisReport) -> String {
    let s = &report.summary;
    let mut lines = vec![format!(
        "Analyzed {} files: {} functions (max {}, mean {:.2}), {} long, {} duplicate blocks, {} cycles, {} test files",
        s.files_analyzed,
        s.function_count,
        s.max_function_length,
        s.mean_function_length,
        s.long_function_count,
        s.duplicate_block_count,
        s.dependency_cycle_count,
        s.test_file_count
    )];

    for (idx, guarded) in report.issues.iter().enumerate() {
        let issue = &guarded.issue;
        let header = format!(
            "{} [{}/{}, {}]",
            issue_id(idx),
            issue.issue_type.as_str(),
            issue.signal,
            issue.confidence.as_str()
        );
        if !guarded.evidence_complete {
            lines.push(format!(
                "{header} incomplete: {}",
                guarded.missing_evidence_reason.as_deref().unwrap_or("unknown")
            ));
            continue;
        }
        lines.push(header);
        for item in &issue.evidence {
            let metrics: Vec<String> = item
                .metrics
                .iter()
                .map(|m| match &m.value {
                    MetricValue::Number(n) => format!("{}={n}", m.metric_type),
                    MetricValue::Text(t) => format!("{}={t}", m.metric_type),
                })
                .collect();
            lines.push(format!(
                "  {}:{}-{} ({})",
                item.file,
                item.start_line,
                item.end_line,
                metrics.join(", ")
            ));
        }
    }
    lines.join("\n")
}

fn render_suggestion(suggestion: &FixSuggestion) -> String {
    let status = if suggestion.verified {
        "verified"
    } else {
        "rejected"
    };
    match &suggestion.verification_details {
        Some(details) => format!(
            "{} {status}: {} ({details})",
            suggestion.issue_id, suggestion.verification_message
        ),
        None => format!(
            "{} {status}: {}",
            suggestion.issue_id, suggestion.verification_message
        ),
    }
}

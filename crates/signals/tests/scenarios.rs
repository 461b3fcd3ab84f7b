use pretty_assertions::assert_eq;
use sigfix_protocol::{Confidence, Metric, Signal};
use sigfix_signals::{
    build_issues, guard_issues, FileScanner, Overlay, SignalConfig, SignalEngine, SourceLoader,
    SourceSet,
};
use std::fs;
use tempfile::tempdir;

fn engine() -> SignalEngine {
    SignalEngine::new(SignalConfig::default()).expect("default config is valid")
}

fn repeated_block() -> String {
    (0..10)
        .map(|i| format!("  total += values[{i}] * {};\n", i + 2))
        .collect()
}

fn long_function(body_lines: usize) -> String {
    let mut code = String::from("export function crunch(values) {\n");
    for i in 0..body_lines {
        code.push_str(&format!("  const step{i} = values[{i}] + {i};\n"));
    }
    code.push_str("}\n");
    code
}

#[test]
fn duplicate_block_within_one_file() {
    let block = repeated_block();
    let code = format!(
        "export function first(values) {{\n{block}  return \"first\";\n}}\n\nexport function second(values) {{\n{block}  return \"second\";\n}}\n"
    );
    let report = engine().analyze(&SourceSet::from_pairs([("src/calc.ts", code)]));

    assert_eq!(report.duplicates.len(), 1);
    let dup = &report.duplicates[0];
    assert!(dup.length >= 10);
    let spans: Vec<_> = dup
        .occurrences
        .iter()
        .map(|o| (o.file.as_str(), o.start_line, o.end_line))
        .collect();
    assert_eq!(spans, vec![("src/calc.ts", 2, 11), ("src/calc.ts", 16, 25)]);
}

#[test]
fn function_of_fifty_five_lines_is_flagged_long() {
    // 53 body lines plus the signature and closing brace.
    let report = engine().analyze(&SourceSet::from_pairs([("src/crunch.ts", long_function(53))]));

    let long = report.long_functions(50);
    assert_eq!(long.len(), 1);
    assert_eq!(long[0].name, "crunch");
    assert_eq!(long[0].end_line - long[0].start_line + 1, 55);
    assert_eq!(long[0].length, 55);
}

#[test]
fn mutual_relative_imports_form_one_cycle() {
    let sources = SourceSet::from_pairs([
        ("src/a.ts", "import { b } from './b';\nexport const a = () => b();\n"),
        (
            "src/b.ts",
            "// helpers\nimport { a } from './a';\nexport const b = () => a();\n",
        ),
    ]);
    let report = engine().analyze(&sources);

    assert_eq!(report.cycles.len(), 1);
    let cycle = &report.cycles[0];
    assert_eq!((cycle.from.as_str(), cycle.to.as_str()), ("src/a.ts", "src/b.ts"));
    assert_eq!((cycle.from_range.start_line, cycle.from_range.end_line), (1, 1));
    assert_eq!((cycle.to_range.start_line, cycle.to_range.end_line), (2, 2));
}

#[test]
fn transitive_cycle_is_not_reported() {
    let sources = SourceSet::from_pairs([
        ("a.js", "const b = require('./b');\n"),
        ("b.js", "const c = require('./c');\n"),
        ("c.js", "const a = require('./a');\n"),
    ]);
    assert!(engine().analyze(&sources).cycles.is_empty());
}

#[test]
fn guarded_issues_cover_every_signal() {
    let sources = SourceSet::from_pairs([
        ("src/crunch.ts", long_function(120)),
        ("src/a.ts", "import { b } from './b';\n".to_string()),
        ("src/b.ts", "import { a } from './a';\n".to_string()),
    ]);
    let engine = engine();
    let report = engine.analyze(&sources);
    let issues = guard_issues(build_issues(&report, engine.config()));

    let signals: Vec<_> = issues.iter().map(|i| i.issue.signal).collect();
    assert_eq!(
        signals,
        vec![
            Signal::LongFunctions,
            Signal::DependencyCycles,
            Signal::TestPresence
        ]
    );

    let long = &issues[0];
    assert!(long.evidence_complete);
    assert_eq!(long.issue.confidence, Confidence::High);
    assert_eq!(long.issue.evidence[0].metrics, vec![Metric::loc(122)]);

    let tests = &issues[2];
    assert!(!tests.evidence_complete);
    assert_eq!(
        tests.missing_evidence_reason.as_deref(),
        Some("no evidence items provided")
    );
}

#[test]
fn issue_ordering_is_stable_across_runs() {
    let block = repeated_block();
    let sources = SourceSet::from_pairs([
        ("x.ts", format!("function x() {{\n{block}}}\n")),
        ("y.ts", format!("function y() {{\n{block}  y();\n}}\n")),
        ("z.ts", long_function(70)),
    ]);
    let engine = engine();
    let first = build_issues(&engine.analyze(&sources), engine.config());
    let second = build_issues(&engine.analyze(&sources), engine.config());
    assert_eq!(first, second);
}

#[tokio::test]
async fn overlay_replaces_disk_content_without_writing() {
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/crunch.ts"), long_function(60)).unwrap();

    let paths = FileScanner::new(temp.path()).scan();
    assert_eq!(paths, vec!["src/crunch.ts"]);

    let loader = SourceLoader::new(temp.path());
    let engine = engine();
    let snapshot = engine.snapshot(&loader, &paths).await;
    assert_eq!(snapshot.report.long_functions(50).len(), 1);

    let mut overlay = Overlay::new();
    overlay.insert("src/crunch.ts", long_function(5));
    let after = engine.analyze_from(&loader, &paths, Some(&overlay)).await;
    assert!(after.long_functions(50).is_empty());

    let on_disk = fs::read_to_string(temp.path().join("src/crunch.ts")).unwrap();
    assert_eq!(on_disk, long_function(60));
}

#[tokio::test]
async fn unreadable_files_are_skipped() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("present.ts"), "export const a = 1;\n").unwrap();

    let loader = SourceLoader::new(temp.path());
    let paths = vec!["present.ts".to_string(), "missing.ts".to_string()];
    let report = engine().analyze_from(&loader, &paths, None).await;
    assert_eq!(report.files_analyzed, 1);
}

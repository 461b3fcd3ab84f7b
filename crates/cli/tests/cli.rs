use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn sigfix(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sigfix").expect("binary");
    cmd.current_dir(workdir);
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = sigfix(workdir).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn long_function() -> String {
    let mut code = String::from("export function crunch(values) {\n");
    for i in 0..70 {
        code.push_str(&format!("  const step{i} = values[{i}] + {i};\n"));
    }
    code.push_str("}\n\nexport const other = 1;\n");
    code
}

fn setup_repo() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("src/crunch.ts"), long_function()).unwrap();
    fs::write(root.join("src/a.ts"), "import { b } from './b';\nexport const a = 1;\n").unwrap();
    fs::write(root.join("src/b.ts"), "import { a } from './a';\nexport const b = 2;\n").unwrap();
    temp
}

#[test]
fn analyze_reports_guarded_issues() {
    let repo = setup_repo();
    let body = run_json(repo.path(), &["analyze", ".", "--json"]);

    assert_eq!(body["schemaVersion"], 1);
    assert_eq!(body["summary"]["filesAnalyzed"], 3);
    assert_eq!(body["summary"]["longFunctionCount"], 1);
    assert_eq!(body["summary"]["dependencyCycleCount"], 1);

    let issues = body["issues"].as_array().unwrap();
    assert_eq!(issues[0]["signal"], "longFunctions");
    assert_eq!(issues[0]["type"], "complexity");
    assert_eq!(issues[0]["evidenceComplete"], true);
    assert_eq!(issues[0]["evidence"][0]["file"], "src/crunch.ts");
    assert_eq!(issues[0]["evidence"][0]["startLine"], 1);
    assert_eq!(issues[0]["evidence"][0]["endLine"], 72);
    assert_eq!(issues[1]["signal"], "dependencyCycles");

    let testing = issues.last().unwrap();
    assert_eq!(testing["signal"], "testPresence");
    assert_eq!(testing["evidenceComplete"], false);
    assert_eq!(testing["missingEvidenceReason"], "no evidence items provided");
}

#[test]
fn analyze_text_output_lists_issues() {
    let repo = setup_repo();
    sigfix(repo.path())
        .args(["analyze", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Analyzed 3 files"))
        .stdout(predicate::str::contains("issue-1 [complexity/longFunctions, medium]"))
        .stdout(predicate::str::contains("src/crunch.ts:1-72 (loc=72)"));
}

#[test]
fn config_file_overrides_threshold() {
    let repo = setup_repo();
    fs::write(
        repo.path().join("sigfix.toml"),
        "[signals]\nlong_function_threshold = 100\n",
    )
    .unwrap();

    let body = run_json(repo.path(), &["analyze", ".", "--json"]);
    assert_eq!(body["summary"]["longFunctionCount"], 0);
}

#[test]
fn invalid_config_is_an_error() {
    let repo = setup_repo();
    fs::write(repo.path().join("sigfix.toml"), "[signals]\nmin_window = 0\n").unwrap();

    sigfix(repo.path())
        .args(["analyze", ".", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid [signals] config"));
}

#[test]
fn verify_accepts_in_scope_patch() {
    let repo = setup_repo();
    let mut diff = String::from("--- a/src/crunch.ts\n+++ b/src/crunch.ts\n@@ -30,42 +30,0 @@\n");
    for line in 30..=71 {
        let i = line - 2;
        diff.push_str(&format!("-  const step{i} = values[{i}] + {i};\n"));
    }
    fs::write(repo.path().join("fix.diff"), &diff).unwrap();

    let body = run_json(
        repo.path(),
        &["verify", ".", "--issue", "1", "--patch", "fix.diff", "--json"],
    );
    assert_eq!(body["issueId"], "issue-1");
    assert_eq!(body["verified"], true);
    assert_eq!(body["verificationDetails"], "72 -> 30");
    assert_eq!(body["patch"], diff.as_str());

    let on_disk = fs::read_to_string(repo.path().join("src/crunch.ts")).unwrap();
    assert_eq!(on_disk, long_function());
}

#[test]
fn verify_rejects_out_of_scope_patch_from_stdin() {
    let repo = setup_repo();
    let diff = "--- a/src/crunch.ts\n+++ b/src/crunch.ts\n@@ -74 +74 @@\n-export const other = 1;\n+export const other = 2;\n";

    let output = sigfix(repo.path())
        .args(["verify", ".", "--issue", "1", "--patch", "-", "--json"])
        .write_stdin(diff)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["verified"], false);
    let message = body["verificationMessage"].as_str().unwrap().to_lowercase();
    assert!(message.contains("outside evidence"), "{message}");
}

#[test]
fn verify_unknown_issue_fails() {
    let repo = setup_repo();
    fs::write(repo.path().join("fix.diff"), "").unwrap();

    sigfix(repo.path())
        .args(["verify", ".", "--issue", "42", "--patch", "fix.diff"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Issue 42 does not exist"));
}

#[test]
fn schema_prints_contract_types() {
    let temp = tempdir().unwrap();
    let body = run_json(temp.path(), &["schema"]);
    assert!(body["guardedIssue"].is_object());
    assert!(body["fixSuggestion"].is_object());
    assert!(body["analysisReport"].is_object());
}

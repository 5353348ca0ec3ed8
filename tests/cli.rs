// Binary-level behaviour: exit codes, output formats and subcommands.
mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

use support::{CONTROLLER, REPOSITORY, SERVICE, shop};

fn callscope() -> Command {
    let mut cmd = Command::cargo_bin("callscope").expect("bin");
    // Keep host overrides out of the runs
    cmd.env_remove("CONTEXT_CALL_DEPTH_UP")
        .env_remove("CONTEXT_CALL_DEPTH_DOWN")
        .env_remove("RUST_LOG")
        .arg("--quiet");
    cmd
}

#[test]
fn context_prints_camel_case_json() {
    let project = shop();

    let out = callscope()
        .args(["context", "--repo-path"])
        .arg(project.path())
        .args(["--changed-files", SERVICE, "--up-depth", "1", "--down-depth", "1"])
        .output()
        .expect("run");

    assert!(out.status.success());
    let json: Value = serde_json::from_slice(&out.stdout).expect("json");

    assert_eq!(json["changedFiles"][0]["path"], SERVICE);
    assert_eq!(json["changedFiles"][0]["className"], "OrderService");

    let related: Vec<&str> = json["relatedFiles"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|r| r["path"].as_str())
        .collect();
    assert!(related.contains(&REPOSITORY));
    assert!(related.contains(&CONTROLLER));
    assert!(json["callChains"].as_array().is_some_and(|c| !c.is_empty()));
}

#[test]
fn depth_comes_from_environment_when_no_flag_is_given() {
    let project = shop();

    let out = callscope()
        .env("CONTEXT_CALL_DEPTH_UP", "0")
        .env("CONTEXT_CALL_DEPTH_DOWN", "0")
        .args(["context", "--repo-path"])
        .arg(project.path())
        .args(["--changed-files", SERVICE])
        .output()
        .expect("run");

    assert!(out.status.success());
    let json: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(json["relatedFiles"].as_array().map(Vec::len), Some(0));
}

#[test]
fn changed_methods_json_narrows_seeds() {
    let project = shop();
    let methods = format!(r#"{{"{SERVICE}": ["cancel"]}}"#);

    let out = callscope()
        .args(["context", "--repo-path"])
        .arg(project.path())
        .args(["--changed-files", SERVICE, "--changed-methods", &methods])
        .args(["--up-depth", "2", "--down-depth", "2"])
        .output()
        .expect("run");

    assert!(out.status.success());
    let json: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(
        json["callChains"],
        serde_json::json!(["OrderService.cancel() -> OrderRepository.delete()"])
    );
}

#[test]
fn diff_is_read_from_stdin() {
    let project = shop();
    let diff = format!(
        "diff --git a/{SERVICE} b/{SERVICE}\n--- a/{SERVICE}\n+++ b/{SERVICE}\n@@ -15,1 +15,1 @@\n-        repo.delete(id.trim());\n+        repo.delete(id);\n"
    );

    let out = callscope()
        .args(["context", "--repo-path"])
        .arg(project.path())
        .args(["--changed-files", SERVICE, "--diff", "-", "--up-depth", "0"])
        .write_stdin(diff)
        .output()
        .expect("run");

    assert!(out.status.success());
    let json: Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(json["relatedFiles"][0]["path"], REPOSITORY);
    assert_eq!(json["relatedFiles"].as_array().map(Vec::len), Some(1));
}

#[test]
fn text_format_renders_sections() {
    let project = shop();

    callscope()
        .args(["context", "--format", "text", "--repo-path"])
        .arg(project.path())
        .args(["--changed-files", SERVICE, "--down-depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("== Changed files =="))
        .stdout(predicate::str::contains("Class: OrderService"))
        .stdout(predicate::str::contains("== Call chains =="));
}

#[test]
fn missing_changed_files_flag_is_a_usage_error() {
    let project = shop();

    callscope()
        .args(["context", "--repo-path"])
        .arg(project.path())
        .assert()
        .code(2);
}

#[test]
fn blank_changed_files_is_a_usage_error() {
    let project = shop();

    callscope()
        .args(["context", "--changed-files", " , ", "--repo-path"])
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no changed files"));
}

#[test]
fn missing_repo_is_a_usage_error() {
    callscope()
        .args([
            "context",
            "--repo-path",
            "/definitely/not/a/project",
            "--changed-files",
            "A.java",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("project root not found"));
}

#[test]
fn malformed_changed_methods_is_a_usage_error() {
    let project = shop();

    callscope()
        .args(["context", "--changed-files", SERVICE, "--changed-methods", "[1]"])
        .arg("--repo-path")
        .arg(project.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("changed-methods"));
}

#[test]
fn trace_prints_callers_and_callees() {
    let project = shop();

    callscope()
        .args(["--no-color", "trace", "OrderService.placeOrder", "--repo-path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("OrderService.placeOrder()"))
        .stdout(predicate::str::contains("OrderController.submit()"))
        .stdout(predicate::str::contains("Database.write()"));
}

#[test]
fn trace_of_unknown_method_fails() {
    let project = shop();

    callscope()
        .args(["trace", "nothingLikeThis", "--repo-path"])
        .arg(project.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No method matches"));
}

#[test]
fn stats_dot_is_graphviz() {
    let project = shop();

    callscope()
        .args(["stats", "--dot", "--repo-path"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph"))
        .stdout(predicate::str::contains("com.shop.repo.OrderRepository#save"));
}

#[test]
fn init_writes_default_config() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    callscope().arg("init").arg(tmp.path()).assert().success();

    let text = std::fs::read_to_string(tmp.path().join("callscope.toml")).expect("config");
    assert!(text.contains("max_related_files = 10"));

    // Second run refuses to overwrite
    callscope().arg("init").arg(tmp.path()).assert().failure();
}

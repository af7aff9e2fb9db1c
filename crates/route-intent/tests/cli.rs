use std::path::Path;
use std::process::{Command, Output};

fn route_intent(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_route-intent"))
        .arg("--config")
        .arg(dir.join("missing-config.yaml"))
        .args(args)
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("route-intent should spawn")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a JSON document")
}

#[test]
fn routes_message_and_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.yaml");
    std::fs::write(
        &policy,
        r#"
blocked_tools: [web.image_query]
rules:
  - id: stop_job
    kind: regex
    action: stop_job
    pattern: '\bSTOP\s+(?P<job_id>[A-Za-z0-9_.:-]+)\b'
    flags: [IGNORECASE]
"#,
    )
    .unwrap();

    let output = route_intent(
        dir.path(),
        &["--policy", policy.to_str().unwrap(), "please", "STOP", "job-42", "now"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["action"], "stop_job");
    assert_eq!(json["arguments"]["job_id"], "job-42");
    assert_eq!(json["span"], serde_json::json!([7, 18]));
    assert_eq!(json["blocked_tools"], serde_json::json!(["web.image_query"]));
}

#[test]
fn unmatched_message_falls_through() {
    let dir = tempfile::tempdir().unwrap();
    let output = route_intent(
        dir.path(),
        &["--policy", dir.path().join("absent.yaml").to_str().unwrap(), "hello", "there"],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["action"], "normal_flow");
    assert!(json["matched_rule"].is_null());
}

#[test]
fn tilde_policy_path_is_expanded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("router_policy.yaml"),
        "rules: [{id: greeting, kind: token_any, action: custom, tokens: [HELLO]}]\n",
    )
    .unwrap();

    let output = route_intent(dir.path(), &["--policy", "~/router_policy.yaml", "HELLO"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["action"], "custom");
}

#[test]
fn invalid_policy_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.yaml");
    std::fs::write(
        &policy,
        "rules:\n  - id: mystery\n    kind: unknown\n    action: whatever\n",
    )
    .unwrap();

    let output = route_intent(dir.path(), &["--policy", policy.to_str().unwrap(), "STOP job-1"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("rule 'mystery'"), "stderr: {stderr}");
}

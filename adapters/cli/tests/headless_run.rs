use std::process::Command;

use serde_json::Value;

#[test]
fn json_run_ends_with_agent_snapshots() {
    let output = Command::new(env!("CARGO_BIN_EXE_harbor-patrol"))
        .args(["--steps", "120", "--seed", "3", "--json"])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run harbor-patrol");
    assert!(output.status.success(), "harbor-patrol exited with {}", output.status);

    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.len() > 1);

    let first: Value = serde_json::from_str(lines[0]).expect("event line");
    assert_eq!(first["step"], 0);
    assert!(first["event"]["kind"].is_string());

    let last: Value = serde_json::from_str(lines[lines.len() - 1]).expect("final line");
    assert_eq!(last["steps"], 120);
    let agents = last["agents"].as_array().expect("agents array");
    assert_eq!(agents.len(), 3);
    assert_eq!(agents[2]["name"], "courier");
}

#[test]
fn same_seed_reproduces_the_run() {
    let run = || {
        Command::new(env!("CARGO_BIN_EXE_harbor-patrol"))
            .args(["--steps", "200", "--seed", "9", "--json"])
            .env("RUST_LOG", "off")
            .output()
            .expect("failed to run harbor-patrol")
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn missing_scenario_file_fails_with_context() {
    let output = Command::new(env!("CARGO_BIN_EXE_harbor-patrol"))
        .args(["--scenario", "does/not/exist.toml"])
        .output()
        .expect("failed to run harbor-patrol");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read scenario"), "stderr: {stderr}");
}

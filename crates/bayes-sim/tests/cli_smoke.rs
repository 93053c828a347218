use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

fn demo(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(file)
}

fn bayes_sim() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bayes-sim"))
}

#[test]
fn describe_lists_the_demo_model() {
    let output = bayes_sim()
        .args(["describe", "--model"])
        .arg(demo("normal_hierarchy.yaml"))
        .output()
        .expect("run bayes-sim describe");
    assert!(output.status.success(), "describe failed: {output:?}");
    let body = String::from_utf8(output.stdout).expect("utf8");
    assert!(body.starts_with("Model with "));
    let order = body
        .lines()
        .find_map(|line| line.strip_prefix("Stochastic order: "))
        .expect("ordering line");
    let names: Vec<&str> = order.split(" -> ").collect();
    let position = |name: &str| names.iter().position(|n| *n == name).expect(name);
    assert!(position("hyper") < position("a"));
    assert!(position("a") < position("ya"));
    assert!(position("sigma") < position("yb"));
    assert!(body.contains("Model hash: "));
}

#[test]
fn run_writes_artefacts_and_is_repeatable() {
    let run_once = |seed: &str| {
        let dir = tempdir().expect("tempdir");
        let status = bayes_sim()
            .args(["run", "--model"])
            .arg(demo("normal_hierarchy.yaml"))
            .arg("--config")
            .arg(demo("normal_hierarchy.mcmc.yaml"))
            .arg("--out")
            .arg(dir.path())
            .args(["--seed", seed])
            .env("RUST_LOG", "warn")
            .status()
            .expect("run bayes-sim run");
        assert!(status.success(), "run command failed");
        for file in ["trace.log", "manifest.json", "moves.txt", "summary.json", "config.yaml"] {
            assert!(dir.path().join(file).exists(), "missing {file}");
        }
        let summary: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("summary.json")).expect("summary"),
        )
        .expect("json");
        summary.get("final_posterior").cloned().expect("posterior")
    };
    assert_eq!(run_once("7"), run_once("7"));
}

#[test]
fn version_prints_the_package_version() {
    let output = bayes_sim().arg("version").output().expect("run bayes-sim version");
    assert!(output.status.success());
    let body = String::from_utf8(output.stdout).expect("utf8");
    assert_eq!(body.trim(), env!("CARGO_PKG_VERSION"));
}

//! Integration tests for `keel platform`.

mod common;

use common::keel;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_platform_list() {
    let temp_dir = TempDir::new().unwrap();
    keel(&temp_dir)
        .arg("platform")
        .assert()
        .success()
        .stdout(predicate::str::contains("Detected system: workstation"))
        .stdout(predicate::str::contains("pascal"))
        .stdout(predicate::str::contains("lassen"));
}

#[test]
fn test_platform_detected_from_env() {
    let temp_dir = TempDir::new().unwrap();
    let output = keel(&temp_dir).env("KEEL_SYSTEM", "quartz").args(["platform", "--json"]).output().unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["detected"], "quartz");
    assert_eq!(result["platforms"].as_array().unwrap().len(), 7);
}

#[test]
fn test_platform_tuning_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = keel(&temp_dir).args(["platform", "pascal", "--json"]).output().unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["scheduler"], "slurm");
    assert_eq!(result["procs_per_node"], 2);
    assert_eq!(
        result["launcher_args"],
        serde_json::json!(["--mpibind=off", "--nvidia_compute_mode=default", "--cpu_bind=mask_cpu:0x1ff,0x3fe00"])
    );
    assert_eq!(result["environment"]["OMP_NUM_THREADS"], "8");
}

#[test]
fn test_platform_human_output() {
    let temp_dir = TempDir::new().unwrap();
    keel(&temp_dir)
        .args(["platform", "sierra", "--procs-per-node", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scheduler:      lsf"))
        .stdout(predicate::str::contains("OMP_NUM_THREADS=21"))
        .stdout(predicate::str::contains("IBV_FORK_SAFE=1"));
}

#[test]
fn test_platform_unknown_system() {
    let temp_dir = TempDir::new().unwrap();
    keel(&temp_dir)
        .args(["platform", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown system: nowhere"));
}

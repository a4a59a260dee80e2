//! Shared helpers for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const EXPERIMENT: &str = r#"{
  "trainer": {"mini_batch_size": 64},
  "model": {
    "num_epochs": 2,
    "layer": [
      {"type": "Input", "args": {"name": "data"}},
      {"type": "FullyConnected", "args": {"name": "fc", "parents": "data", "num_neurons": 10}},
      {"type": "Softmax", "args": {"name": "prob", "parents": "fc", "softmax_mode": "CHANNEL"}}
    ]
  }
}"#;

/// `keel` isolated from the user's configuration, the host name and any
/// scheduler allocation.
pub fn keel(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("keel").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("KEEL_SYSTEM", "workstation")
        .env("NO_COLOR", "1")
        .env_remove("SLURM_JOB_ID")
        .env_remove("LSB_JOBID");
    cmd
}

/// Write the sample experiment into `dir` and return its path.
pub fn write_experiment(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("experiment.json");
    fs::write(&path, EXPERIMENT).unwrap();
    path
}

/// Install a fake scheduler submitter `name` in `dir/bin`. It records its
/// arguments, working directory and stdin next to itself and exits with
/// `status`. Returns a `PATH` value that finds it first.
#[cfg(unix)]
pub fn fake_submitter(dir: &TempDir, name: &str, status: i32) -> std::ffi::OsString {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let path = bin.join(name);
    let script = format!(
        "#!/bin/sh\nhere=$(dirname \"$0\")\nprintf '%s\\n' \"$@\" > \"$here/{name}.args\"\npwd > \"$here/{name}.cwd\"\ncat > \"$here/{name}.stdin\"\nexit {status}\n"
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

    let inherited = std::env::var_os("PATH").unwrap_or_default();
    std::env::join_paths(std::iter::once(bin).chain(std::env::split_paths(&inherited))).unwrap()
}

/// What a fake submitter recorded: arguments, working directory and stdin.
pub fn submitted(dir: &TempDir, name: &str) -> (Vec<String>, PathBuf, String) {
    let bin = dir.path().join("bin");
    let args = fs::read_to_string(bin.join(format!("{name}.args"))).unwrap();
    let cwd = fs::read_to_string(bin.join(format!("{name}.cwd"))).unwrap();
    let stdin = fs::read_to_string(bin.join(format!("{name}.stdin"))).unwrap();
    (args.lines().filter(|a| !a.is_empty()).map(String::from).collect(), PathBuf::from(cwd.trim_end()), stdin)
}

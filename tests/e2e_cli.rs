//! CLI end-to-end tests
//!
//! Tests for the reelprobe command-line interface against synthetic media
//! files written into temporary directories.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use rp_probe::fixtures::{AviFixture, MkvFixture, Mp4Fixture};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Get a command for the reelprobe binary
#[allow(deprecated)]
fn reelprobe_cmd() -> Command {
    Command::cargo_bin("reelprobe").unwrap()
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// A config with ffprobe disabled so results never depend on the host.
fn native_config(dir: &TempDir) -> PathBuf {
    write(dir.path(), "reelprobe.toml", b"[probe]\nfallback = false\n")
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = reelprobe_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = reelprobe_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("reelprobe"));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = reelprobe_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("ffprobe"));
}

#[test]
fn test_cli_probe_mp4_json() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "movie.mp4", &Mp4Fixture::default().build());

    let output = reelprobe_cmd()
        .args(["probe", "--native-only", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "movie.mp4");
    assert_eq!(json["codec"], "h264");
    assert_eq!(json["audioCodec"], "aac");
    assert_eq!(json["width"], 1920);
    assert_eq!(json["height"], 1080);
    assert_eq!(json["duration"], "00:00:10");
    assert_eq!(json["framerate"], 29.97);
    assert_eq!(json["hasDurationMismatch"], false);
}

#[test]
fn test_cli_probe_mkv_text() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "episode.mkv", &MkvFixture::default().build());

    reelprobe_cmd()
        .args(["probe", "--native-only"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Video: h264 1280x720"))
        .stdout(predicate::str::contains("Duration: 00:00:10"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    reelprobe_cmd()
        .args(["probe", "/nonexistent/path/to/file.mkv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_cli_probe_garbage_native_only_fails() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "broken.avi", b"definitely not a riff file");

    reelprobe_cmd()
        .args(["probe", "--native-only"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to probe"));
}

#[test]
fn test_cli_scan_flags_duration_mismatch() {
    let dir = tempdir().unwrap();
    let config = native_config(&dir);
    let a = write(dir.path(), "a.mkv", &MkvFixture::default().build());
    let b = write(dir.path(), "b.avi", &AviFixture::default().build());
    let long = Mp4Fixture {
        duration_ticks: 450_000,
        ..Default::default()
    };
    let c = write(dir.path(), "c.mp4", &long.build());

    let output = reelprobe_cmd()
        .arg("--config")
        .arg(&config)
        .args(["scan", "--json"])
        .args([&a, &b, &c])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a.mkv", "b.avi", "c.mp4"]);

    let check = &json["durationCheck"];
    assert_eq!(check["hasMismatch"], true);
    assert_eq!(check["baseDuration"], "00:00:10");
    assert_eq!(check["mismatchFiles"].as_array().unwrap().len(), 1);
    assert_eq!(check["mismatchFiles"][0]["name"], "c.mp4");
    assert_eq!(check["mismatchFiles"][0]["diff"], "+5.0s");
    assert_eq!(json["files"][2]["hasDurationMismatch"], true);
}

#[test]
fn test_cli_scan_tolerance_override() {
    let dir = tempdir().unwrap();
    let config = native_config(&dir);
    let a = write(dir.path(), "a.mkv", &MkvFixture::default().build());
    let long = Mp4Fixture {
        duration_ticks: 450_000,
        ..Default::default()
    };
    let b = write(dir.path(), "b.mp4", &long.build());

    reelprobe_cmd()
        .arg("--config")
        .arg(&config)
        .args(["scan", "--tolerance", "10", "--jobs", "1"])
        .args([&a, &b])
        .assert()
        .success()
        .stdout(predicate::str::contains("All durations match 00:00:10"));
}

#[test]
fn test_cli_scan_reports_failures_without_aborting() {
    let dir = tempdir().unwrap();
    let config = native_config(&dir);
    let good = write(dir.path(), "good.mp4", &Mp4Fixture::default().build());
    let bad = write(dir.path(), "bad.mkv", b"garbage");

    reelprobe_cmd()
        .arg("--config")
        .arg(&config)
        .arg("scan")
        .args([&good, &bad])
        .assert()
        .success()
        .stdout(predicate::str::contains("good.mp4"))
        .stdout(predicate::str::contains("Errors: 1"))
        .stdout(predicate::str::contains("bad.mkv: Parse error"));
}

#[test]
fn test_cli_scan_skips_unsupported_files() {
    let dir = tempdir().unwrap();
    let config = native_config(&dir);
    let good = write(dir.path(), "good.mp4", &Mp4Fixture::default().build());
    let notes = write(dir.path(), "notes.txt", b"not a video");

    reelprobe_cmd()
        .arg("--config")
        .arg(&config)
        .arg("scan")
        .args([&good, &notes])
        .assert()
        .success()
        .stdout(predicate::str::contains("good.mp4"))
        .stdout(predicate::str::contains("notes.txt: Validation error: unsupported format: .txt"))
        .stderr(predicate::str::contains("skipping unsupported format"));
}

#[test]
fn test_cli_scan_zero_jobs_is_an_error() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "a.mp4", &Mp4Fixture::default().build());

    reelprobe_cmd()
        .args(["scan", "--jobs", "0"])
        .arg(&file)
        .assert()
        .failure();
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config = write(
        dir.path(),
        "reelprobe.toml",
        b"[probe]\nnative = true\n\n[scan]\nconcurrency = 8\ntolerance_secs = 2.5\n",
    );

    reelprobe_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Scan concurrency: 8"));
}

#[test]
fn test_cli_validate_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let config = write(dir.path(), "reelprobe.toml", b"[scan]\nconcurrency = 0\n");

    reelprobe_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_cli_verbose_logs_to_stderr() {
    let dir = tempdir().unwrap();
    let file = write(dir.path(), "movie.mp4", &Mp4Fixture::default().build());

    let output = reelprobe_cmd()
        .args(["--verbose", "probe", "--native-only", "--json"])
        .arg(&file)
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success());
    // stdout must stay valid JSON even with trace logging on
    serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap();
}

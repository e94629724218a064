mod fixtures;

use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn it_respects_file_output() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");

    let sample = demo_app_sample();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.args(["-o", &f.to_string_lossy(), sample.to_str().unwrap()]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    assert!(
        output.stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let written = fs::read_to_string(&f).unwrap();
    assert_eq!(written.lines().count(), 4, "{}", written);
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();

    let sample = demo_app_sample();
    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.args(["-o", &d.path().to_string_lossy(), sample.to_str().unwrap()]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_it_overwrites_file_anyways_if_passed_flag() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");

    let mut file = File::create(&f).unwrap();
    file.write_all(b"I'm a file!").unwrap();

    let sample = demo_app_sample();
    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.args([
        "-o",
        &f.to_string_lossy(),
        "--no-confirm-overwrite",
        sample.to_str().unwrap(),
    ]);

    cmd.assert().success();

    let written = fs::read_to_string(&f).unwrap();
    assert!(!written.contains("I'm a file!"));
    assert!(written.contains(r#""kind":"time-profile""#));
}

#[test]
fn it_prints_one_record_per_line() {
    let sample = demo_app_sample();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.args(["--format", "jsonl", sample.to_str().unwrap()]);

    let output = cmd.output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);

    for line in &lines {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(record["event"]["kind"].is_string(), "{}", line);
    }
    assert!(lines[0].contains(r#""kind":"time-profile""#));
    assert!(lines[0].contains(r#""table":"time-profile""#));
}

#[test]
fn it_filters_by_kind() {
    let sample = demo_app_sample();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.args(["--kind", "potential-hang", sample.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""kind":"potential-hang""#))
        .stdout(predicate::str::contains("time-profile").not())
        .stderr(predicate::str::contains("3 records filtered out"));
}

#[test]
fn it_rejects_unknown_kinds() {
    let sample = demo_app_sample();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.args(["--kind", "time profile", sample.to_str().unwrap()]);

    cmd.assert().failure();
}

#[test]
fn it_reports_missing_input_files() {
    let d = tempdir().unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("xctrace_dump"));
    cmd.arg(d.path().join("missing.xml"));

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing.xml"));
}

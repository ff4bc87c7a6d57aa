//! Integration tests for top-level CLI behavior.

mod common;

use std::path::{Path, PathBuf};
use std::process::Command;

use common::Module;

fn run_verdiff(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_verdiff");
    Command::new(bin)
        .args(args)
        .env_remove("VERDIFF_DEPLOY_ROOT")
        .env_remove("VERDIFF_ROLLBACK_ROOT")
        .env_remove("VERDIFF_RECORD")
        .output()
        .expect("failed to run verdiff binary")
}

/// Fresh fixture directory with empty `deploy` and `rollback` trees.
fn fixture(name: &str) -> PathBuf {
    let base = std::env::temp_dir().join(format!("verdiff_cli_{name}"));
    let _ = std::fs::remove_dir_all(&base);
    std::fs::create_dir_all(base.join("deploy")).unwrap();
    std::fs::create_dir_all(base.join("rollback")).unwrap();
    base
}

fn compare(base: &Path, extra: &[&str]) -> std::process::Output {
    let deploy = base.join("deploy");
    let rollback = base.join("rollback");
    let mut args = vec!["compare", deploy.to_str().unwrap(), rollback.to_str().unwrap()];
    args.extend_from_slice(extra);
    run_verdiff(&args)
}

#[test]
fn newer_in_deploy_and_missing_in_rollback() {
    let base = fixture("scenarios");
    Module::managed([1, 2, 0, 0]).write(&base.join("deploy/lib/a.dll"));
    Module::managed([1, 1, 0, 0]).write(&base.join("rollback/lib/a.dll"));
    Module::native().string("FileVersion", "2.0.0.0").write(&base.join("deploy/lib/b.dll"));

    let output = compare(&base, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        [
            "lib/a.dll -> deploy 1.2.0.0, rollback 1.1.0.0 (NewerInDeploy)",
            "lib/b.dll -> deploy 2.0.0.0, rollback missing (MissingInRollback)",
        ]
    );

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn empty_trees_produce_no_rows() {
    let base = fixture("empty");
    std::fs::write(base.join("deploy/readme.txt"), "not a module").unwrap();

    let output = compare(&base, &[]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn missing_rollback_root_fails_and_names_it() {
    let base = fixture("missing_rollback");
    std::fs::remove_dir_all(base.join("rollback")).unwrap();
    Module::managed([1, 0, 0, 0]).write(&base.join("deploy/a.dll"));

    let output = compare(&base, &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("rollback root"), "{stderr}");
    assert!(stderr.contains(&base.join("rollback").display().to_string()), "{stderr}");
    assert!(output.stdout.is_empty());

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn report_is_written_as_csv() {
    let base = fixture("report");
    Module::managed([3, 0, 0, 0]).write(&base.join("deploy/Core.dll"));
    Module::managed([3, 0, 0, 0]).write(&base.join("rollback/core.DLL"));
    Module::native().string("FileVersion", "1.0-RC1").write(&base.join("rollback/old.dll"));
    let report = base.join("out/report.csv");

    let output = compare(&base, &["--report", report.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let csv = std::fs::read_to_string(&report).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "FileName,RelativePath,DeployVersion,RollbackVersion,Status,DeployFullPath,RollbackFullPath"
    );
    assert!(lines[1].starts_with("Core.dll,Core.dll,3.0.0.0,3.0.0.0,Same,"), "{}", lines[1]);
    assert!(lines[2].starts_with("old.dll,old.dll,,1.0-RC1,MissingInDeploy,,"), "{}", lines[2]);

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn unwritable_report_is_only_a_warning() {
    let base = fixture("unwritable_report");
    Module::managed([1, 0, 0, 0]).write(&base.join("deploy/a.dll"));
    // A directory where the report file should go makes the write fail.
    let report = base.join("report.csv");
    std::fs::create_dir_all(&report).unwrap();

    let output = compare(&base, &["--report", report.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("(MissingInRollback)"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to write report"));

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn repeated_runs_are_identical() {
    let base = fixture("idempotent");
    for (i, name) in ["z.dll", "m/a.dll", "b.dll", "m/c.dll"].iter().enumerate() {
        let minor = u16::try_from(i).unwrap();
        Module::managed([1, minor, 0, 0]).write(&base.join("deploy").join(name));
        Module::managed([1, 0, 0, 0]).write(&base.join("rollback").join(name));
    }

    let first = compare(&base, &[]);
    let second = compare(&base, &[]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    let stdout = String::from_utf8_lossy(&first.stdout);
    let paths: Vec<&str> = stdout.lines().map(|l| l.split(" -> ").next().unwrap()).collect();
    assert_eq!(paths, ["b.dll", "m/a.dll", "m/c.dll", "z.dll"]);

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn duplicate_relative_paths_keep_higher_version() {
    let base = fixture("duplicates");
    Module::managed([2, 5, 0, 0]).write(&base.join("deploy/Lib/Dup.dll"));
    Module::managed([2, 7, 0, 0]).write(&base.join("deploy/lib/dup.dll"));
    Module::managed([2, 6, 0, 0]).write(&base.join("rollback/lib/dup.dll"));

    let output = compare(&base, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert_eq!(stdout.trim_end(), "Lib/Dup.dll -> deploy 2.7.0.0, rollback 2.6.0.0 (NewerInDeploy)");

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn extension_option_selects_other_modules() {
    let base = fixture("extension");
    Module::native().string("FileVersion", "5.0.0.0").write(&base.join("deploy/tool.exe"));
    Module::managed([1, 0, 0, 0]).write(&base.join("deploy/lib.dll"));

    let output = compare(&base, &["--extension", ".exe"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "tool.exe -> deploy 5.0.0.0, rollback missing (MissingInRollback)");

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn roots_can_come_from_environment() {
    let base = fixture("env_roots");
    Module::managed([1, 0, 0, 0]).write(&base.join("rollback/a.dll"));

    let output = Command::new(env!("CARGO_BIN_EXE_verdiff"))
        .arg("compare")
        .env("VERDIFF_DEPLOY_ROOT", base.join("deploy"))
        .env("VERDIFF_ROLLBACK_ROOT", base.join("rollback"))
        .env_remove("VERDIFF_RECORD")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "a.dll -> deploy missing, rollback 1.0.0.0 (MissingInDeploy)");

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn modules_with_only_fixed_info_are_missing_on_both_sides() {
    let base = fixture("fixed_only");
    Module::native().fixed([7, 0, 0, 0]).write(&base.join("deploy/native.dll"));
    Module::native().fixed([6, 0, 0, 0]).write(&base.join("rollback/native.dll"));

    let output = compare(&base, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert_eq!(stdout.trim_end(), "native.dll -> deploy missing, rollback missing (Missing)");

    let _ = std::fs::remove_dir_all(&base);
}

#[cfg(unix)]
#[test]
fn non_utf8_root_is_reported_not_panicked() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let base = fixture("non_utf8");
    let odd = base.join(OsStr::from_bytes(b"deploy-\xff"));
    let output = Command::new(env!("CARGO_BIN_EXE_verdiff"))
        .arg("compare")
        .arg(&odd)
        .arg(base.join("rollback"))
        .env_remove("VERDIFF_RECORD")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "{stderr}");
    assert!(stderr.contains("deploy root"), "{stderr}");

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn push_config_rejects_bad_destination() {
    let output = run_verdiff(&["push-config", "Cargo.toml", "no-at-sign"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("invalid destination"), "{stderr}");
}

#[test]
fn push_config_reports_missing_local_file() {
    let output = run_verdiff(&["push-config", "/definitely/not/here.config", "ops@web01"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn push_config_requires_two_arguments() {
    let output = run_verdiff(&["push-config", "app.config"]);
    assert!(!output.status.success());
}

#[test]
fn help_lists_subcommands() {
    let output = run_verdiff(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("compare"));
    assert!(stdout.contains("push-config"));
}

//! CLI integration tests
//!
//! Runs the built binary against trace files in a temporary directory. Header
//! resolution goes through a small shell script standing in for the compiler.

mod support;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use support::TraceBuilder;
use tempfile::TempDir;

fn buildtrace_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_buildtrace"))
}

fn run(args: &[&str]) -> Output {
    Command::new(buildtrace_bin())
        .args(args)
        .env_remove("BUILDTRACE_CONFIG")
        .env_remove("BUILDTRACE_JOBS")
        .env_remove("BUILDTRACE_SOURCE_ROOT")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute buildtrace")
}

/// Writes a fake compiler that answers `-M -MT <target> <source>` with a
/// dependency rule listing two headers.
#[cfg(unix)]
fn fake_compiler(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-clang");
    let script = r#"#!/bin/sh
target=""
last=""
while [ $# -gt 0 ]; do
    case "$1" in
        -MT) shift; target="$1" ;;
        *) last="$1" ;;
    esac
    shift
done
printf '%s: %s src/common/foo.h \\\n  src/common/cras_types.h\n' "$target" "$last"
"#;
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn scenario_trace() -> TraceBuilder {
    TraceBuilder::new()
        .compile("foo.o", "src/common/foo.c", &["-Isrc/common"])
        .link("foo_unittest", &["foo.o", "-lgtest"])
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("buildtrace"));
    assert!(stdout.contains("generate"));
    assert!(stdout.contains("profile"));
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[cfg(unix)]
#[test]
fn test_generate_prints_rules() {
    let dir = TempDir::new().unwrap();
    let trace = scenario_trace().write(dir.path());
    let compiler = fake_compiler(dir.path());

    let output = run(&[
        "generate",
        trace.to_str().unwrap(),
        "--compiler",
        compiler.to_str().unwrap(),
        "--source-root",
        dir.path().to_str().unwrap(),
        "--jobs",
        "2",
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("# Copyright"));
    assert!(stdout.contains("cc_library(\n    name = \"test_support\",\n"));
    assert!(stdout.contains("cc_test(\n    name = \"foo_unittest\",\n"));
    assert!(stdout.contains("        \"//src/common:foo.c\",\n"));
    assert!(stdout.contains("        \"//src/common:all_headers\",\n"));
    assert!(stdout.contains("        \"@pkg_config//:gtest\",\n"));
}

#[cfg(unix)]
#[test]
fn test_unmapped_archive_target_logged_and_omitted() {
    let dir = TempDir::new().unwrap();
    let trace = scenario_trace()
        .compile("a.o", "src/tests/a_unittest.cc", &[])
        .link("a_unittest", &["a.o", "./.libs/libcrasserver.a"])
        .write(dir.path());
    let compiler = fake_compiler(dir.path());

    let output = run(&[
        "generate",
        trace.to_str().unwrap(),
        "--compiler",
        compiler.to_str().unwrap(),
        "--source-root",
        dir.path().to_str().unwrap(),
    ]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name = \"foo_unittest\""));
    assert!(!stdout.contains("a_unittest"));
    assert!(stderr.contains("a_unittest"));
    assert!(stderr.contains("./.libs/libcrasserver.a"));
}

#[cfg(unix)]
#[test]
fn test_generate_json_to_file() {
    let dir = TempDir::new().unwrap();
    let trace = scenario_trace().write(dir.path());
    let compiler = fake_compiler(dir.path());
    let out = dir.path().join("rules.json");

    let output = run(&[
        "-q",
        "generate",
        trace.to_str().unwrap(),
        "--compiler",
        compiler.to_str().unwrap(),
        "--source-root",
        dir.path().to_str().unwrap(),
        "--format",
        "json",
        "--output",
        out.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed[0]["name"], "foo_unittest");
    assert_eq!(parsed[0]["facts"]["sources"][0], "src/common/foo.c");
    assert_eq!(parsed[0]["facts"]["headers"][0], "src/common/cras_types.h");
    assert_eq!(parsed[0]["facts"]["headers"][1], "src/common/foo.h");
}

#[cfg(unix)]
#[test]
fn test_generate_with_config_file() {
    let dir = TempDir::new().unwrap();
    let trace = TraceBuilder::new()
        .compile("a.o", "src/tests/a_unittest.cc", &[])
        .link("a_unittest", &["a.o", "-lsbc"])
        .write(dir.path());
    let compiler = fake_compiler(dir.path());
    let config = dir.path().join("buildtrace.toml");
    fs::write(
        &config,
        concat!(
            "[mapping.libraries]\nsbc = \"@pkg_config//:sbc\"\n\n",
            "[support]\nname = \"cras_test_support\"\n",
        ),
    )
    .unwrap();

    let output = run(&[
        "generate",
        trace.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--compiler",
        compiler.to_str().unwrap(),
        "--source-root",
        dir.path().to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("        \"@pkg_config//:sbc\",\n"));
    assert!(stdout.contains("        \":cras_test_support\",\n"));
}

#[cfg(unix)]
#[test]
fn test_failing_compiler_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let trace = scenario_trace().write(dir.path());

    let output = run(&[
        "generate",
        trace.to_str().unwrap(),
        "--compiler",
        "false",
        "--source-root",
        dir.path().to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("foo.o"));
}

#[test]
fn test_missing_trace_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let output = run(&["generate", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing.json"));
}

#[test]
fn test_zero_jobs_rejected() {
    let dir = TempDir::new().unwrap();
    let trace = scenario_trace().write(dir.path());

    let output = run(&["generate", trace.to_str().unwrap(), "--jobs", "0"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("jobs must be at least 1"));
}

#[test]
fn test_profile_prints_summary() {
    let dir = TempDir::new().unwrap();
    let trace = scenario_trace()
        .exec(&["ar", "cru", ".libs/libcrasmix.a", "mix.o"])
        .write(dir.path());

    let output = run(&["profile", trace.to_str().unwrap()]);

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["compilations"], 1);
    assert_eq!(parsed["stats"]["executions"], 3);
    assert_eq!(parsed["stats"]["ignored_tools"], 1);
    assert_eq!(parsed["links"][0]["output"], "foo_unittest");
    assert_eq!(parsed["links"][0]["libraries"][0], "gtest");
}

//! CLI End-to-End Tests
//!
//! Drives the `karst` binary: file mode, REPL mode, flags, and the exit
//! code contract (0 ok, 64 usage, 65 compile error, 70 runtime error,
//! 74 unreadable file).

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn karst() -> Command {
    Command::cargo_bin("karst").expect("binary builds")
}

/// Writes `source` to a script file inside `dir` and returns its path.
fn script(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).expect("script is writable");
    path
}

#[test]
fn test_runs_a_script() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(&dir, "add.ka", "print 1 + 2;\n");

    karst()
        .arg(&path)
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn test_script_with_functions_and_closures() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(
        &dir,
        "counter.ka",
        "fun make() { var x = 0; fun inc() { x = x + 1; return x; } return inc; }\n\
         var c = make();\n\
         print c();\n\
         print c();\n",
    );

    karst()
        .arg(&path)
        .assert()
        .success()
        .stdout("1\n2\n");
}

#[test]
fn test_compile_error_exits_65() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(&dir, "broken.ka", "print 1 +;\n");

    karst()
        .arg(&path)
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Expect expression."));
}

#[test]
fn test_runtime_error_exits_70_with_trace() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(
        &dir,
        "boom.ka",
        "fun inner() { return 1 + nil; }\ninner();\n",
    );

    karst()
        .arg(&path)
        .assert()
        .code(70)
        .stderr(
            predicate::str::contains("Operands must be numbers.")
                .and(predicate::str::contains("in inner()"))
                .and(predicate::str::contains("in script")),
        );
}

#[test]
fn test_missing_file_exits_74() {
    karst()
        .arg("does-not-exist.ka")
        .assert()
        .code(74)
        .stderr(predicate::str::contains("could not read script"));
}

#[test]
fn test_usage_error_exits_64() {
    karst()
        .arg("--frobnicate")
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Usage: karst"));

    let dir = TempDir::new().expect("temp dir");
    let a = script(&dir, "a.ka", "print 1;");
    let b = script(&dir, "b.ka", "print 2;");
    karst().arg(&a).arg(&b).assert().code(64);
}

#[test]
fn test_repl_evaluates_lines() {
    karst()
        .write_stdin("print 1 + 2;\nprint \"hi\";\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("3\n").and(predicate::str::contains("hi\n")));
}

#[test]
fn test_repl_keeps_globals_between_lines() {
    karst()
        .write_stdin("var x = 40;\nprint x + 2;\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn test_repl_survives_errors() {
    karst()
        .write_stdin("print oops;\nprint \"recovered\";\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("recovered"))
        .stderr(predicate::str::contains("Undefined variable 'oops'."));
}

#[test]
fn test_stress_gc_flag_preserves_output() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(
        &dir,
        "churn.ka",
        "var last = \"\";\n\
         for (var i = 0; i < 100; i = i + 1) { last = \"a\" + \"b\"; }\n\
         print last;\n",
    );

    karst()
        .arg("--stress-gc")
        .arg(&path)
        .assert()
        .success()
        .stdout("ab\n");
}

#[test]
fn test_log_gc_reports_cycles() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(
        &dir,
        "log.ka",
        "var last = \"\";\n\
         for (var i = 0; i < 50; i = i + 1) { last = \"a\" + \"b\"; }\n",
    );

    karst()
        .arg("--stress-gc")
        .arg("--log-gc")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("[gc] begin").and(predicate::str::contains("[gc] end")));
}

#[test]
fn test_trace_flag_disassembles() {
    let dir = TempDir::new().expect("temp dir");
    let path = script(&dir, "tiny.ka", "print 1;\n");

    karst()
        .arg("--trace")
        .arg(&path)
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("Constant").and(predicate::str::contains("Print")));
}

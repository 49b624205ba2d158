//! Command-line smoke tests.

use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const TRACE: &str = r#"# a.rb:2 calls into b.rb
{"kind":"call","file":"a.rb","line":2,"method":1,"wall_us":0}
{"kind":"c_call","file":"b.rb","line":5,"method":2,"wall_us":1000}
{"kind":"c_return","file":"b.rb","line":5,"method":2,"wall_us":4000}
{"kind":"return","file":"a.rb","line":2,"method":1,"wall_us":10000}
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn lineprof() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("lineprof")
}

#[test]
fn test_replay_table() {
    let trace = write_temp(TRACE);
    lineprof()
        .arg("replay")
        .arg(trace.path())
        .args(["--pattern", "\\.rb$"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Events: 4 | Tracked: 4 | Files: 2"))
        .stdout(predicate::str::contains("a.rb:2"))
        .stdout(predicate::str::contains("b.rb:5"));
}

#[test]
fn test_replay_json() {
    let trace = write_temp(TRACE);
    let output = lineprof()
        .arg("replay")
        .arg(trace.path())
        .args(["--file", "a.rb", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let a = &value["report"]["files"]["a.rb"];
    assert_eq!(a["lines"]["2"]["total"]["wall_time"], 10000);
    assert_eq!(a["summary"]["exclusive"]["wall_time"], 10000);
    assert!(value["report"]["files"].get("b.rb").is_none());
}

#[test]
fn test_replay_csv_min_wall() {
    let trace = write_temp(TRACE);
    lineprof()
        .arg("replay")
        .arg(trace.path())
        .args(["-p", ".", "--csv", "--min-wall", "5ms"])
        .assert()
        .success()
        .stdout("file,line,calls,wall_us,cpu_us,allocs\na.rb,2,1,10000,0,0\n");
}

#[test]
fn test_annotate_source() {
    let trace = write_temp(TRACE);
    let source = write_temp("def run\n  work\nend\n");
    lineprof()
        .arg("annotate")
        .arg(trace.path())
        .arg(source.path())
        .args(["--as", "a.rb"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "     0.0ms +     10.0ms (    1) |   work",
        ))
        .stdout(predicate::str::contains("ms in this file + children"));
}

#[test]
fn test_invalid_pattern_exit_code() {
    let trace = write_temp(TRACE);
    lineprof()
        .arg("replay")
        .arg(trace.path())
        .args(["--pattern", "("])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid selector"));
}

#[test]
fn test_malformed_trace_exit_code() {
    let trace = write_temp("{\"kind\":\"call\"\n");
    lineprof()
        .arg("replay")
        .arg(trace.path())
        .args(["--file", "a.rb"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_mixed_timestamp_trace_exit_code() {
    let trace = write_temp(
        "{\"kind\":\"call\",\"file\":\"a.rb\",\"line\":2,\"wall_us\":0,\"cpu_us\":5}\n\
         {\"kind\":\"return\",\"file\":\"a.rb\",\"line\":2,\"wall_us\":10}\n",
    );
    lineprof()
        .arg("replay")
        .arg(trace.path())
        .args(["--file", "a.rb"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("cpu_us"));
}

#[test]
fn test_missing_trace_exit_code() {
    lineprof()
        .args(["replay", "/nonexistent/trace.jsonl", "--file", "a.rb"])
        .assert()
        .code(4);
}

#[test]
fn test_completions() {
    lineprof()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lineprof"));
}

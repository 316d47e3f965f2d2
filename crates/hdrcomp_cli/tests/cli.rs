//! End-to-end tests for the hdrcomp binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn entry(path: &str, response: bool) -> String {
    entry_for("example.com", path, response)
}

fn entry_for(host: &str, path: &str, response: bool) -> String {
    let response = if response {
        r#","response": {
            "status": 200, "statusText": "OK", "httpVersion": "HTTP/1.1",
            "headers": [{"name": "Content-Type", "value": "text/html"},
                        {"name": "Server", "value": "Apache"}],
            "content": {"size": 5, "mimeType": "text/html", "text": "hello"}
        }"#
    } else {
        ""
    };
    format!(
        r#"{{"request": {{
            "method": "GET", "url": "http://{host}{path}", "httpVersion": "HTTP/1.1",
            "headers": [{{"name": "Host", "value": "{host}"}},
                        {{"name": "Accept", "value": "*/*"}},
                        {{"name": "Cookie", "value": "session-for-{host}"}}]
        }}{response}}}"#
    )
}

fn har(entries: &[String]) -> String {
    format!(r#"{{"log": {{"version": "1.2", "entries": [{}]}}}}"#, entries.join(","))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hdrcomp"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn column(tsv: &str, index: usize) -> Vec<u64> {
    tsv.lines()
        .skip(1)
        .map(|line| line.split('\t').nth(index).unwrap().parse().unwrap())
        .collect()
}

fn increments(totals: &[u64]) -> Vec<u64> {
    let mut previous = 0;
    totals
        .iter()
        .map(|&t| {
            let cost = t - previous;
            previous = t;
            cost
        })
        .collect()
}

#[test]
fn test_identical_requests_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let entries: Vec<String> = (0..3).map(|_| entry("/", false)).collect();
    fs::write(dir.path().join("s.har"), har(&entries)).unwrap();

    let out = run(dir.path(), &["s.har", "-t", "-c", "http1_gzip", "-c", "delta"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let req = fs::read_to_string(dir.path().join("req.tsv")).unwrap();
    let res = fs::read_to_string(dir.path().join("res.tsv")).unwrap();
    assert_eq!(req.lines().next().unwrap(), "num\thttp1_gzip\tdelta");
    assert_eq!(res, "num\thttp1_gzip\tdelta\n");
    assert_eq!(req.lines().count(), 4);

    let nums = column(&req, 0);
    assert_eq!(nums, vec![0, 1, 2]);

    let gzip = increments(&column(&req, 1));
    assert!(gzip.iter().all(|&c| c == gzip[0] && c > 0));

    let delta = increments(&column(&req, 2));
    assert_eq!(delta[0], gzip[0]);
    assert!(delta[1..].iter().all(|&c| c <= delta[0]));
}

#[test]
fn test_unknown_scheme_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("s.har"), har(&[entry("/", true)])).unwrap();

    let out = run(dir.path(), &["s.har", "-c", "not_a_real_scheme"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not_a_real_scheme"));
    assert!(!dir.path().join("req.tsv").exists());
    assert!(!dir.path().join("res.tsv").exists());
}

#[test]
fn test_unknown_scheme_checked_before_capture() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(dir.path(), &["missing.har", "-c", "bogus"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown scheme"));
}

#[test]
fn test_missing_capture_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(dir.path(), &["missing.har", "-c", "spdy3"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("missing.har"));
    assert!(!dir.path().join("req.tsv").exists());
}

#[test]
fn test_decode_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let bad = r#"{"request": {"method": "GET", "url": "http://example.com/",
        "headers": [{"name": "X-Bad", "value": "a\r\nb"}]}}"#
        .to_string();
    fs::write(dir.path().join("s.har"), har(&[entry("/", true), bad])).unwrap();

    let out = run(dir.path(), &["s.har", "-c", "http1_gzip", "-c", "spdy3"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Decode failure"));
    assert!(!dir.path().join("req.tsv").exists());
    assert!(!dir.path().join("res.tsv").exists());
}

#[test]
fn test_prefix_and_column_order() {
    let dir = tempfile::tempdir().unwrap();
    let entries = vec![entry("/", true), entry("/a.css", false), entry("/b.js", true)];
    fs::write(dir.path().join("s.har"), har(&entries)).unwrap();

    let out = run(
        dir.path(),
        &["s.har", "-c", "delta", "-c", "spdy3", "-c", "http1_gzip", "--prefix", "run1_"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let req = fs::read_to_string(dir.path().join("run1_req.tsv")).unwrap();
    let res = fs::read_to_string(dir.path().join("run1_res.tsv")).unwrap();
    assert_eq!(req.lines().next().unwrap(), "num\tdelta\tspdy3\thttp1_gzip");
    assert_eq!(req.lines().count(), 4);
    // the exchange without a response leaves no gap
    assert_eq!(column(&res, 0), vec![0, 1]);

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("3 req messages processed"));
    assert!(stdout.contains("2 res messages processed"));
}

#[test]
fn test_output_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let entries = vec![entry("/", true), entry("/x", true), entry("/", true)];
    fs::write(dir.path().join("s.har"), har(&entries)).unwrap();
    let args = ["s.har", "-c", "http1_gzip", "-c", "spdy3", "-c", "delta"];

    assert!(run(dir.path(), &args).status.success());
    let first = fs::read(dir.path().join("req.tsv")).unwrap();
    assert!(run(dir.path(), &args).status.success());
    let second = fs::read(dir.path().join("req.tsv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_baseline_must_be_selected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("s.har"), har(&[entry("/", true)])).unwrap();
    let out = run(dir.path(), &["s.har", "-c", "http1_gzip", "-b", "delta"]);
    assert!(!out.status.success());
    assert!(!dir.path().join("req.tsv").exists());
}

#[test]
fn test_directory_at_output_path_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("s.har"), har(&[entry("/", true)])).unwrap();
    fs::create_dir(dir.path().join("res.tsv")).unwrap();

    let out = run(dir.path(), &["s.har", "-c", "http1_gzip"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("res.tsv"));
    assert!(!dir.path().join("req.tsv").exists());
}

fn last_total(tsv: &str, index: usize) -> u64 {
    *column(tsv, index).last().unwrap()
}

#[test]
fn test_per_host_connections() {
    let dir = tempfile::tempdir().unwrap();
    let entries = vec![
        entry_for("www.example.com", "/", true),
        entry_for("static.cdn-provider.net", "/app.js", true),
        entry_for("www.example.com", "/", true),
        entry_for("static.cdn-provider.net", "/app.js", true),
    ];
    fs::write(dir.path().join("s.har"), har(&entries)).unwrap();
    let schemes = ["s.har", "-c", "http1_gzip", "-c", "delta"];

    let out = run(dir.path(), &schemes);
    assert!(out.status.success());
    let shared = fs::read_to_string(dir.path().join("req.tsv")).unwrap();

    let args: Vec<&str> = schemes.iter().copied().chain(["--per-host"]).collect();
    let out = run(dir.path(), &args);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("2 connections simulated"));
    let split = fs::read_to_string(dir.path().join("req.tsv")).unwrap();

    assert_eq!(split.lines().next().unwrap(), "num\thttp1_gzip\tdelta");
    assert_eq!(last_total(&shared, 1), last_total(&split, 1));
    // repeats diff against their own host's previous request
    let split_delta = increments(&column(&split, 2));
    let shared_delta = increments(&column(&shared, 2));
    assert!(split_delta[2] < shared_delta[2]);
    assert!(split_delta[3] < shared_delta[3]);

    let args: Vec<&str> = schemes.iter().copied().chain(["-m", "*"]).collect();
    assert!(run(dir.path(), &args).status.success());
    let multiplexed = fs::read_to_string(dir.path().join("req.tsv")).unwrap();
    assert_eq!(multiplexed, shared);
}

#[test]
fn test_invalid_multiplex_pattern() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("s.har"), har(&[entry("/", true)])).unwrap();
    let out = run(dir.path(), &["s.har", "-c", "spdy3", "-m", "a\\.(b"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid host pattern"));
    assert!(!dir.path().join("req.tsv").exists());
}

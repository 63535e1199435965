//! End-to-end tests for `hostexec run`.
//!
//! The SSH client is replaced by a shell script that drops every option up
//! to `--`, drops the destination, and runs the remote command locally.

#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_SSH: &str = r#"#!/bin/sh
while [ "$#" -gt 0 ] && [ "$1" != "--" ]; do shift; done
shift
shift
exec sh -c "$*"
"#;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let ssh = dir.path().join("fake-ssh");
        std::fs::write(&ssh, FAKE_SSH).expect("write fake ssh");
        std::fs::set_permissions(&ssh, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        std::fs::write(
            dir.path().join("config.yaml"),
            format!(
                "ssh:\n  program: {}\nreadiness:\n  command: \"true\"\n  interval_secs: 1\n  deadline_secs: 5\n",
                ssh.display()
            ),
        )
        .expect("write settings");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn request(&self, body: &str) -> PathBuf {
        let path = self.path("request.yaml");
        std::fs::write(
            &path,
            format!("host: 127.0.0.1\nuser: tester\nagent: true\n{body}"),
        )
        .expect("write request");
        path
    }

    fn hostexec(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hostexec"));
        cmd.env("NO_COLOR", "1")
            .env("HOSTEXEC_CONFIG", self.path("config.yaml"))
            .env_remove("HOSTEXEC_BASTION_HOST")
            .env_remove("HOSTEXEC_DEBUG_LOG");
        for var in hostexec::infra::proxy::PROXY_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd
    }
}

fn show(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn test_run_uploads_file_and_publishes_last_stdout() {
    let sandbox = Sandbox::new();
    let greeting = sandbox.path("greeting.txt");
    let request = sandbox.request(&format!(
        "files:\n  - content: hello\n    destination: \"{}\"\n    permissions: \"0600\"\ncommands:\n  - cat \"{}\"\n  - echo B\n",
        show(&greeting),
        show(&greeting),
    ));

    let output = sandbox
        .hostexec()
        .args(["run", &show(&request), "--json"])
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["result"], "B\n");
    assert_eq!(value["files"], 1);
    assert_eq!(value["commands"], 2);
    assert!(value["id"].as_str().is_some_and(|id| id.len() == 36));

    assert_eq!(std::fs::read_to_string(&greeting).expect("uploaded"), "hello");
    let mode = std::fs::metadata(&greeting).expect("meta").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_run_quiet_prints_only_the_result() {
    let sandbox = Sandbox::new();
    let request = sandbox.request("commands:\n  - echo A\n  - printf done\n");
    sandbox
        .hostexec()
        .args(["run", &show(&request), "--quiet"])
        .assert()
        .success()
        .stdout("done");
}

#[test]
fn test_run_stops_at_first_failing_command() {
    let sandbox = Sandbox::new();
    let marker = sandbox.path("after");
    let request = sandbox.request(&format!(
        "commands:\n  - echo A\n  - \"false\"\n  - touch \"{}\"\n",
        show(&marker)
    ));

    sandbox
        .hostexec()
        .args(["run", &show(&request)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("command [false]"))
        .stderr(predicate::str::contains("exited with status 1"));
    assert!(!marker.exists(), "commands after a failure must not run");
}

#[test]
fn test_run_relative_source_resolves_next_to_request() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.path("app.conf"), "port=8080\n").expect("write source");
    let dest = sandbox.path("deployed.conf");
    let request = sandbox.request(&format!(
        "files:\n  - source: app.conf\n    destination: \"{}\"\n",
        show(&dest)
    ));

    sandbox
        .hostexec()
        .args(["run", &show(&request), "--quiet"])
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&dest).expect("deployed"), "port=8080\n");
}

#[test]
fn test_run_writes_record_with_triggers() {
    let sandbox = Sandbox::new();
    let record = sandbox.path("out/record.json");
    let request = sandbox.request("triggers:\n  build: \"42\"\ncommands:\n  - echo ok\n");

    sandbox
        .hostexec()
        .args(["run", &show(&request), "--quiet", "--record", &show(&record)])
        .assert()
        .success();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&record).expect("record")).expect("json");
    assert_eq!(value["result"], "ok\n");
    assert_eq!(value["triggers"]["build"], "42");
    assert!(value["created_at"].is_string());
}

#[test]
fn test_run_readiness_timeout_runs_no_commands() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.path("config.yaml"),
        format!(
            "ssh:\n  program: {}\nreadiness:\n  command: \"false\"\n  interval_secs: 1\n  deadline_secs: 2\n",
            show(&sandbox.path("fake-ssh"))
        ),
    )
    .expect("write settings");
    let marker = sandbox.path("ran");
    let request = sandbox.request(&format!("commands:\n  - touch \"{}\"\n", show(&marker)));

    let output = sandbox
        .hostexec()
        .args(["run", &show(&request), "--json"])
        .output()
        .expect("run");
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["code"], "readiness");
    assert!(!marker.exists());
}

#[test]
fn test_run_nothing_declared_succeeds_without_connecting() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.path("config.yaml"),
        "ssh:\n  program: /nonexistent/ssh\n",
    )
    .expect("write settings");
    let request = sandbox.request("");
    sandbox
        .hostexec()
        .args(["run", &show(&request), "--quiet"])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_run_unwritable_record_fails_before_any_command() {
    let sandbox = Sandbox::new();
    let blocker = sandbox.path("blocker");
    std::fs::write(&blocker, "not a directory").expect("write blocker");
    let marker = sandbox.path("ran");
    let request = sandbox.request(&format!("commands:\n  - touch \"{}\"\n", show(&marker)));

    let output = sandbox
        .hostexec()
        .args(["run", &show(&request), "--json", "--record"])
        .arg(blocker.join("record.json"))
        .output()
        .expect("run");
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert!(
        value["message"]
            .as_str()
            .expect("message")
            .contains("cannot write run record")
    );
    assert!(!marker.exists(), "no command may run when the record cannot be written");
}

#[test]
fn test_run_record_save_failure_still_reports_outcome() {
    let sandbox = Sandbox::new();
    let record = sandbox.path("record.json");
    // The command puts a directory where the record should go.
    let request = sandbox.request(&format!(
        "commands:\n  - mkdir \"{}\"\n  - echo done\n",
        show(&record)
    ));

    let output = sandbox
        .hostexec()
        .args(["run", &show(&request), "--json", "--record", &show(&record)])
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["result"], "done\n");
    assert!(value["id"].as_str().is_some_and(|id| id.len() == 36));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("cannot write run record"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_http_connect_bridges_stdio_through_proxy() {
    use std::io::{Read, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let proxy = std::thread::spawn(move || {
        let (mut conn, _) = listener.accept().expect("accept");
        let mut head = Vec::new();
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            conn.read_exact(&mut byte).expect("read request");
            head.push(byte[0]);
        }
        conn.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
            .expect("write status");
        let mut ping = [0u8; 4];
        conn.read_exact(&mut ping).expect("read payload");
        conn.write_all(b"pong").expect("write payload");
        (String::from_utf8_lossy(&head).into_owned(), ping)
    });

    let sandbox = Sandbox::new();
    sandbox
        .hostexec()
        .env("HTTPS_PROXY", format!("http://{addr}"))
        .args(["_http-connect", "10.0.0.5", "22"])
        .write_stdin("ping")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout("pong");

    let (head, ping) = proxy.join().expect("proxy thread");
    assert!(head.starts_with("CONNECT 10.0.0.5:22 HTTP/1.1\r\n"), "got: {head}");
    assert_eq!(&ping, b"ping");
}

#[test]
fn test_http_connect_without_proxy_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .hostexec()
        .args(["_http-connect", "10.0.0.5", "22"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTPS_PROXY"));
}

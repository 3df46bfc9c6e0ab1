use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;

use assert_cmd::prelude::*;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn scenesync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scenesync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_json(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).expect("write fixture");
    path
}

const ROOM: &str = "https://cdn/room.jpg";

fn baseline_with_sofa(dir: &TempDir) -> PathBuf {
    write_json(
        dir,
        "baseline.json",
        r#"{"image": "https://cdn/render-1.png", "items": [{"id": 1, "name": "Sofa"}]}"#,
    )
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

#[test]
fn classify_without_baseline_is_initial() {
    let home = TempDir::new().expect("home");
    let current = write_json(&home, "current.json", r#"[{"id": 1, "name": "Sofa"}]"#);

    scenesync_cmd(home.path())
        .args(["classify", "--current"])
        .arg(&current)
        .assert()
        .success()
        .stdout(contains("INITIAL"));
}

#[test]
fn classify_json_lists_items_to_add() {
    let home = TempDir::new().expect("home");
    let current = write_json(
        &home,
        "current.json",
        r#"[{"id": 1, "name": "Sofa"}, {"id": "2", "name": "Lamp", "quantity": 2}]"#,
    );
    let baseline = baseline_with_sofa(&home);

    let assert = scenesync_cmd(home.path())
        .args(["classify", "--json", "--current"])
        .arg(&current)
        .arg("--baseline")
        .arg(&baseline)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(value["kind"], "additive");
    assert_eq!(value["items_to_add"][0]["id"], "2");
    assert_eq!(value["items_to_add"][0]["quantity"], 2);
}

#[test]
fn classify_rejects_malformed_scene() {
    let home = TempDir::new().expect("home");
    let current = write_json(&home, "current.json", r#"{"not": "a list"}"#);

    scenesync_cmd(home.path())
        .args(["classify", "--current"])
        .arg(&current)
        .assert()
        .failure()
        .stderr(contains("not a JSON list of placed items"));
}

// ---------------------------------------------------------------------------
// plan / status
// ---------------------------------------------------------------------------

#[test]
fn plan_prints_incremental_request() {
    let home = TempDir::new().expect("home");
    let current = write_json(
        &home,
        "current.json",
        r#"[{"id": 1, "name": "Sofa"}, {"id": 2, "name": "Lamp"}]"#,
    );
    let baseline = baseline_with_sofa(&home);

    scenesync_cmd(home.path())
        .args(["plan", "--room", ROOM, "--session", "s-9", "--current"])
        .arg(&current)
        .arg("--baseline")
        .arg(&baseline)
        .assert()
        .success()
        .stdout(
            contains(r#""mode": "incremental""#)
                .and(contains(r#""baseImage": "https://cdn/render-1.png""#))
                .and(contains(r#""sessionId": "s-9""#)),
        );
}

#[test]
fn plan_for_unchanged_scene_sends_nothing() {
    let home = TempDir::new().expect("home");
    let current = write_json(&home, "current.json", r#"[{"id": "1", "name": "Sofa"}]"#);
    let baseline = baseline_with_sofa(&home);

    scenesync_cmd(home.path())
        .args(["plan", "--room", ROOM, "--current"])
        .arg(&current)
        .arg("--baseline")
        .arg(&baseline)
        .assert()
        .success()
        .stdout(contains("Nothing to render"));
}

#[test]
fn plan_without_items_fails_validation() {
    let home = TempDir::new().expect("home");
    let current = write_json(&home, "current.json", "[]");

    scenesync_cmd(home.path())
        .args(["plan", "--room", ROOM, "--current"])
        .arg(&current)
        .assert()
        .failure()
        .stderr(contains("Add at least one product"));
}

#[test]
fn status_json_reports_readiness() {
    let home = TempDir::new().expect("home");
    let current = write_json(&home, "current.json", r#"[{"id": 1, "name": "Sofa", "quantity": 3}]"#);
    let baseline = baseline_with_sofa(&home);

    let assert = scenesync_cmd(home.path())
        .args(["status", "--json", "--room", ROOM, "--current"])
        .arg(&current)
        .arg("--baseline")
        .arg(&baseline)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(value["readiness"], "ready_to_render");
    assert_eq!(value["descriptor"], "additive");
    assert_eq!(value["products"][0]["change"], "+2");
}

#[test]
fn status_without_room_is_not_ready() {
    let home = TempDir::new().expect("home");
    let current = write_json(&home, "current.json", r#"[{"id": 1, "name": "Sofa"}]"#);

    scenesync_cmd(home.path())
        .args(["status", "--current"])
        .arg(&current)
        .assert()
        .success()
        .stdout(contains("NOT READY").and(contains("Sofa")));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_init_then_show() {
    let home = TempDir::new().expect("home");

    scenesync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(contains("config.yaml"));
    assert!(home.path().join(".scenesync").join("config.yaml").exists());

    scenesync_cmd(home.path())
        .args(["config", "init"])
        .assert()
        .failure();

    scenesync_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("history_capacity: 50").and(contains("overlap: reject")));
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

/// Answer exactly one request with `body` and hand back the raw request.
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).expect("write");
        String::from_utf8_lossy(&buf).into_owned()
    });
    (format!("http://{addr}/api"), handle)
}

fn write_config(home: &TempDir, base_url: &str) {
    let dir = home.path().join(".scenesync");
    fs::create_dir_all(&dir).expect("config dir");
    fs::write(
        dir.join("config.yaml"),
        format!("renderer:\n  base_url: {base_url}\nrender_retry:\n  max_retries: 0\n  timeout_ms: 5000\n"),
    )
    .expect("write config");
}

#[test]
fn render_writes_new_baseline() {
    let home = TempDir::new().expect("home");
    let (base_url, server) = serve_once("200 OK", r#"{"renderedImage": "https://cdn/render-2.png"}"#);
    write_config(&home, &base_url);

    let current = write_json(
        &home,
        "current.json",
        r#"[{"id": 1, "name": "Sofa"}, {"id": 2, "name": "Lamp"}]"#,
    );
    let baseline = baseline_with_sofa(&home);
    let out = home.path().join("next.json");

    scenesync_cmd(home.path())
        .args(["render", "--room", ROOM, "--current"])
        .arg(&current)
        .arg("--baseline")
        .arg(&baseline)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("https://cdn/render-2.png"));

    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /api/render"), "got: {request}");
    assert!(request.contains(r#""mode":"incremental""#), "got: {request}");

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read out")).expect("baseline json");
    assert_eq!(written["image"], "https://cdn/render-2.png");
    assert_eq!(written["items"].as_array().map(Vec::len), Some(2));
}

#[test]
fn render_surfaces_rejection_detail() {
    let home = TempDir::new().expect("home");
    let (base_url, server) = serve_once("422 Unprocessable Entity", r#"{"detail": "room photo too small"}"#);
    write_config(&home, &base_url);
    let current = write_json(&home, "current.json", r#"[{"id": 1, "name": "Sofa"}]"#);

    scenesync_cmd(home.path())
        .args(["render", "--room", ROOM, "--current"])
        .arg(&current)
        .assert()
        .failure()
        .stderr(contains("room photo too small"));
    server.join().expect("server thread");
}

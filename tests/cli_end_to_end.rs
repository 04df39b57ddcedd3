use std::fs;
use std::path::Path;

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use tempfile::TempDir;

const CATALOG_JSON: &str = r#"{"anycubic_m3":{"name":"Anycubic","web_name":"Photon M3","x":0,"y":0,"w":4096,"h":2560,"d_x":0,"d_y":0}}"#;

fn gerber2png(workdir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gerber2png"));
    cmd.current_dir(workdir)
        .env_remove("RUST_LOG")
        .env_remove("GERBER2PNG_CONFIG_FILE")
        .arg("--preferences-file")
        .arg(workdir.join("preferences.json"));
    cmd
}

fn workdir_with_inputs() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("board.gbr"), vec![b'G'; 2048]).expect("gerber");
    fs::write(dir.path().join("board.drl"), vec![b'D'; 512]).expect("drill");
    dir
}

fn mock_catalog(server: &MockServer) {
    server.mock(|when, then| {
        when.method("GET").path("/api/printers");
        then.status(200)
            .header("content-type", "application/json")
            .body(CATALOG_JSON);
    });
}

#[test]
fn printers_lists_the_catalog_and_marks_the_selection() {
    let server = MockServer::start();
    mock_catalog(&server);
    let dir = tempfile::tempdir().expect("tempdir");

    let assert = gerber2png(dir.path())
        .arg("--api-url")
        .arg(server.base_url())
        .arg("printers")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"id\": \"anycubic_m3\""));
    assert!(output.contains("\"web_name\": \"Photon M3\""));
    assert!(output.contains("\"selected\": \"anycubic_m3\""));
}

#[test]
fn convert_writes_the_rendered_image() {
    let server = MockServer::start();
    mock_catalog(&server);
    let convert = server.mock(|when, then| {
        when.method("POST")
            .path("/api/convert")
            .body_includes("name=\"flip_vertical\"\r\n\r\ntrue");
        then.status(200)
            .header("content-type", "image/png")
            .body(b"\x89PNG-bytes".as_slice());
    });
    let dir = workdir_with_inputs();

    gerber2png(dir.path())
        .arg("--api-url")
        .arg(server.base_url())
        .arg("convert")
        .arg("--gerber")
        .arg("board.gbr")
        .arg("--drill")
        .arg("board.drl")
        .arg("--flip-vertical")
        .arg("true")
        .arg("--output")
        .arg("renders")
        .assert()
        .success()
        .stdout(contains("board.png"));

    convert.assert();
    let written = fs::read(dir.path().join("renders").join("board.png")).expect("image saved");
    assert_eq!(written, b"\x89PNG-bytes");
}

#[test]
fn convert_reports_the_server_detail() {
    let server = MockServer::start();
    mock_catalog(&server);
    server.mock(|when, then| {
        when.method("POST").path("/api/convert");
        then.status(422)
            .header("content-type", "application/json")
            .body(r#"{"detail":"unsupported drill format"}"#);
    });
    let dir = workdir_with_inputs();

    gerber2png(dir.path())
        .arg("--api-url")
        .arg(server.base_url())
        .arg("convert")
        .arg("--gerber")
        .arg("board.gbr")
        .arg("--drill")
        .arg("board.drl")
        .assert()
        .failure()
        .stderr(contains("unsupported drill format"));
}

#[test]
fn unreadable_input_fails_before_any_request() {
    let server = MockServer::start();
    let convert = server.mock(|when, then| {
        when.method("POST").path("/api/convert");
        then.status(200).body("unused");
    });
    let dir = tempfile::tempdir().expect("tempdir");

    gerber2png(dir.path())
        .arg("--api-url")
        .arg(server.base_url())
        .arg("convert")
        .arg("--gerber")
        .arg("missing.gbr")
        .arg("--drill")
        .arg("missing.drl")
        .assert()
        .failure()
        .stderr(contains("Error loading files."));

    convert.assert_calls(0);
}

#[test]
fn select_and_flip_are_remembered() {
    let dir = tempfile::tempdir().expect("tempdir");

    gerber2png(dir.path())
        .arg("select")
        .arg("elegoo_mars")
        .assert()
        .success();
    gerber2png(dir.path())
        .arg("flip")
        .arg("--horizontal")
        .arg("true")
        .assert()
        .success()
        .stdout(contains("\"flip_horizontal\": true"))
        .stdout(contains("\"flip_vertical\": false"));

    let raw = fs::read_to_string(dir.path().join("preferences.json")).expect("preferences");
    let stored: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(stored["selectedPrinter"], "elegoo_mars");
    assert_eq!(stored["flipX"], "true");
}

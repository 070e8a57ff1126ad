//! Integration tests for the `iotas-bridge` binary.
//!
//! Argument parsing, completions and config errors run without a
//! network; the account-bound commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the binary with env isolation.
///
/// Clears all `IOTAS_*` env vars and points the platform directories at
/// `home` so tests never touch the user's real configuration.
fn bridge_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("iotas-bridge");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("IOTAS_PROFILE")
        .env_remove("IOTAS_CONFIG")
        .env_remove("IOTAS_OUTPUT")
        .env_remove("IOTAS_USERNAME")
        .env_remove("IOTAS_PASSWORD")
        .env_remove("IOTAS_UNIT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a single-profile config pointing at `base_url`.
fn write_config(dir: &Path, base_url: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "default_profile = \"home\"\n\n\
             [profiles.home]\n\
             username = \"resident@example.com\"\n\
             base_url = \"{base_url}\"\n"
        ),
    )
    .unwrap();
    path
}

/// Unsigned JWT expiring in 2100.
const JWT: &str = "eyJhbGciOiJIUzI1NiJ9.eyJleHAiOjQxMDI0NDQ4MDB9.c2ln";

async fn mock_account(server: &MockServer) {
    mock_session(server).await;
    mock_rooms(server, porch_rooms()).await;
}

/// Password grant, account and a single residency for unit 501.
async fn mock_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/tokenwithrefresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "jwt": JWT, "refresh": "r1" })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/account/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 11 })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/account/11/residency"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "unit": 501, "unitName": "Apt 501" }
        ])))
        .mount(server)
        .await;
}

async fn mock_rooms(server: &MockServer, rooms: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/unit/501/rooms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rooms))
        .mount(server)
        .await;
}

fn porch_rooms() -> serde_json::Value {
    json!([{
        "id": 1,
        "unit": 501,
        "name": "Porch",
        "devices": [
            {
                "id": 10,
                "room": 1,
                "name": "Lamp",
                "category": "light",
                "features": [{
                    "id": 100,
                    "device": 10,
                    "eventTypeName": "OnOff",
                    "featureTypeName": "Light",
                    "featureTypeCategory": "light",
                    "featureTypeSettable": true,
                    "name": "Light",
                    "value": 1
                }]
            },
            {
                "id": 20,
                "room": 1,
                "name": "Door Sensor",
                "category": "sensor",
                "features": [{
                    "id": 200,
                    "device": 20,
                    "eventTypeName": "Contact",
                    "featureTypeName": "Contact",
                    "featureTypeCategory": "contact",
                    "featureTypeSettable": false,
                    "value": 0
                }]
            }
        ]
    }])
}

fn thermostat_feature(
    id: u64,
    event: &str,
    type_name: &str,
    category: &str,
    settable: bool,
    value: f64,
) -> serde_json::Value {
    json!({
        "id": id,
        "device": 30,
        "eventTypeName": event,
        "featureTypeName": type_name,
        "featureTypeCategory": category,
        "featureTypeSettable": settable,
        "name": type_name,
        "value": value
    })
}

fn hallway_rooms() -> serde_json::Value {
    let feature = thermostat_feature;
    let mut mode = feature(303, "ThermostatMode", "Thermostat Mode", "thermostat_mode", true, 1.0);
    mode["values"] = json!("Off:Heat:Cool:Auto");
    json!([{
        "id": 2,
        "unit": 501,
        "name": "Hallway",
        "devices": [{
            "id": 30,
            "room": 2,
            "name": "Thermostat",
            "category": "thermostat",
            "features": [
                feature(300, "Temperature", "Temperature", "current_temperature", false, 71.6),
                feature(301, "Temperature", "Heat Set Point", "heat_set_point", true, 68.0),
                feature(302, "Temperature", "Cool Set Point", "cool_set_point", true, 77.0),
                mode,
                feature(304, "Level", "Battery", "battery", false, 88.0)
            ]
        }]
    }])
}

/// Run a prepared command off the async runtime so the mock server keeps
/// serving while the binary blocks.
async fn output_of(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = bridge_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    bridge_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("IOTAS")
            .and(predicate::str::contains("run"))
            .and(predicate::str::contains("sync"))
            .and(predicate::str::contains("devices")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    bridge_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("iotas-bridge"));
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    bridge_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_unknown_characteristic_is_rejected_before_connecting() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9/api/v1");
    let output = bridge_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["read", "Porch Lamp", "hue"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown characteristic"));
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_missing_profile_exits_with_usage_code() {
    let home = tempfile::tempdir().unwrap();
    let output = bridge_cmd(home.path())
        .arg("--config")
        .arg(home.path().join("absent.toml"))
        .args(["devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("not found in configuration"), "{text}");
}

#[test]
fn test_missing_password_exits_with_auth_code() {
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9/api/v1");
    let output = bridge_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["devices", "list"])
        .output()
        .unwrap();
    // The keyring may be unavailable in CI, either way no password resolves.
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[test]
fn test_config_path_honours_flag() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("custom.toml");
    bridge_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_hides_plaintext_password() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(
        &config,
        "[profiles.default]\nusername = \"me@example.com\"\npassword = \"hunter2\"\n",
    )
    .unwrap();
    bridge_cmd(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("me@example.com")
                .and(predicate::str::contains("hunter2").not()),
        );
}

// ── Account-bound commands (wiremock) ───────────────────────────────

#[tokio::test]
async fn test_devices_list_shows_mapped_devices() {
    let server = MockServer::start().await;
    mock_account(&server).await;
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &format!("{}/api/v1", server.uri()));

    let mut cmd = bridge_cmd(home.path());
    cmd.env("IOTAS_PASSWORD", "hunter2")
        .arg("--config")
        .arg(&config)
        .args(["devices", "list", "-o", "json"]);
    let output = output_of(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 1, "sensor without usable features is hidden");
    assert_eq!(devices[0]["name"], "Lamp");
    assert_eq!(devices[0]["services"], json!(["Switch"]));
    assert_eq!(devices[0]["characteristics"], json!(["on"]));
}

#[tokio::test]
async fn test_sync_persists_cache_and_is_idempotent() {
    let server = MockServer::start().await;
    mock_account(&server).await;
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &format!("{}/api/v1", server.uri()));
    let cache = home.path().join("accessories.json");

    let sync = |quiet: bool| {
        let mut cmd = bridge_cmd(home.path());
        cmd.env("IOTAS_PASSWORD", "hunter2")
            .arg("--config")
            .arg(&config)
            .args(["sync", "-o", "json", "--cache"])
            .arg(&cache);
        if quiet {
            cmd.arg("-q");
        }
        cmd
    };

    let first = output_of(sync(false)).await;
    assert!(first.status.success(), "{}", combined_output(&first));
    let changes: serde_json::Value = serde_json::from_slice(&first.stdout).unwrap();
    assert_eq!(changes[0]["action"], "added");
    assert_eq!(changes[0]["name"], "Porch Lamp");

    let cached: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(cached["accessories"].as_array().unwrap().len(), 1);

    let second = output_of(sync(false)).await;
    assert!(second.status.success(), "{}", combined_output(&second));
    let changes: serde_json::Value = serde_json::from_slice(&second.stdout).unwrap();
    assert_eq!(changes[0]["action"], "updated");
    assert!(String::from_utf8_lossy(&second.stderr).contains("0 added"));
}

#[tokio::test]
async fn test_read_and_write_switch() {
    let server = MockServer::start().await;
    mock_account(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/feature/100"))
        .and(body_json(json!({ "value": 0.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 100 })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &format!("{}/api/v1", server.uri()));

    let mut read = bridge_cmd(home.path());
    read.env("IOTAS_PASSWORD", "hunter2")
        .arg("--config")
        .arg(&config)
        .args(["read", "porch lamp", "on", "-o", "plain"]);
    let output = output_of(read).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "on");

    let mut write = bridge_cmd(home.path());
    write
        .env("IOTAS_PASSWORD", "hunter2")
        .arg("--config")
        .arg(&config)
        .args(["write", "10", "on", "off"]);
    let output = output_of(write).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Porch Lamp on set to off"));
}

#[tokio::test]
async fn test_unknown_accessory_exits_not_found() {
    let server = MockServer::start().await;
    mock_account(&server).await;
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &format!("{}/api/v1", server.uri()));

    let mut cmd = bridge_cmd(home.path());
    cmd.env("IOTAS_PASSWORD", "hunter2")
        .arg("--config")
        .arg(&config)
        .args(["read", "Garage", "on"]);
    let output = output_of(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test]
async fn test_thermostat_thresholds_and_battery() {
    let server = MockServer::start().await;
    mock_session(&server).await;
    mock_rooms(&server, hallway_rooms()).await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/feature/301"))
        .and(body_json(json!({ "value": 59.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 301 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/feature/302"))
        .and(body_json(json!({ "value": 86.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 302 })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &format!("{}/api/v1", server.uri()));

    for (characteristic, expected) in [
        ("heating-threshold-temperature", "20"),
        ("cooling-threshold-temperature", "25"),
        ("battery-level", "88"),
    ] {
        let mut read = bridge_cmd(home.path());
        read.env("IOTAS_PASSWORD", "hunter2")
            .arg("--config")
            .arg(&config)
            .args(["read", "hallway thermostat", characteristic, "-o", "plain"]);
        let output = output_of(read).await;
        assert!(output.status.success(), "{}", combined_output(&output));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), expected, "{characteristic}");
    }

    for (characteristic, celsius) in [
        ("heating-threshold-temperature", "15"),
        ("cooling-threshold-temperature", "30"),
    ] {
        let mut write = bridge_cmd(home.path());
        write
            .env("IOTAS_PASSWORD", "hunter2")
            .arg("--config")
            .arg(&config)
            .args(["write", "30", characteristic, celsius]);
        let output = output_of(write).await;
        assert!(output.status.success(), "{}", combined_output(&output));
    }

    let mut battery = bridge_cmd(home.path());
    battery
        .env("IOTAS_PASSWORD", "hunter2")
        .arg("--config")
        .arg(&config)
        .args(["write", "30", "battery-level", "50"]);
    let output = output_of(battery).await;
    assert!(!output.status.success(), "{}", combined_output(&output));
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn zerobite(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("zerobite").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("ZEROBITE_API_URL")
        .env_remove("ZEROBITE_APP_ORIGIN")
        .env_remove("ZEROBITE_TIMEOUT_SECS")
        .env_remove("ZEROBITE_ENV")
        .env_remove("RUST_LOG")
        .env("ZEROBITE_CREDENTIALS_PATH", dir.path().join("credentials.json"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("request"));
}

#[test]
fn test_whoami_without_session() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_whoami_json_reads_stored_profile() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("credentials.json"),
        r#"{"access":"A1","refresh":"R1","user":"{\"username\":\"ngo1\",\"role\":\"ngo\"}"}"#,
    )
    .unwrap();

    zerobite(&dir)
        .args(["--format", "json", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signed_in\": true"))
        .stdout(predicate::str::contains("ngo1"));
}

#[test]
fn test_logout_clears_stored_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, r#"{"access":"A1","refresh":"R1"}"#).unwrap();

    zerobite(&dir)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    let stored = std::fs::read_to_string(&path).unwrap();
    assert!(!stored.contains("A1"));
    assert!(!stored.contains("R1"));
}

#[test]
fn test_missing_config_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .args(["--config", "nope.toml", "whoami"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_config_file_is_applied() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("zerobite.toml"),
        "[api]\nurl = \"not a url\"\n",
    )
    .unwrap();

    zerobite(&dir).arg("whoami").assert().code(3);
}

#[test]
fn test_request_rejects_bad_header() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .args(["request", "GET", "donations/", "-H", "no-colon"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Name: value"));
}

#[test]
fn test_request_rejects_invalid_json_body() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .args(["request", "POST", "donations/", "--data", "{oops"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--data must be valid JSON"));
}

#[test]
fn test_login_against_unreachable_backend_fails() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .env("ZEROBITE_API_URL", "http://127.0.0.1:9/api")
        .env("ZEROBITE_TIMEOUT_SECS", "2")
        .args(["login", "donor1", "--password", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_json_error_report_for_missing_config() {
    let dir = TempDir::new().unwrap();
    zerobite(&dir)
        .args(["--format", "json", "--config", "nope.toml", "whoami"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("\"code_str\":\"E3001\""));
}

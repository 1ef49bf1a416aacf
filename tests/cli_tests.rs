//! Binary surface checks via `assert_cmd`.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn volmargin() -> Command {
    Command::cargo_bin("volmargin").unwrap()
}

fn minimal_config() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[logging]\nlevel = \"error\"\n").unwrap();
    file
}

#[test]
fn help_lists_subcommands() {
    volmargin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("quote"))
        .stdout(predicate::str::contains("trade"))
        .stdout(predicate::str::contains("scan"));
}

#[test]
fn missing_config_exits_nonzero() {
    volmargin()
        .args(["--config", "/nonexistent/volmargin.toml", "quote"])
        .args(["--asset", "btc", "--notional", "650"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn quote_prints_a_margin_quote() {
    let config = minimal_config();
    volmargin()
        .args(["--config", &config.path().to_string_lossy()])
        .args(["quote", "--asset", "btc", "--notional", "650"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"bps\""))
        .stdout(predicate::str::contains("\"amount\""));
}

#[test]
fn quote_rejects_unknown_asset() {
    let config = minimal_config();
    volmargin()
        .args(["--config", &config.path().to_string_lossy()])
        .args(["quote", "--asset", "doge", "--notional", "650"])
        .assert()
        .failure();
}

#[test]
fn trade_settles_a_short_position() {
    let config = minimal_config();
    volmargin()
        .args(["--config", &config.path().to_string_lossy()])
        .args(["trade", "--asset", "xau", "--quantity", "0.01", "--duration", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"settled\": true"));
}

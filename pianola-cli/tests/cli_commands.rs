use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn song_file(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn create_config_json_outputs_defaults() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pianola"));
    cmd.args(["create", "config-json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"speed\": 1.0"))
        .stdout(predicate::str::contains("\"hold_duration_s\": 0.25"))
        .stdout(predicate::str::contains("\"runaway_margin_s\": 10.0"))
        .stdout(predicate::str::contains("\"0\": \"y\""))
        .stdout(predicate::str::contains("\"14\": \"/\""));
}

#[test]
fn info_prints_song_statistics() {
    let song = song_file(
        r#"[{"name":"demo","songNotes":[{"key":"1Key0","time":0},{"key":"1Key4","time":1500},{"key":"1Key2","time":"oops"}]}]"#,
    );

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pianola"));
    cmd.arg("info")
        .arg(song.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Notes: 2"))
        .stdout(predicate::str::contains("Dropped: 1"))
        .stdout(predicate::str::contains("Duration: 00:01 (1500 ms)"));
}

#[test]
fn quiet_playback_runs_to_the_end() {
    let song = song_file(r#"[{"key":"1Key0","time":0},{"key":"1Key1","time":80}]"#);

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pianola"));
    cmd.arg(song.path())
        .args(["--quiet", "--hold", "0.02", "--speed", "2"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished at 00:00 / 00:00"));
}

#[test]
fn missing_song_file_fails() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pianola"));
    cmd.args(["--quiet", "definitely-not-here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read definitely-not-here.json"));
}

#[test]
fn unrecognized_song_format_fails() {
    let song = song_file(r#"{"title":"no notes here"}"#);

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("pianola"));
    cmd.arg("info")
        .arg(song.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized song file format"));
}

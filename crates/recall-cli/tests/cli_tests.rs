//! CLI integration tests using assert_cmd.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn recall() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("recall").unwrap();
    cmd.env_remove("RECALL_DATABASE")
        .env_remove("RECALL_SESSION_MAX_AGE_HOURS")
        .env("RUST_LOG", "off");
    cmd
}

const DECK: &str = r#"
[deck]
id = "animals"
name = "Animals"
language = "es"

[[words]]
original = "perro"
translation = "dog"

[[words]]
original = "gato"
translation = "cat"

[[words]]
original = "casa"
translation = "house"
"#;

/// A workspace with a config pointing at a SQLite file and one deck.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("recall.toml"),
            "[storage]\ntype = \"sqlite\"\npath = \"data/recall.db\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("animals.toml"), DECK).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("recall.toml")
    }

    fn deck(&self) -> PathBuf {
        self.dir.path().join("animals.toml")
    }

    fn run(&self, args: &[&str]) -> Command {
        let mut cmd = recall();
        cmd.args(args).arg("--config").arg(self.config());
        cmd
    }

    fn import(&self) {
        let mut cmd = recall();
        cmd.arg("import")
            .arg("--deck")
            .arg(self.deck())
            .args(["--owner", "1"])
            .arg("--config")
            .arg(self.config())
            .assert()
            .success();
    }
}

#[test]
fn help_output() {
    recall()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spaced-repetition vocabulary trainer"));
}

#[test]
fn version_output() {
    recall()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("recall"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    recall()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created recall.toml"))
        .stdout(predicate::str::contains("Created decks/example.toml"));

    assert!(dir.path().join("recall.toml").exists());
    assert!(dir.path().join("decks/example.toml").exists());

    recall()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--deck")
        .arg("decks/example.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Spanish starter (5 words)"))
        .stdout(predicate::str::contains("All decks valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    recall().current_dir(dir.path()).arg("init").assert().success();

    recall()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        r#"
[deck]
id = "bad"
name = "Bad"

[[words]]
original = "hola"
translation = "hello"

[[words]]
original = "Hola"
translation = ""
"#,
    )
    .unwrap();

    recall()
        .arg("validate")
        .arg("--deck")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[word 2] WARNING: translation is empty"))
        .stdout(predicate::str::contains("duplicate word"))
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    recall()
        .arg("validate")
        .arg("--deck")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn missing_config_is_an_error() {
    recall()
        .args(["due", "--owner", "1", "--config", "no-such-config.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn import_skips_known_words() {
    let ws = Workspace::new();

    ws.import();
    assert!(ws.dir.path().join("data/recall.db").exists());

    let mut again = recall();
    again
        .arg("import")
        .arg("--deck")
        .arg(ws.deck())
        .args(["--owner", "1"])
        .arg("--config")
        .arg(ws.config())
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 0 word(s), skipped 3."));

    ws.run(&["due", "--owner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("perro"))
        .stdout(predicate::str::contains("3 of 3 word(s) due."));

    ws.run(&["due", "--owner", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing due (0 word(s) scheduled)."));
}

#[test]
fn review_pauses_and_resumes() {
    let ws = Workspace::new();
    ws.import();

    ws.run(&["review", "--owner", "1"])
        .write_stdin("Dog\nwrong\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting review: 3 word(s)."))
        .stdout(predicate::str::contains("wrong: gato = cat"))
        .stdout(predicate::str::contains("Session saved"));

    ws.run(&["review", "--owner", "1"])
        .write_stdin("house\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuming session: 2 of 3 answered."))
        .stdout(predicate::str::contains("[3/3] casa = "))
        .stdout(predicate::str::contains("Session complete: 2/3 correct (67%)"));

    ws.run(&["review", "--owner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to review right now."));

    ws.run(&["due", "--owner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing due (3 word(s) scheduled)."));

    ws.run(&["stats", "--owner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accuracy"))
        .stdout(predicate::str::contains("66.7%"))
        .stdout(predicate::str::contains("1 day(s) (best 1)"));
}

#[test]
fn cleanup_removes_abandoned_sessions() {
    let ws = Workspace::new();
    ws.import();

    ws.run(&["review", "--owner", "1"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session saved"));

    ws.run(&["cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 stale session(s)."))
        .stdout(predicate::str::contains("1 session(s) still in progress."));

    std::thread::sleep(std::time::Duration::from_millis(20));

    ws.run(&["cleanup", "--older-than-hours", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 stale session(s)."))
        .stdout(predicate::str::contains("0 session(s) still in progress."));

    ws.run(&["review", "--owner", "1"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting review: 3 word(s)."));
}

#[test]
fn add_list_and_delete_words() {
    let ws = Workspace::new();

    ws.run(&[
        "add",
        "--owner",
        "1",
        "--original",
        "perro",
        "--translation",
        "dog",
        "--example",
        "El perro ladra.",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Added word 1: perro = dog"))
    .stdout(predicate::str::contains("Example: El perro ladra."));

    ws.run(&["add", "--owner", "1", "--original", "Perro", "--translation", "hound"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("word already exists: perro (id 1)"));

    ws.run(&["add", "--owner", "1", "--original", "gato", "--translation", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("translation cannot be empty"));

    ws.run(&["add", "--owner", "1", "--original", "gato", "--translation", "cat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added word 2: gato = cat"));

    ws.run(&["words", "--owner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("perro"))
        .stdout(predicate::str::contains("gato"))
        .stdout(predicate::str::contains("0%"))
        .stdout(predicate::str::contains("2 word(s), 0 learned, 2 due."));

    ws.run(&["delete", "--owner", "2", "--id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("word 1 not found for owner 2"));

    ws.run(&["delete", "--owner", "1", "--id", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted word 1: perro = dog"));

    ws.run(&["words", "--owner", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("perro").not())
        .stdout(predicate::str::contains("1 word(s), 0 learned, 1 due."));

    ws.run(&["words", "--owner", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No words yet"));
}

#[test]
fn review_uses_configured_session_size() {
    let ws = Workspace::new();
    std::fs::write(
        ws.config(),
        "default_session_limit = 2\n\n[storage]\ntype = \"sqlite\"\npath = \"data/recall.db\"\n",
    )
    .unwrap();
    ws.import();

    ws.run(&["review", "--owner", "1"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Starting review: 2 word(s)."));
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn todocal(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("todocal").unwrap();
    cmd.env("TODOCAL_DB", dir.path().join("data"))
        .env("TODOCAL_CONFIG", dir.path().join("absent.toml"))
        .env_remove("TODOCAL_OWNER")
        .env_remove("TODOCAL_LOG");
    cmd
}

#[test]
fn add_list_complete_remove() {
    let dir = TempDir::new().unwrap();

    todocal(&dir)
        .args(["add", "Write report", "-c", "work", "-p", "high", "-d", "2024-03-01", "-t", "9:30am"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task added (id = 1)"));

    todocal(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write report"))
        .stdout(predicate::str::contains("2024-03-01 09:30"));

    todocal(&dir)
        .args(["complete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("marked as complete"));

    todocal(&dir)
        .args(["list", "--pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));

    todocal(&dir).args(["remove", "1"]).assert().success();
    todocal(&dir)
        .args(["remove", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Task 1 not found"));
}

#[test]
fn repeating_add_creates_five_occurrences() {
    let dir = TempDir::new().unwrap();
    todocal(&dir)
        .args(["add", "gym", "-d", "2024-03-01", "-r", "weekdays", "-p", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 occurrences added"));

    todocal(&dir)
        .args(["day", "2024-03-04"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gym"));

    todocal(&dir)
        .args(["day", "2024-03-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks scheduled"));

    todocal(&dir)
        .args(["calendar", "--month", "2024-03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("March 2024"))
        .stdout(predicate::str::contains("H"));
}

#[test]
fn dry_run_prints_dates_without_saving() {
    let dir = TempDir::new().unwrap();
    todocal(&dir)
        .args(["add", "rent", "-d", "2024-01-31", "-r", "monthly", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-02-29"))
        .stdout(predicate::str::contains("2024-04-30"));

    todocal(&dir)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn invalid_input_exits_with_user_error() {
    let dir = TempDir::new().unwrap();
    todocal(&dir)
        .args(["add", "late", "-d", "2024-03-01", "-t", "13:00"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid time"));

    todocal(&dir)
        .args(["add", "gym", "-r", "daily"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("due date is required"));
}

#[test]
fn owners_are_kept_apart() {
    let dir = TempDir::new().unwrap();
    todocal(&dir)
        .env("TODOCAL_OWNER", "mina")
        .args(["add", "mina's task"])
        .assert()
        .success();

    todocal(&dir)
        .env("TODOCAL_OWNER", "theo")
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn reset_with_force_clears_tasks() {
    let dir = TempDir::new().unwrap();
    todocal(&dir).args(["add", "temp"]).assert().success();
    todocal(&dir)
        .args(["reset", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks reset successfully."));
    todocal(&dir)
        .args(["list"])
        .assert()
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn completions_generate_for_bash() {
    let dir = TempDir::new().unwrap();
    todocal(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("todocal"));
}

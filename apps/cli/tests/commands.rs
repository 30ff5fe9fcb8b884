use std::error::Error;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn cli(workspace: &TempDir) -> Result<Command, Box<dyn Error>> {
    let mut command = Command::cargo_bin("cipherstudio")?;
    command
        .env_remove("RUST_LOG")
        .env("CIPHERSTUDIO_COLOR_SCHEME", "dark")
        .args(["--workspace", workspace.path().to_str().unwrap()]);
    Ok(command)
}

fn save_project(workspace: &TempDir, script: &str) -> Result<String, Box<dyn Error>> {
    let output = cli(workspace)?
        .arg("shell")
        .write_stdin(format!("{script}save\n"))
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(stdout
        .lines()
        .find_map(|line| line.strip_prefix("Saved project id: "))
        .expect("saved id")
        .to_string())
}

#[test]
fn last_reports_nothing_before_first_save() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(&workspace)?
        .arg("last")
        .assert()
        .success()
        .stdout("No project saved yet\n");
    Ok(())
}

#[test]
fn last_prints_most_recent_id() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    save_project(&workspace, "")?;
    let second = save_project(&workspace, "create More\n")?;
    cli(&workspace)?
        .arg("last")
        .assert()
        .success()
        .stdout(format!("{second}\n"));
    Ok(())
}

#[test]
fn snapshot_show_prints_files_in_path_order() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let id = save_project(&workspace, "create Note\nedit hello\n")?;
    cli(&workspace)?
        .args(["snapshot", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("== /App.js ==").and(predicate::str::contains(
            "== /Note.js ==\nhello\n== /index.js ==",
        )));
    Ok(())
}

#[test]
fn snapshot_show_unknown_id_fails() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(&workspace)?
        .args(["snapshot", "show", "proj_0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project not found"));
    Ok(())
}

#[test]
fn snapshot_delete_leaves_last_pointer() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let id = save_project(&workspace, "")?;
    cli(&workspace)?
        .args(["snapshot", "delete", &id])
        .assert()
        .success()
        .stdout(format!("Deleted snapshot {id}\n"));
    cli(&workspace)?
        .args(["snapshot", "delete", &id])
        .assert()
        .failure();
    cli(&workspace)?
        .arg("last")
        .assert()
        .success()
        .stdout(format!("{id}\n"));
    Ok(())
}

#[test]
fn theme_defaults_to_system_and_persists_toggles() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(&workspace)?
        .arg("theme")
        .assert()
        .success()
        .stdout("Theme: dark\n");
    cli(&workspace)?
        .args(["theme", "toggle"])
        .assert()
        .success()
        .stdout("Theme: light\n");
    cli(&workspace)?
        .arg("theme")
        .assert()
        .success()
        .stdout("Theme: light\n");
    Ok(())
}

#[test]
fn theme_reports_light_when_storage_cannot_be_opened() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let dir = workspace.path().join(".cipherstudio");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("storage.json"), "[1,2]")?;
    cli(&workspace)?
        .arg("theme")
        .assert()
        .success()
        .stdout("Theme: light\n");
    Ok(())
}

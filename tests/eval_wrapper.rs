// End-to-end tests for nav-eval driving the real navigate resolver.
use std::path::Path;
use std::process::{Command, Output};

fn nav_eval(data: &Path, cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nav-eval"));
    command
        .env("NAVIGATE_DATA", data)
        .env("NAVIGATE_BIN", env!("CARGO_BIN_EXE_navigate"))
        .env("PWD", cwd)
        .env_remove("NAVIGATE_LOG")
        .current_dir(cwd);
    command
}

fn navigate(data: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_navigate"));
    command.env("NAVIGATE_DATA", data);
    command
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn jump_emits_cd_and_records_the_visit() {
    let data = tempfile::tempdir().expect("data");
    let root = tempfile::tempdir().expect("root");
    let target = root.path().join("proj x");
    std::fs::create_dir(&target).expect("mkdir");

    let output = nav_eval(data.path(), root.path())
        .arg("--")
        .arg(&target)
        .output()
        .expect("nav-eval");
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("cd -- '{}'\n", target.display()));

    let search = navigate(data.path())
        .args(["r", "proj x"])
        .output()
        .expect("search");
    assert!(search.status.success());
    assert_eq!(stdout(&search), format!("{}\n", target.display()));
}

#[test]
fn relative_target_is_made_absolute() {
    let data = tempfile::tempdir().expect("data");
    let root = tempfile::tempdir().expect("root");
    let nested = root.path().join("a");
    std::fs::create_dir(&nested).expect("mkdir");

    let output = nav_eval(data.path(), &nested)
        .args(["--", ".."])
        .output()
        .expect("nav-eval");
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("cd -- '{}'\n", root.path().display()));
}

#[test]
fn no_announce_skips_bookkeeping() {
    let data = tempfile::tempdir().expect("data");
    let root = tempfile::tempdir().expect("root");

    let output = nav_eval(data.path(), root.path())
        .arg("--no-announce")
        .arg("--")
        .arg(root.path())
        .output()
        .expect("nav-eval");
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("cd -- "));
    assert!(!data.path().join("navigate.json").exists());
}

#[test]
fn non_directory_answer_prints_not_found() {
    let data = tempfile::tempdir().expect("data");
    let root = tempfile::tempdir().expect("root");

    let output = nav_eval(data.path(), root.path())
        .args(["--cmd", "go", "--", "not-a-real-path"])
        .output()
        .expect("nav-eval");
    assert!(output.status.success());
    let script = stdout(&output);
    assert!(script.starts_with("printf '%s\\n' 'navigate '\\''not-a-real-path'\\'' not found"));
    assert!(script.contains("\nnot-a-real-path\n"));
    assert!(script.contains("Use '\\''go --help'\\'' to see the available options."));
    assert!(!script.contains("cd -- "));
}

#[test]
fn silent_resolver_failure_emits_nothing() {
    let data = tempfile::tempdir().expect("data");
    let root = tempfile::tempdir().expect("root");

    let output = nav_eval(data.path(), root.path())
        .args(["--", "-m", "here"])
        .output()
        .expect("nav-eval");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let jump = navigate(data.path())
        .args(["-j", "here"])
        .output()
        .expect("jump");
    assert_eq!(stdout(&jump), format!("{}\n", root.path().display()));
}

#[cfg(unix)]
#[test]
fn unenterable_directory_is_neither_emitted_nor_recorded() {
    use std::os::unix::fs::PermissionsExt;

    let data = tempfile::tempdir().expect("data");
    let root = tempfile::tempdir().expect("root");
    let locked = root.path().join("locked");
    std::fs::create_dir(&locked).expect("mkdir");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).expect("chmod");

    // Privileged users can enter any directory; there is nothing to refuse then.
    if std::fs::read_dir(&locked).is_err() {
        let output = nav_eval(data.path(), root.path())
            .arg("--")
            .arg(&locked)
            .output()
            .expect("nav-eval");
        assert!(!output.status.success());
        assert!(output.stdout.is_empty());

        let search = navigate(data.path())
            .args(["r", "locked"])
            .output()
            .expect("search");
        assert_eq!(search.status.code(), Some(3));
    }

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).expect("chmod");
}

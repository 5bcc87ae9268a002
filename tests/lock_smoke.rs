// Multi-process lock smoke test for concurrent visit recording.
use std::process::{Command, Stdio};

use navigate::core::store::Store;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_navigate");
    let mut command = Command::new(exe);
    command.env_remove("NAVIGATE_LOG");
    command
}

#[test]
fn concurrent_adds_are_serialized() {
    let temp = tempfile::tempdir().expect("tempdir");
    let data = temp.path().join("data");

    let workers = 16;
    let mut children = Vec::new();
    for i in 0..workers {
        let child = cmd()
            .env("NAVIGATE_DATA", &data)
            .args(["-a", &format!("/d{i}")])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn");
        children.push(child);
    }

    for mut child in children {
        let status = child.wait().expect("wait");
        // -a has no target, so it exits 1 rather than 0.
        assert_eq!(status.code(), Some(1));
    }

    let db = Store::new(&data).load().expect("load");
    assert_eq!(db.count.len(), workers);
    assert_eq!(db.time.len(), workers);
    for i in 0..workers {
        assert!(db.count.contains_key(&format!("/d{i}")), "missing /d{i}");
    }
}

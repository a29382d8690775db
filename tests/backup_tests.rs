use std::path::Path;
use tempfile::TempDir;
use worldsmith::backup::BackupStore;
use worldsmith::error::{Error, Result};

/// Lays out a server directory with one world containing a nested region
/// file and an active lock file.
fn server_dir_with_world() -> TempDir {
    let dir = TempDir::new().unwrap();
    let world = dir.path().join("world");
    std::fs::create_dir_all(world.join("region")).unwrap();
    std::fs::write(world.join("level.dat"), b"level data").unwrap();
    std::fs::write(world.join("region").join("r.0.0.mca"), b"region data").unwrap();
    std::fs::write(world.join("session.lock"), b"lock").unwrap();
    dir
}

fn store(dir: &TempDir, max_backups: u32) -> BackupStore {
    BackupStore::new(dir.path(), "backups", vec!["world".to_string()], max_backups)
}

fn backup_exists(dir: &TempDir, name: &str) -> bool {
    dir.path().join("backups").join(name).exists()
}

#[test]
fn test_list_is_empty_before_any_backup() {
    let dir = server_dir_with_world();
    assert!(store(&dir, 0).list().is_empty());
}

#[test]
fn test_auto_backup_copies_worlds_and_excludes_locks() -> Result<()> {
    let dir = server_dir_with_world();
    let store = store(&dir, 0);

    let name = store.create_auto()?;
    assert!(name.parse::<u64>().is_ok(), "auto names are timestamps");

    let backup_world = dir.path().join("backups").join(&name).join("world");
    assert_eq!(std::fs::read(backup_world.join("level.dat")).unwrap(), b"level data");
    assert_eq!(
        std::fs::read(backup_world.join("region").join("r.0.0.mca")).unwrap(),
        b"region data"
    );
    assert!(
        !backup_world.join("session.lock").exists(),
        "lock files belong to the running process"
    );
    Ok(())
}

#[test]
fn test_rotation_evicts_only_the_oldest_auto_backup() -> Result<()> {
    let dir = server_dir_with_world();
    let store = store(&dir, 3);

    // Three auto-named backups plus a manual one that must survive.
    for name in ["100", "200", "300"] {
        std::fs::create_dir_all(dir.path().join("backups").join(name)).unwrap();
    }
    std::fs::create_dir_all(dir.path().join("backups").join("before-update")).unwrap();

    let created = store.create_auto()?;

    assert!(!backup_exists(&dir, "100"), "numerically smallest auto name is evicted");
    assert!(backup_exists(&dir, "200"));
    assert!(backup_exists(&dir, "300"));
    assert!(backup_exists(&dir, "before-update"), "manual backups are never rotated");
    assert!(backup_exists(&dir, &created));

    let auto_count = store
        .list()
        .iter()
        .filter(|name| name.parse::<u64>().is_ok())
        .count();
    assert_eq!(auto_count, 3);
    Ok(())
}

#[test]
fn test_rotation_does_not_run_below_the_maximum() -> Result<()> {
    let dir = server_dir_with_world();
    let store = store(&dir, 3);

    std::fs::create_dir_all(dir.path().join("backups").join("100")).unwrap();
    store.create_auto()?;

    assert!(backup_exists(&dir, "100"));
    Ok(())
}

#[test]
fn test_manual_backup_name_collision() -> Result<()> {
    let dir = server_dir_with_world();
    let store = store(&dir, 0);

    store.create_named("mine")?;
    let first_level = dir
        .path()
        .join("backups")
        .join("mine")
        .join("world")
        .join("level.dat");
    let before = std::fs::read(&first_level).unwrap();

    // Mutate the live world so an (incorrect) overwrite would be visible.
    std::fs::write(dir.path().join("world").join("level.dat"), b"newer data").unwrap();

    match store.create_named("mine") {
        Err(Error::NameCollision(name)) => assert_eq!(name, "mine"),
        other => panic!("expected NameCollision, got {:?}", other.map(|_| ())),
    }
    assert_eq!(std::fs::read(&first_level).unwrap(), before);
    Ok(())
}

#[test]
fn test_restore_replaces_live_world() -> Result<()> {
    let dir = server_dir_with_world();
    let store = store(&dir, 0);

    let name = store.create_named("golden")?;
    let live_level = dir.path().join("world").join("level.dat");
    std::fs::write(&live_level, b"corrupted").unwrap();
    std::fs::write(dir.path().join("world").join("junk.dat"), b"junk").unwrap();

    store.restore(&name)?;

    assert_eq!(std::fs::read(&live_level).unwrap(), b"level data");
    assert!(
        !dir.path().join("world").join("junk.dat").exists(),
        "restore replaces the whole world directory"
    );
    Ok(())
}

#[test]
fn test_restore_unknown_backup_mutates_nothing() {
    let dir = server_dir_with_world();
    let store = store(&dir, 0);
    let live_level = dir.path().join("world").join("level.dat");

    match store.restore("nonexistent") {
        Err(Error::BackupNotFound(name)) => assert_eq!(name, "nonexistent"),
        other => panic!("expected BackupNotFound, got {:?}", other.map(|_| ())),
    }
    assert_eq!(std::fs::read(&live_level).unwrap(), b"level data");
}

#[test]
fn test_delete_backup() -> Result<()> {
    let dir = server_dir_with_world();
    let store = store(&dir, 0);

    let name = store.create_named("doomed")?;
    assert!(backup_exists(&dir, &name));
    store.delete(&name)?;
    assert!(!backup_exists(&dir, &name));

    match store.delete(&name) {
        Err(Error::BackupNotFound(_)) => {}
        other => panic!("expected BackupNotFound, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn test_multiple_worlds_are_mirrored() -> Result<()> {
    let dir = server_dir_with_world();
    let nether = dir.path().join("world_nether");
    std::fs::create_dir_all(&nether).unwrap();
    std::fs::write(nether.join("level.dat"), b"nether data").unwrap();

    let store = BackupStore::new(
        dir.path(),
        "backups",
        vec!["world".to_string(), "world_nether".to_string()],
        0,
    );
    let name = store.create_named("both")?;

    let root: &Path = &dir.path().join("backups").join(&name);
    assert!(root.join("world").join("level.dat").exists());
    assert!(root.join("world_nether").join("level.dat").exists());
    Ok(())
}

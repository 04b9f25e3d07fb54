use crate::{FixtureError, StorageKind, StorageProvisioner};

use std::fs;
use std::path::Path;

use googletest::assert_that;
use googletest::prelude::{contains_substring, eq};
use tempdb_config::StorageSettings;
use tempfile::TempDir;

use super::{is_empty_dir, memory_sink};

fn provisioner(scratch_parent: &Path) -> StorageProvisioner {
    let settings = StorageSettings {
        scratch_parent: Some(scratch_parent.to_path_buf()),
        ..StorageSettings::default()
    };
    StorageProvisioner::new(&settings, memory_sink())
}

fn seed_tree(root: &Path) {
    fs::create_dir_all(root.join("tables/nested")).unwrap();
    fs::write(root.join("metadata"), "cluster").unwrap();
    fs::write(root.join("tables/nested/shard"), "rows").unwrap();
    std::os::unix::fs::symlink("metadata", root.join("metadata.link")).unwrap();
}

#[test]
fn given_no_source_when_acquired_then_empty_scratch_that_release_removes() {
    let parent = TempDir::new().unwrap();
    let provisioner = provisioner(parent.path());

    let storage = provisioner.acquire(None, None).unwrap();
    let data_path = storage.data_path().to_path_buf();

    assert_that!(storage.kind(), eq(&StorageKind::Scratch));
    assert_eq!(storage.data_path(), storage.scratch_root());
    assert!(data_path.is_dir());
    assert!(is_empty_dir(&data_path));
    assert!(data_path.starts_with(parent.path()));

    fs::write(data_path.join("leftover"), "x").unwrap();
    provisioner.release(storage).unwrap();

    assert!(!data_path.exists());
    assert!(is_empty_dir(parent.path()));
}

#[test]
fn given_seed_when_acquired_then_copy_is_isolated_from_original() {
    let parent = TempDir::new().unwrap();
    let seed = TempDir::new().unwrap();
    seed_tree(seed.path());
    let provisioner = provisioner(parent.path());

    let storage = provisioner.acquire(Some(seed.path()), None).unwrap();
    let copy = storage.data_path().to_path_buf();

    assert_eq!(copy, storage.scratch_root().join("rethinkdb_data"));
    assert_that!(
        fs::read_to_string(copy.join("tables/nested/shard")).unwrap(),
        eq("rows")
    );
    assert!(fs::symlink_metadata(copy.join("metadata.link"))
        .unwrap()
        .file_type()
        .is_symlink());

    fs::write(copy.join("metadata"), "mutated").unwrap();
    fs::write(copy.join("new_table"), "written").unwrap();
    assert_that!(
        fs::read_to_string(seed.path().join("metadata")).unwrap(),
        eq("cluster")
    );
    assert!(!seed.path().join("new_table").exists());

    provisioner.release(storage).unwrap();

    assert!(!copy.exists());
    assert!(seed.path().join("tables/nested/shard").exists());
}

#[test]
fn given_explicit_path_when_released_then_path_survives() {
    let parent = TempDir::new().unwrap();
    let explicit = TempDir::new().unwrap();
    fs::write(explicit.path().join("metadata"), "kept").unwrap();
    let provisioner = provisioner(parent.path());

    let storage = provisioner.acquire(None, Some(explicit.path())).unwrap();
    let scratch_root = storage.scratch_root().to_path_buf();

    assert!(storage.is_caller_owned());
    assert_eq!(storage.data_path(), explicit.path());
    assert!(scratch_root != explicit.path());

    provisioner.release(storage).unwrap();

    assert!(!scratch_root.exists());
    assert_that!(
        fs::read_to_string(explicit.path().join("metadata")).unwrap(),
        eq("kept")
    );
}

#[test]
fn given_seed_and_explicit_path_when_acquired_then_rejected_before_allocation() {
    let parent = TempDir::new().unwrap();
    let seed = TempDir::new().unwrap();
    let explicit = TempDir::new().unwrap();
    let provisioner = provisioner(parent.path());

    let result = provisioner.acquire(Some(seed.path()), Some(explicit.path()));

    match result {
        Err(error @ FixtureError::Configuration { .. }) => {
            assert_that!(error.to_string(), contains_substring("existing path"));
        }
        other => panic!("expected Configuration error, got {other:?}"),
    }
    assert!(is_empty_dir(parent.path()));
}

#[test]
fn given_missing_seed_when_acquired_then_seed_copy_error_and_nothing_left() {
    let parent = TempDir::new().unwrap();
    let provisioner = provisioner(parent.path());
    let missing = parent.path().join("does-not-exist");

    let result = provisioner.acquire(Some(&missing), None);

    assert!(matches!(result, Err(FixtureError::SeedCopy { .. })));
    assert!(is_empty_dir(parent.path()));
}

#[test]
fn given_missing_scratch_parent_when_acquired_then_allocation_error() {
    let parent = TempDir::new().unwrap();
    let provisioner = provisioner(&parent.path().join("gone"));

    let result = provisioner.acquire(None, None);

    assert!(matches!(
        result,
        Err(FixtureError::StorageAllocation { .. })
    ));
}

#[test]
fn given_leaked_storage_when_leaked_then_directory_kept() {
    let parent = TempDir::new().unwrap();
    let provisioner = provisioner(parent.path());
    let storage = provisioner.acquire(None, None).unwrap();

    let kept = storage.leak();

    assert!(kept.is_dir());
    fs::remove_dir_all(kept).unwrap();
}

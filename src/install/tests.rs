use std::{fs, io};

use tempfile::TempDir;

use crate::outcome::ErrorKind;

use super::{copy_then_rename, sibling_path, AtomicInstaller, CrossVolumePolicy};

fn write(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, data).unwrap();
    path
}

fn leftovers(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn install_replaces_destination() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"new content");
    let destination = write(&dir, "file", b"old content");

    AtomicInstaller::default()
        .install(&temp, &destination)
        .await
        .unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"new content");
    assert!(!temp.exists());
}

#[tokio::test]
async fn install_creates_missing_parents() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"content");
    let destination = dir.path().join("a/b/c/file");

    AtomicInstaller::default()
        .install(&temp, &destination)
        .await
        .unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"content");
}

#[tokio::test]
async fn install_missing_temp_fails() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join("never-written.tmp");
    let destination = write(&dir, "file", b"old content");

    let err = AtomicInstaller::default()
        .install(&temp, &destination)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallError);
    assert_eq!(fs::read(&destination).unwrap(), b"old content");
}

#[tokio::test]
async fn install_over_directory_leaves_destination_and_consumes_temp() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"content");
    let destination = dir.path().join("occupied");
    fs::create_dir(&destination).unwrap();
    fs::write(destination.join("inner"), b"inner").unwrap();

    let err = AtomicInstaller::default()
        .install(&temp, &destination)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallError);
    assert!(destination.is_dir());
    assert_eq!(fs::read(destination.join("inner")).unwrap(), b"inner");
    assert!(!temp.exists());
}

#[tokio::test]
async fn install_under_regular_file_fails() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"content");
    let blocker = write(&dir, "blocker", b"not a directory");
    let destination = blocker.join("file");

    let err = AtomicInstaller::default()
        .install(&temp, &destination)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallError);
    assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");
    assert!(!temp.exists());
}

#[tokio::test]
async fn copy_then_rename_replaces_destination_without_leftovers() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"copied");
    let destination = write(&dir, "file", b"old");

    copy_then_rename(&temp, &destination).await.unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"copied");
    assert_eq!(leftovers(&dir), ["file", "file.tmp"]);
}

#[tokio::test]
async fn copy_then_rename_failure_is_cross_volume() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join("missing.tmp");
    let destination = write(&dir, "file", b"old");

    let err = copy_then_rename(&temp, &destination).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CrossVolumeError);
    assert_eq!(fs::read(&destination).unwrap(), b"old");
    assert_eq!(leftovers(&dir), ["file"]);
}

#[tokio::test]
async fn cross_device_rename_fails_under_fail_policy() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"new content");
    let destination = write(&dir, "file", b"old content");

    let err = AtomicInstaller::new(CrossVolumePolicy::Fail)
        .on_rename_error(io::ErrorKind::CrossesDevices.into(), &temp, &destination)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CrossVolumeError);
    assert_eq!(fs::read(&destination).unwrap(), b"old content");
    assert_eq!(leftovers(&dir), vec!["file"]);
}

#[tokio::test]
async fn cross_device_rename_copies_under_copy_policy() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"new content");
    let destination = write(&dir, "file", b"old content");

    AtomicInstaller::new(CrossVolumePolicy::CopyThenRename)
        .on_rename_error(io::ErrorKind::CrossesDevices.into(), &temp, &destination)
        .await
        .unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"new content");
    assert_eq!(leftovers(&dir), vec!["file"]);
}

#[tokio::test]
async fn other_rename_errors_are_install_errors() {
    let dir = TempDir::new().unwrap();
    let temp = write(&dir, "file.tmp", b"new content");
    let destination = write(&dir, "file", b"old content");

    let err = AtomicInstaller::new(CrossVolumePolicy::CopyThenRename)
        .on_rename_error(io::ErrorKind::PermissionDenied.into(), &temp, &destination)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InstallError);
    assert_eq!(fs::read(&destination).unwrap(), b"old content");
    assert_eq!(leftovers(&dir), vec!["file"]);
}

#[test]
fn sibling_paths_are_hidden_and_unique() {
    let destination = std::path::Path::new("/data/report.pdf");
    let first = sibling_path(destination);
    let second = sibling_path(destination);

    assert_ne!(first, second);
    assert_eq!(first.parent(), destination.parent());
    let name = first.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with(".report.pdf."));
    assert!(name.ends_with(".partial"));
}

#[test]
fn cross_volume_policy_parse() {
    assert_eq!(
        "copy".parse::<CrossVolumePolicy>().unwrap(),
        CrossVolumePolicy::CopyThenRename
    );
    assert_eq!("fail".parse::<CrossVolumePolicy>().unwrap(), CrossVolumePolicy::Fail);
    assert!("move".parse::<CrossVolumePolicy>().is_err());
    assert_eq!(CrossVolumePolicy::default().to_string(), "copy");
}

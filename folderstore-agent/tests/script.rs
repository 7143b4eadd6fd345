//! Script locations (`|<command>`), run through `sh -c`.

#![cfg(unix)]

mod common;

use folderstore_agent::config::TransferConfig;
use folderstore_common::api::{Operation, Request};

use common::*;

#[tokio::test]
async fn test_retrieve_script_copies_from_store() {
    let work = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let git_dir = tempfile::tempdir().unwrap();
    let file = create_test_file(&work.path().join("file.dat"), 5000);
    std::fs::copy(&file.path, store.path().join(&file.oid)).unwrap();

    let script = format!(r#"|cp "{}/$OID" "$DEST""#, store.path().display());
    let requests = [
        Request::init(Operation::Download),
        Request::download(&file.oid, file.size),
        Request::terminate(),
    ];
    let session = run_session(TransferConfig::new(script, ""), git_dir.path(), &requests).await;

    assert!(session.error(&file.oid).is_none(), "{:?}", session.error(&file.oid));
    let path = session.completed_path(&file.oid).unwrap();
    assert!(path.starts_with(git_dir.path()));
    assert_eq!(file_hash(path), file.oid);
    assert_eq!(session.progress(&file.oid), vec![(5000, 5000)]);
}

#[tokio::test]
async fn test_store_script_receives_environment() {
    let work = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let file = create_test_file(&work.path().join("file.dat"), 2048);

    let script = format!(
        r#"|cp "$FROM" "{dir}/$OID" && echo "$SIZE" > "{dir}/$OID.size""#,
        dir = store.path().display()
    );
    let requests = [
        Request::init(Operation::Upload),
        Request::upload(&file.oid, file.size, &file.path),
        Request::terminate(),
    ];
    let session = run_session(TransferConfig::new(script, ""), work.path(), &requests).await;

    assert!(session.error(&file.oid).is_none());
    assert_eq!(session.progress(&file.oid), vec![(2048, 2048)]);
    assert_eq!(file_hash(&store.path().join(&file.oid)), file.oid);
    let size = std::fs::read_to_string(store.path().join(format!("{}.size", file.oid))).unwrap();
    assert_eq!(size.trim(), "2048");
}

#[tokio::test]
async fn test_failing_script_falls_through_to_directory() {
    let work = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let git_dir = tempfile::tempdir().unwrap();
    let file = create_test_file(&work.path().join("file.dat"), 333);
    place_plain(store.path(), &file);

    let spec = format!("|exit 7;{}", store.path().display());
    let requests = [
        Request::init(Operation::Download),
        Request::download(&file.oid, file.size),
        Request::terminate(),
    ];
    let session = run_session(TransferConfig::new(spec, ""), git_dir.path(), &requests).await;

    assert!(session.error(&file.oid).is_none());
    assert_eq!(file_hash(session.completed_path(&file.oid).unwrap()), file.oid);
}

#[tokio::test]
async fn test_failing_store_script_is_code_20() {
    let work = tempfile::tempdir().unwrap();
    let file = create_test_file(&work.path().join("file.dat"), 50);

    let requests = [
        Request::init(Operation::Upload),
        Request::upload(&file.oid, file.size, &file.path),
        Request::terminate(),
    ];
    let session = run_session(TransferConfig::new("|echo refused >&2 && false", ""), work.path(), &requests).await;

    let error = session.error(&file.oid).unwrap();
    assert_eq!(error.code, 20);
    assert!(error.message.contains("refused"));
}

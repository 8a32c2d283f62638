//! Unit tests for the call record store.

use crate::error::StoreError;
use crate::store::CallStore;

#[tokio::test]
async fn save_then_get_round_trips() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = CallStore::open(dir.path()).expect("store should open");

    let saved = store
        .save_call("CA123", None, "hello".to_string())
        .await
        .expect("save should succeed");
    assert_eq!(saved.call_sid, "CA123");
    assert_eq!(saved.transcript, "hello");

    let fetched = store.get_call("CA123").expect("record should exist");
    assert_eq!(fetched.call_sid, "CA123");
    assert_eq!(fetched.transcript, "hello");
}

#[tokio::test]
async fn get_unknown_call_is_none() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = CallStore::open(dir.path()).expect("store should open");

    assert!(store.get_call("CA404").is_none());
}

#[tokio::test]
async fn restart_rehydrates_from_disk() {
    let dir = tempfile::tempdir().expect("should create temp dir");

    {
        let store = CallStore::open(dir.path()).expect("store should open");
        store
            .save_call("CA123", Some("0011223344".to_string()), "hello".to_string())
            .await
            .expect("save should succeed");
    }

    // A fresh store over the same directory simulates a process restart.
    let store = CallStore::open(dir.path()).expect("store should reopen");
    let record = store.get_call("CA123").expect("record should survive restart");
    assert_eq!(record.call_sid, "CA123");
    assert_eq!(record.transcript, "hello");
    assert_eq!(record.account_number.as_deref(), Some("0011223344"));
}

#[tokio::test]
async fn upsert_overwrites_transcript_and_keeps_single_record() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = CallStore::open(dir.path()).expect("store should open");

    store
        .save_call("CA123", None, "first".to_string())
        .await
        .expect("save should succeed");
    store
        .save_call("CA123", None, "first\nsecond".to_string())
        .await
        .expect("save should succeed");

    let record = store.get_call("CA123").expect("record should exist");
    assert_eq!(record.transcript, "first\nsecond");

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .expect("should list dir")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
        .collect();
    assert_eq!(files.len(), 1, "upsert must never duplicate a record file");
}

#[tokio::test]
async fn none_account_number_preserves_existing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = CallStore::open(dir.path()).expect("store should open");

    store
        .save_call("CA123", Some("0011223344".to_string()), "a".to_string())
        .await
        .expect("save should succeed");
    store
        .save_call("CA123", None, "a\nb".to_string())
        .await
        .expect("save should succeed");

    let record = store.get_call("CA123").expect("record should exist");
    assert_eq!(record.account_number.as_deref(), Some("0011223344"));
}

#[tokio::test]
async fn hostile_call_sid_is_rejected() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = CallStore::open(dir.path()).expect("store should open");

    let err = store
        .save_call("../escape", None, String::new())
        .await
        .expect_err("path-like id should be rejected");
    assert!(matches!(err, StoreError::InvalidCallId(_)));

    let err = store
        .save_call("", None, String::new())
        .await
        .expect_err("empty id should be rejected");
    assert!(matches!(err, StoreError::InvalidCallId(_)));
}

#[tokio::test]
async fn unreadable_record_file_is_skipped_on_open() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    std::fs::write(dir.path().join("CAbad.json"), b"{ not json").expect("should write");

    {
        let store = CallStore::open(dir.path()).expect("store should open despite corrupt file");
        store
            .save_call("CAgood", None, "ok".to_string())
            .await
            .expect("save should succeed");
    }

    let store = CallStore::open(dir.path()).expect("store should reopen");
    assert!(store.get_call("CAbad").is_none());
    assert!(store.get_call("CAgood").is_some());
}

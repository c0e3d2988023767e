use std::sync::Arc;

use anyhow::Result;
use notification_pipeline::{
    clients::store::StatusStore,
    error::PipelineError,
    models::{
        message::ChannelType,
        status::{StatusCode, StatusUpdate},
    },
};

/// Test: Unknown keys are not found
#[tokio::test]
async fn test_get_unknown_key_returns_none() -> Result<()> {
    let store = StatusStore::new();

    assert!(store.get("missing").is_none());
    assert!(store.is_empty());

    Ok(())
}

/// Test: Writes to disjoint fields are merged
#[tokio::test]
async fn test_set_merges_disjoint_fields() -> Result<()> {
    let store = StatusStore::new();

    store.set("trace_1", StatusUpdate::default().with_message_id("msg_1"));
    store.set("trace_1", StatusUpdate::default().with_content("Hello"));

    let record = store.get("trace_1").expect("record should exist");
    assert_eq!(record.message_id.as_deref(), Some("msg_1"));
    assert_eq!(record.content.as_deref(), Some("Hello"));
    assert_eq!(record.status, None);
    assert_eq!(store.len(), 1);

    Ok(())
}

/// Test: Same-named fields are overwritten by the later write
#[tokio::test]
async fn test_set_overwrites_same_fields() -> Result<()> {
    let store = StatusStore::new();

    store.set("trace_1", StatusUpdate::status(StatusCode::Received));
    let record = store.set(
        "trace_1",
        StatusUpdate::status(StatusCode::IntermediateProcessed).with_channel_type(ChannelType::Sms),
    );

    assert_eq!(record.status, Some(StatusCode::IntermediateProcessed));
    assert_eq!(record.channel_type, Some(ChannelType::Sms));
    assert_eq!(
        record.path(),
        vec![StatusCode::Received, StatusCode::IntermediateProcessed]
    );

    Ok(())
}

/// Test: Status updates never erase unrelated fields
#[tokio::test]
async fn test_update_status_preserves_other_fields() -> Result<()> {
    let store = StatusStore::new();

    store.set(
        "trace_1",
        StatusUpdate::status(StatusCode::Received)
            .with_message_id("msg_1")
            .with_content("Hello")
            .with_channel_type(ChannelType::Email),
    );

    let record = store.update_status("trace_1", StatusCode::SendSuccess);

    assert_eq!(record.status, Some(StatusCode::SendSuccess));
    assert_eq!(record.message_id.as_deref(), Some("msg_1"));
    assert_eq!(record.content.as_deref(), Some("Hello"));
    assert_eq!(record.channel_type, Some(ChannelType::Email));

    Ok(())
}

/// Test: Updating a missing key synthesizes a minimal record
#[tokio::test]
async fn test_update_status_on_missing_key_creates_minimal_record() -> Result<()> {
    let store = StatusStore::new();

    store.update_status("orphan", StatusCode::DlqProcessed);

    let record = store.get("orphan").expect("record should exist");
    assert_eq!(record.trace_id, "orphan");
    assert_eq!(record.status, Some(StatusCode::DlqProcessed));
    assert!(record.message_id.is_none());
    assert!(record.content.is_none());

    Ok(())
}

/// Test: Get reflects the last status-affecting call
#[tokio::test]
async fn test_get_returns_last_status() -> Result<()> {
    let store = StatusStore::new();

    store.set("trace_1", StatusUpdate::status(StatusCode::Received));
    store.update_status("trace_1", StatusCode::RetrySuccess);
    store.set("trace_1", StatusUpdate::default().with_content("ignored status"));

    assert_eq!(
        store.get("trace_1").and_then(|r| r.status),
        Some(StatusCode::RetrySuccess)
    );

    Ok(())
}

/// Test: Guarded advance refuses to leave a terminal status
#[tokio::test]
async fn test_advance_refuses_terminal_overwrite() -> Result<()> {
    let store = StatusStore::new();

    store.set("trace_1", StatusUpdate::status(StatusCode::Received));
    store.advance("trace_1", StatusCode::SendSuccess)?;

    let result = store.advance("trace_1", StatusCode::SendFailure);

    assert!(matches!(
        result,
        Err(PipelineError::TerminalStatus {
            status: StatusCode::SendSuccess,
            ..
        })
    ));
    assert_eq!(
        store.get("trace_1").and_then(|r| r.status),
        Some(StatusCode::SendSuccess)
    );

    let record = store.update_status("trace_1", StatusCode::DlqProcessed);
    assert_eq!(record.status, Some(StatusCode::DlqProcessed));

    Ok(())
}

/// Test: Concurrent merges on one key lose no fields
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_on_same_key() -> Result<()> {
    let store = Arc::new(StatusStore::new());
    store.set("shared", StatusUpdate::status(StatusCode::Received));

    let mut handles = Vec::new();
    for i in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store.set("shared", StatusUpdate::default().with_content(format!("content_{}", i)));
            } else {
                store.update_status("shared", StatusCode::IntermediateProcessed);
            }
        }));
    }

    futures_util::future::join_all(handles).await;

    let record = store.get("shared").expect("record should exist");
    assert_eq!(record.status, Some(StatusCode::IntermediateProcessed));
    assert!(record.content.is_some());
    assert_eq!(
        record.path(),
        vec![StatusCode::Received, StatusCode::IntermediateProcessed]
    );
    assert_eq!(store.len(), 1);

    Ok(())
}

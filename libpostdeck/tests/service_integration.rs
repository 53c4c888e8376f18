//! Integration tests for PostdeckService
//!
//! Drives the store, runner and status reporter together through the
//! service facade with a mock publish client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use libpostdeck::confirm::{AlwaysDecline, AssumeYes};
use libpostdeck::error::BatchError;
use libpostdeck::publish::mock::MockPublishClient;
use libpostdeck::service::PostdeckService;
use libpostdeck::status::{RunPhase, StatusKind};
use libpostdeck::{Config, ContentItem, ContentStore, Destination, MediaRef, PostdeckError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const FAST_CONFIG: &str = r#"
[pacing]
success_delay = "5ms"
failure_delay = "10ms"

[status]
batch_clear_after = "50ms"
single_clear_after = "20ms"
"#;

async fn setup(client: Arc<MockPublishClient>) -> Result<(PostdeckService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("queue.db");
    let store = ContentStore::new(db_path.to_str().unwrap()).await?;
    let config = Config::from_toml(FAST_CONFIG)?;

    Ok((PostdeckService::with_client(config, store, client), temp_dir))
}

async fn queue(
    service: &PostdeckService,
    title: &str,
    media: Option<&str>,
    destination: Destination,
) -> Result<ContentItem> {
    let item = ContentItem::new(
        title.to_string(),
        format!("{} caption", title),
        media.map(MediaRef::new),
        destination,
    );
    service.store().add_item(&item).await?;
    Ok(item)
}

#[tokio::test]
async fn test_publish_queue_publishes_eligible_items_in_order() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client.clone()).await?;

    queue(&service, "one", Some("https://cdn.example.com/1.jpg"), Destination::Instagram).await?;
    queue(&service, "no media", None, Destination::Instagram).await?;
    queue(&service, "two", Some("https://cdn.example.com/2.mp4"), Destination::Instagram).await?;
    queue(&service, "elsewhere", Some("https://cdn.example.com/3.jpg"), Destination::Twitter).await?;

    let summary = service
        .publish_queue(Some(Destination::Instagram), &AssumeYes, &CancellationToken::new())
        .await?;

    assert_eq!(summary.total_count, 2);
    assert_eq!(summary.success_count, 2);
    assert!(summary.all_succeeded());

    let captions: Vec<String> = client.calls().into_iter().map(|c| c.caption).collect();
    assert_eq!(captions, vec!["one caption", "two caption"]);

    let status = service.reporter().current();
    assert_eq!(status.phase, RunPhase::Completed);
    assert_eq!(status.message, "All 2 published.");
    Ok(())
}

#[tokio::test]
async fn test_publish_queue_uses_configured_default_destination() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client.clone()).await?;

    queue(&service, "insta", Some("a.jpg"), Destination::Instagram).await?;
    queue(&service, "linkedin", Some("b.jpg"), Destination::Linkedin).await?;

    let summary = service
        .publish_queue(None, &AssumeYes, &CancellationToken::new())
        .await?;

    assert_eq!(summary.total_count, 1);
    assert_eq!(client.calls()[0].caption, "insta caption");
    Ok(())
}

#[tokio::test]
async fn test_empty_queue_is_rejected_without_status_change() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client.clone()).await?;

    queue(&service, "no media", None, Destination::Facebook).await?;

    let err = service
        .publish_queue(Some(Destination::Facebook), &AssumeYes, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PostdeckError::Batch(BatchError::EmptyBatch)));
    assert_eq!(err.exit_code(), 4);
    assert!(service.reporter().current().is_idle());
    assert_eq!(client.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_declined_confirmation_publishes_nothing() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client.clone()).await?;

    queue(&service, "a", Some("a.jpg"), Destination::Instagram).await?;
    queue(&service, "b", Some("b.jpg"), Destination::Instagram).await?;

    let err = service
        .publish_queue(None, &AlwaysDecline, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PostdeckError::Batch(BatchError::Declined(2))));
    assert_eq!(client.call_count(), 0);
    assert!(!service.runner().is_running());
    Ok(())
}

#[tokio::test]
async fn test_gate_receives_item_count() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client.clone()).await?;

    for title in ["a", "b", "c"] {
        queue(&service, title, Some("x.png"), Destination::Instagram).await?;
    }

    let asked = AtomicUsize::new(0);
    let gate = |count: usize| {
        asked.store(count, Ordering::SeqCst);
        true
    };

    service
        .publish_queue(None, &gate, &CancellationToken::new())
        .await?;

    assert_eq!(asked.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_keeps_going() -> Result<()> {
    let client = Arc::new(MockPublishClient::fail_on(&[1]));
    let (service, _temp_dir) = setup(client.clone()).await?;

    for title in ["a", "b", "c"] {
        queue(&service, title, Some("x.png"), Destination::Instagram).await?;
    }

    let summary = service
        .publish_queue(None, &AssumeYes, &CancellationToken::new())
        .await?;

    assert_eq!(client.call_count(), 3);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 1);

    let status = service.reporter().current();
    assert_eq!(status.kind, StatusKind::Info);
    assert_eq!(status.message, "2 published, 1 failed.");
    Ok(())
}

#[tokio::test]
async fn test_publish_one_uses_short_clear_window() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client.clone()).await?;

    let item = queue(&service, "solo", Some("solo.jpg"), Destination::Twitter).await?;

    let summary = service
        .publish_one(&item.id, &CancellationToken::new())
        .await?;

    assert_eq!(summary.total_count, 1);
    assert_eq!(service.reporter().current().message, "Published successfully.");
    assert_eq!(
        service.reporter().scheduled_clear(),
        Some(Duration::from_millis(20))
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(service.reporter().current().is_idle());
    Ok(())
}

#[tokio::test]
async fn test_publish_one_unknown_item() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let (service, _temp_dir) = setup(client).await?;

    let err = service
        .publish_one("does-not-exist", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PostdeckError::InvalidInput(_)));
    assert_eq!(err.exit_code(), 3);
    Ok(())
}

#[tokio::test]
async fn test_single_flight_spans_batch_and_single_publish() -> Result<()> {
    let client = Arc::new(MockPublishClient::with_delay(Duration::from_millis(100)));
    let (service, _temp_dir) = setup(client.clone()).await?;

    queue(&service, "a", Some("a.jpg"), Destination::Instagram).await?;
    queue(&service, "b", Some("b.jpg"), Destination::Instagram).await?;
    let single = queue(&service, "c", Some("c.jpg"), Destination::Twitter).await?;

    let cancel = CancellationToken::new();
    let (batch, rejected) = tokio::join!(
        service.publish_queue(None, &AssumeYes, &cancel),
        async {
            while !service.runner().is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            service.publish_one(&single.id, &cancel).await
        }
    );

    assert_eq!(batch?.success_count, 2);
    assert!(matches!(
        rejected.unwrap_err(),
        PostdeckError::Batch(BatchError::BatchAlreadyRunning)
    ));
    assert_eq!(client.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_queue_returns_partial_summary() -> Result<()> {
    let client = Arc::new(MockPublishClient::success());
    let temp_dir = TempDir::new()?;
    let store = ContentStore::new(temp_dir.path().join("queue.db").to_str().unwrap()).await?;
    let config = Config::from_toml("[pacing]\nsuccess_delay = \"10s\"\nfailure_delay = \"10s\"\n")?;
    let service = PostdeckService::with_client(config, store, client.clone());

    for title in ["a", "b", "c"] {
        queue(&service, title, Some("x.png"), Destination::Instagram).await?;
    }

    let cancel = CancellationToken::new();
    let (summary, _) = tokio::join!(
        service.publish_queue(None, &AssumeYes, &cancel),
        async {
            while client.call_count() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            cancel.cancel();
        }
    );

    let summary = summary?;
    assert!(summary.cancelled);
    assert_eq!(summary.attempted(), 1);
    assert_eq!(summary.total_count, 3);
    assert_eq!(client.call_count(), 1);
    assert!(!service.runner().is_running());
    Ok(())
}

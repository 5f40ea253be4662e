//! Integration tests for a full watch session

use settlewatch::{Config, WatchSession};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(root: &TempDir) -> Config {
    let mut config = Config::default();
    config.watch.root = Some(root.path().to_path_buf());
    config.watch.file_extensions = vec![".csv".to_string()];
    config.watch.initial_timer_interval_secs = 1;
    config
}

#[tokio::test]
async fn test_session_rejects_missing_root() {
    let mut config = Config::default();
    config.watch.file_extensions = vec![".csv".to_string()];
    assert!(WatchSession::start(&config).await.is_err());

    config.watch.root = Some("/definitely/not/here".into());
    let err = WatchSession::start(&config).await.err().unwrap();
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn test_session_rejects_empty_filter() {
    let root = TempDir::new().unwrap();
    let mut config = config_for(&root);
    config.watch.file_extensions.clear();
    assert!(WatchSession::start(&config).await.is_err());
}

#[tokio::test]
async fn test_session_posts_ready_files_to_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let mut config = config_for(&root);
    config.notifier.webhook_url = Some(format!("{}/hook", server.uri()));

    let session = WatchSession::start(&config).await.unwrap();
    assert_eq!(session.root(), Some(root.path()));
    let mut ready = session.watcher().subscribe_ready();
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::fs::write(root.path().join("orders.csv"), "id\n1\n")
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(10), ready.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.name, "orders.csv");

    // Shutdown waits for the webhook consumer to drain
    session.shutdown().await.unwrap();
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: String = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("File changed: "), "{body}");
    assert!(body.contains("orders.csv"), "{body}");
}

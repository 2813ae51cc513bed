//! Integration tests for the library refresh notifier.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{Harness, ScriptedProber};
use discforge::failures::FailureCache;
use discforge::notifications::{NotificationManager, RefreshClient};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager(server: &MockServer) -> NotificationManager {
    NotificationManager::with_client(Some(RefreshClient::new(
        &server.uri(),
        "secret-key",
        Duration::from_secs(2),
    )))
}

#[tokio::test]
async fn refresh_sends_token_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Library/Refresh"))
        .and(header("X-Emby-Token", "secret-key"))
        .and(header("Authorization", "MediaBrowser Token=\"secret-key\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = RefreshClient::new(&format!("{}/", server.uri()), "secret-key", Duration::from_secs(2));
    client.refresh_library().await.unwrap();
}

#[tokio::test]
async fn refresh_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Library/Refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let client = RefreshClient::new(&server.uri(), "wrong", Duration::from_secs(2));
    let err = client.refresh_library().await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn slow_endpoint_never_blocks_the_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Library/Refresh"))
        .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let notifier = manager(&server);
    let start = std::time::Instant::now();
    notifier.notify_descriptor_written(Path::new("/lib/a-mediainfo.json"));
    assert!(start.elapsed() < Duration::from_secs(1));

    // Draining is bounded even though the request is still in flight.
    notifier.drain(Duration::from_millis(200)).await;
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn disabled_config_has_no_targets() {
    let config = discforge::config::Config::default();
    assert!(!NotificationManager::new(&config).has_targets());

    let mut config = discforge::config::Config::default();
    config.notify.enabled = true;
    config.notify.url = Some("http://127.0.0.1:1".into());
    assert!(NotificationManager::new(&config).has_targets());
}

#[tokio::test]
async fn scan_notifies_once_per_written_descriptor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Library/Refresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let h = Harness::new();
    h.add_title("One", "one.iso");
    h.add_title("Two", "two.iso");

    let orchestrator = h
        .orchestrator(
            Arc::new(ScriptedProber::healthy()),
            FailureCache::in_memory(3).unwrap(),
        )
        .with_notifier(Arc::new(manager(&server)));

    let report = orchestrator.scan(&h.root).await.unwrap();
    assert_eq!(report.processed.len(), 2);
    // scan() drains before returning, so both requests have landed.
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_endpoint_does_not_fail_scan() {
    let h = Harness::new();
    let placeholder = h.add_title("One", "one.iso");

    let notifier = NotificationManager::with_client(Some(RefreshClient::new(
        "http://127.0.0.1:1",
        "k",
        Duration::from_millis(500),
    )));
    let orchestrator = h
        .orchestrator(
            Arc::new(ScriptedProber::healthy()),
            FailureCache::in_memory(3).unwrap(),
        )
        .with_notifier(Arc::new(notifier));

    let report = orchestrator.scan(&h.root).await.unwrap();
    assert_eq!(report.processed.len(), 1);
    assert!(h.descriptor_for(&placeholder).exists());
}

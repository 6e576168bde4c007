//! Integration tests for the shared push connection and per-keyword
//! subscriptions, driven against an in-process mock push server:
//!
//! - Keyword gating: < 2 chars never connects, >= 2 chars subscribes.
//! - Channel routing, broadcast fallback and cross-topic isolation.
//! - Reference-counted teardown and idempotent unsubscribe.
//! - Reconnect with resubscription after a server-side close.
//! - Heartbeat pings and the liveness-timeout reconnect.
//! - URL-override mode (keyword in the query string, no control messages).
//!
//! Timings are shortened via `SkillSyncTimeouts` and
//! `ConnectionOptions::with_reconnect_step_ms` so the suite stays fast; the
//! default backoff arithmetic has its own unit coverage.

mod common;

use common::MockPushServer;
use serde_json::json;
use skillsync_link::{
    ConnectionOptions, ConnectionState, SkillSyncClient, SkillSyncTimeouts,
};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn client_for(server: &MockPushServer) -> SkillSyncClient {
    SkillSyncClient::builder()
        .api_base_url("http://127.0.0.1:1")
        .ws_url(server.url())
        .timeouts(SkillSyncTimeouts::fast())
        .connection_options(ConnectionOptions::new().with_reconnect_step_ms(50))
        .build()
        .expect("client")
}

fn jobs_updated(channel: &str, keyword: &str, new_jobs: u32) -> serde_json::Value {
    json!({
        "channel": channel,
        "type": "jobs_updated",
        "keyword": keyword,
        "new_jobs": new_jobs,
    })
}

#[tokio::test]
async fn test_keyword_subscription_reaches_server() {
    let server = MockPushServer::start().await;
    let client = client_for(&server);

    let sub = client.subscribe_jobs("engineer", 1).await;
    assert!(sub.is_active());
    assert_eq!(sub.topic(), Some("jobs:updated:engineer"));

    server.wait_for_connections(1, WAIT).await;
    server
        .wait_for_channel_action("subscribe", "jobs:updated:engineer", WAIT)
        .await;

    common::wait_until(WAIT, || sub.status() == ConnectionState::Connected, "connected").await;
    client.shutdown().await;
}

#[tokio::test]
async fn test_short_keyword_never_connects() {
    let server = MockPushServer::start().await;
    let client = client_for(&server);

    // One character after trimming: below the activation threshold.
    let sub = client.subscribe_jobs("  a ", 1).await;
    assert!(!sub.is_active());
    assert!(!sub.has_error());
    assert_eq!(sub.status(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.connection_count(), 0);
}

#[tokio::test]
async fn test_event_routing_and_isolation() {
    let server = MockPushServer::start().await;
    let client = client_for(&server);

    let mut rust_sub = client.subscribe_jobs("rust", 1).await;
    let mut go_sub = client.subscribe_jobs("golang", 1).await;

    server
        .wait_for_channel_action("subscribe", "jobs:updated:rust", WAIT)
        .await;
    server
        .wait_for_channel_action("subscribe", "jobs:updated:golang", WAIT)
        .await;
    // Both topics share one physical connection.
    assert_eq!(server.connection_count(), 1);

    server.send_json(jobs_updated("jobs:updated:rust", "rust", 2));

    let event = tokio::time::timeout(WAIT, rust_sub.next_event())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(event.keyword, "rust");
    assert_eq!(event.new_jobs, 2);
    assert!(rust_sub.is_refreshing());
    assert_eq!(rust_sub.last_event().unwrap().new_jobs, 2);

    // The other topic saw nothing.
    assert!(go_sub.try_event().is_none());

    // A channel-less message broadcasts to every subscriber.
    server.send_json(json!({"type": "jobs_updated", "keyword": "any", "new_jobs": 1}));
    let broadcast = tokio::time::timeout(WAIT, go_sub.next_event())
        .await
        .expect("broadcast in time")
        .expect("broadcast");
    assert_eq!(broadcast.keyword, "any");

    client.shutdown().await;
}

#[tokio::test]
async fn test_unknown_channel_is_dropped() {
    let server = MockPushServer::start().await;
    let client = client_for(&server);

    let mut sub = client.subscribe_jobs("rust", 1).await;
    server
        .wait_for_channel_action("subscribe", "jobs:updated:rust", WAIT)
        .await;

    server.send_json(jobs_updated("jobs:updated:elsewhere", "elsewhere", 9));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sub.try_event().is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn test_last_unsubscribe_tears_down_connection() {
    let server = MockPushServer::start().await;
    let client = client_for(&server);

    let mut first = client.subscribe_jobs("rust", 1).await;
    let mut second = client.subscribe_jobs("rust", 1).await;
    server.wait_for_connections(1, WAIT).await;

    first.close().await;
    // One subscriber remains; the socket must stay up.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    second.close().await;
    server
        .wait_for_channel_action("unsubscribe", "jobs:updated:rust", WAIT)
        .await;
    common::wait_until(
        WAIT,
        || client.connection_state() == ConnectionState::Disconnected,
        "teardown",
    )
    .await;

    // Redundant closes after teardown never panic or reconnect.
    first.close().await;
    second.close().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_reconnect_resubscribes_topics() {
    let server = MockPushServer::start().await;
    let client = client_for(&server);

    let mut sub = client.subscribe_jobs("engineer", 1).await;
    server.wait_for_connections(1, WAIT).await;
    server
        .wait_for_channel_action("subscribe", "jobs:updated:engineer", WAIT)
        .await;

    server.close_current();
    server.wait_for_connections(2, WAIT).await;

    // After the reconnect the topic is subscribed again without any caller
    // involvement, and events flow.
    common::wait_until(
        WAIT,
        || server.channels_with_action("subscribe").len() >= 2,
        "resubscribe",
    )
    .await;
    common::wait_until(WAIT, || client.connection_state() == ConnectionState::Connected, "reconnected")
        .await;

    server.send_json(jobs_updated("jobs:updated:engineer", "engineer", 1));
    let event = tokio::time::timeout(WAIT, sub.next_event())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(event.keyword, "engineer");

    client.shutdown().await;
}

#[tokio::test]
async fn test_heartbeat_pings_flow() {
    let server = MockPushServer::start().await;
    let client = SkillSyncClient::builder()
        .api_base_url("http://127.0.0.1:1")
        .ws_url(server.url())
        .timeouts(
            SkillSyncTimeouts::builder()
                .connect_timeout(Duration::from_secs(2))
                .heartbeat_interval(Duration::from_millis(100))
                .pong_timeout(Duration::from_secs(5))
                .build(),
        )
        .build()
        .expect("client");

    let _sub = client.subscribe_jobs("rust", 1).await;
    server.wait_for_connections(1, WAIT).await;

    server.wait_for_type_count("ping", 3, WAIT).await;
    // Pongs kept the connection alive the whole time.
    assert_eq!(server.connection_count(), 1);
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    client.shutdown().await;
}

#[tokio::test]
async fn test_heartbeat_timeout_forces_reconnect() {
    let server = MockPushServer::start().await;
    server.set_auto_pong(false);

    let client = SkillSyncClient::builder()
        .api_base_url("http://127.0.0.1:1")
        .ws_url(server.url())
        .timeouts(
            SkillSyncTimeouts::builder()
                .connect_timeout(Duration::from_secs(2))
                .heartbeat_interval(Duration::from_millis(100))
                .pong_timeout(Duration::from_millis(250))
                .build(),
        )
        .connection_options(ConnectionOptions::new().with_reconnect_step_ms(50))
        .build()
        .expect("client");

    let _sub = client.subscribe_jobs("rust", 1).await;
    server.wait_for_connections(1, WAIT).await;

    // With pongs withheld, the silence window forces a fresh connection.
    server.wait_for_connections(2, Duration::from_secs(10)).await;

    client.shutdown().await;
}

#[tokio::test]
async fn test_keyword_in_url_mode_skips_control_messages() {
    let server = MockPushServer::start().await;
    let client = SkillSyncClient::builder()
        .api_base_url("http://127.0.0.1:1")
        .ws_url(server.url())
        .timeouts(SkillSyncTimeouts::fast())
        .connection_options(
            ConnectionOptions::new()
                .with_keyword_in_url(true)
                .with_reconnect_step_ms(50),
        )
        .build()
        .expect("client");

    let mut sub = client.subscribe_jobs("engineer", 1).await;
    assert!(sub.is_active());
    server.wait_for_connections(1, WAIT).await;

    // The URL carries the keyword; no subscribe control message is sent.
    let uris = server.request_uris();
    assert!(uris[0].contains("keyword=engineer"), "uri: {}", uris[0]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.channels_with_action("subscribe").is_empty());

    // Events still reach the subscriber (channel routing by topic).
    server.send_json(jobs_updated("jobs:updated:engineer", "engineer", 4));
    let event = tokio::time::timeout(WAIT, sub.next_event())
        .await
        .expect("event in time")
        .expect("event");
    assert_eq!(event.new_jobs, 4);

    // A server-side drop reconnects without any resubscribe frames.
    server.close_current();
    server.wait_for_connections(2, WAIT).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(server.channels_with_action("subscribe").is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_waits_for_backoff_delay() {
    let server = MockPushServer::start().await;
    let client = SkillSyncClient::builder()
        .api_base_url("http://127.0.0.1:1")
        .ws_url(server.url())
        .timeouts(SkillSyncTimeouts::fast())
        .connection_options(ConnectionOptions::new().with_reconnect_step_ms(300))
        .build()
        .expect("client");

    let _sub = client.subscribe_jobs("rust", 1).await;
    server.wait_for_connections(1, WAIT).await;

    let before = std::time::Instant::now();
    server.close_current();
    server.wait_for_connections(2, WAIT).await;

    // The first reconnect is scheduled one backoff step out.
    assert!(
        before.elapsed() >= Duration::from_millis(250),
        "reconnected too early: {:?}",
        before.elapsed()
    );

    client.shutdown().await;
}

//! Tests for the friend request feed against a mocked gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use super::*;
use crate::domain::friend_request::{FriendRequestStatus, UserRef};
use crate::domain::ports::rest::{GatewayError, MockFriendRequestGateway};
use crate::domain::user::UserId;

const WAIT: Duration = Duration::from_secs(2);

fn request(id: &str) -> FriendRequest {
    FriendRequest::new(
        FriendRequestId::new(id),
        UserRef::new(UserId::new(1), "Robin"),
        Utc::now(),
    )
}

fn resolved(id: &str) -> FriendRequest {
    serde_json::from_value(serde_json::json!({
        "friendRequestId": id,
        "status": "accepted",
        "sender": { "id": 1 }
    }))
    .expect("row decodes")
}

fn feed_with(mock: MockFriendRequestGateway, page_size: usize) -> FriendRequestFeed {
    FriendRequestFeed::new(Arc::new(mock), page_size)
}

#[tokio::test]
async fn backfill_drops_resolved_rows_but_keeps_raw_paging() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_fetch_page()
        .withf(|page, limit| *page == 1 && *limit == 3)
        .times(1)
        .return_once(|_, _| Ok(vec![request("a"), resolved("b"), request("c")]));
    let feed = feed_with(mock, 3);

    feed.load_more().await;

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.items.len(), 2, "resolved row is dropped");
    assert!(snapshot.has_more, "raw count filled the page");
    assert_eq!(snapshot.page, 2);
}

#[tokio::test]
async fn accept_removes_and_decrements_before_the_network_resolves() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_accept()
        .withf(|id| id.as_str() == "a")
        .times(1)
        .return_once(|_| Ok(()));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(request("a"));
    feed.apply_live_event(request("b"));
    assert_eq!(feed.pending_count(), 2);

    let confirmation = feed.accept(&FriendRequestId::new("a"));
    // Observable before the confirmation resolves.
    assert_eq!(feed.snapshot().items.len(), 1);
    assert_eq!(feed.pending_count(), 1);

    timeout(WAIT, confirmation.expect("first call confirms"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");
}

#[tokio::test]
async fn double_accept_confirms_only_once() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_accept().times(1).return_once(|_| Ok(()));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(request("a"));

    let first = feed.accept(&FriendRequestId::new("a"));
    assert!(first.is_some());
    assert!(
        feed.accept(&FriendRequestId::new("a")).is_none(),
        "second click resolves nothing"
    );
    assert_eq!(feed.pending_count(), 0, "counter dropped exactly once");

    timeout(WAIT, first.expect("confirmation spawned"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");
}

#[tokio::test]
async fn decline_confirms_through_the_decline_endpoint() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_decline()
        .withf(|id| id.as_str() == "a")
        .times(1)
        .return_once(|_| Ok(()));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(request("a"));

    let confirmation = feed.decline(&FriendRequestId::new("a"));
    assert!(feed.snapshot().items.is_empty());

    timeout(WAIT, confirmation.expect("confirmation spawned"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");
}

#[tokio::test]
async fn failed_confirmation_keeps_the_optimistic_removal() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_accept()
        .times(1)
        .return_once(|_| Err(GatewayError::transport("connection reset")));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(request("a"));

    let confirmation = feed.accept(&FriendRequestId::new("a"));
    timeout(WAIT, confirmation.expect("confirmation spawned"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");

    assert!(feed.snapshot().items.is_empty(), "no rollback on failure");
    assert_eq!(feed.pending_count(), 0);
}

#[tokio::test]
async fn resolved_request_never_returns_through_backfill() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_accept().times(1).return_once(|_| Ok(()));
    mock.expect_fetch_page()
        .times(1)
        .return_once(|_, _| Ok(vec![request("a"), request("b")]));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(request("a"));
    let confirmation = feed.accept(&FriendRequestId::new("a"));

    feed.load_more().await;

    let snapshot = feed.snapshot();
    let ids: Vec<&str> = snapshot
        .items
        .iter()
        .map(|r| r.id().as_str())
        .collect();
    assert_eq!(ids, vec!["b"], "the tombstone wins over backfill");

    timeout(WAIT, confirmation.expect("confirmation spawned"))
        .await
        .expect("confirmation resolves")
        .expect("task completes");
}

#[tokio::test]
async fn live_events_move_the_counter_and_ignore_resolved_payloads() {
    let feed = feed_with(MockFriendRequestGateway::new(), 3);

    assert!(feed.apply_live_event(request("a")));
    assert!(!feed.apply_live_event(request("a")), "duplicate dropped");
    assert!(
        !feed.apply_live_event(resolved("b")),
        "resolved payload ignored"
    );

    assert_eq!(feed.pending_count(), 1);
    assert_eq!(feed.snapshot().items.len(), 1);
    assert_eq!(
        feed.snapshot().items.first().map(FriendRequest::status),
        Some(FriendRequestStatus::Pending)
    );
}

#[tokio::test]
async fn pending_count_refresh_reads_the_dedicated_endpoint() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_fetch_pending_count()
        .times(1)
        .return_once(|| Ok(12));
    let feed = feed_with(mock, 3);

    feed.refresh_pending_count().await;

    assert_eq!(feed.pending_count(), 12);
}

#[tokio::test]
async fn failed_count_refresh_keeps_the_previous_value() {
    let mut mock = MockFriendRequestGateway::new();
    mock.expect_fetch_pending_count()
        .times(1)
        .return_once(|| Err(GatewayError::timeout("deadline exceeded")));
    let feed = feed_with(mock, 3);
    feed.apply_live_event(request("a"));

    feed.refresh_pending_count().await;

    assert_eq!(feed.pending_count(), 1);
}

/// Gateway whose count fetch blocks until the test opens the gate, so a
/// reset can land while the request is in flight.
struct GatedCountGateway {
    gate: Semaphore,
    started: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl FriendRequestGateway for GatedCountGateway {
    async fn fetch_page(
        &self,
        _page: u32,
        _limit: usize,
    ) -> Result<Vec<FriendRequest>, GatewayError> {
        Ok(Vec::new())
    }

    async fn fetch_pending_count(&self) -> Result<u64, GatewayError> {
        self.started
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let _permit = self.gate.acquire().await.expect("gate open");
        Ok(99)
    }

    async fn accept(&self, _id: &FriendRequestId) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn decline(&self, _id: &FriendRequestId) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[tokio::test]
async fn count_fetched_before_a_reset_is_discarded() {
    let gateway = Arc::new(GatedCountGateway {
        gate: Semaphore::new(0),
        started: std::sync::atomic::AtomicBool::new(false),
    });
    let as_port: Arc<dyn FriendRequestGateway> = Arc::clone(&gateway) as Arc<dyn FriendRequestGateway>;
    let feed = Arc::new(FriendRequestFeed::new(as_port, 3));

    let refresher = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.refresh_pending_count().await }
    });
    while !gateway.started.load(std::sync::atomic::Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Identity changes while the count request is parked at the gate.
    feed.reset();
    gateway.gate.add_permits(1);
    timeout(WAIT, refresher)
        .await
        .expect("refresh finishes")
        .expect("refresher task completes");

    assert_eq!(feed.pending_count(), 0, "stale count never lands");
}

#[tokio::test]
async fn reset_clears_items_and_counter() {
    let feed = feed_with(MockFriendRequestGateway::new(), 3);
    feed.apply_live_event(request("a"));
    assert_eq!(feed.pending_count(), 1);

    feed.reset();

    assert!(feed.snapshot().items.is_empty());
    assert_eq!(feed.pending_count(), 0);
    assert!(feed.snapshot().has_more);
}

//! Client workflow tests against a mock quote API
//!
//! - successful actions replace the projection with the server's quote
//! - failed actions restore the exact snapshot and publish an error notice
//! - validation failures never reach the network
//! - results for unmounted views are dropped but the cache is reconciled

use std::sync::Arc;

use chrono::{Duration, Utc};
use httpmock::prelude::*;
use quote_desk_client::{
    ClientConfig, ClientError, Delivery, EntityKey, HttpQuoteApi, NoticeBoard, NoticeLevel,
    OptimisticMutationCoordinator, QuoteCache, QuoteWorkflow, ViewScope, FALLBACK_MESSAGE,
};
use rust_decimal::Decimal;
use serde_json::json;
use shared::{
    Actor, IssueTarget, NegotiationError, NewQuote, OrderStage, Party, Quote, QuoteItem,
    QuoteStateMachine, QuoteStatus, SUPERSEDED_REJECTION_REASON,
};
use uuid::Uuid;

const TOKEN: &str = "test-token";

// ============================================================================
// Fixtures
// ============================================================================

fn actor() -> Actor {
    Actor::user(Uuid::new_v4(), "Sales Admin")
}

fn open_quote(order_id: Uuid, total: i64) -> Quote {
    let now = Utc::now();
    let mut quote = Quote::draft(
        NewQuote {
            order_id: Some(order_id),
            vendor: Party::new(Uuid::new_v4(), "PT Etching Jaya", None),
            customer: Party::new(Uuid::new_v4(), "CV Maju", None),
            currency: "IDR".to_string(),
            items: vec![QuoteItem::new("Brass plate", 1, Decimal::from(total))],
            tax_rate: Decimal::ZERO,
            valid_until: now + Duration::days(30),
        },
        &actor(),
        now,
    );
    QuoteStateMachine::issue(&mut quote, &actor(), IssueTarget::Open, now).unwrap();
    quote
}

struct Harness {
    server: MockServer,
    workflow: QuoteWorkflow,
    notices: Arc<NoticeBoard>,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start_async().await;
        let api = HttpQuoteApi::new(ClientConfig::new(server.base_url(), TOKEN)).unwrap();
        let notices = Arc::new(NoticeBoard::new());
        let workflow = QuoteWorkflow::new(
            Arc::new(api),
            Arc::new(OptimisticMutationCoordinator::new(QuoteCache::new())),
            notices.clone(),
            actor(),
        );
        Self {
            server,
            workflow,
            notices,
        }
    }

    /// Load a quote into the cache through `GET /quotes/{id}`
    async fn seed(&self, quote: &Quote) {
        let path = format!("/api/v1/quotes/{}", quote.id);
        let body = json!({ "data": quote });
        let mock = self
            .server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200).json_body(body);
            })
            .await;
        let loaded = self.workflow.load(&ViewScope::new(), quote.id).await;
        assert!(matches!(loaded, Delivery::Delivered(Ok(_))));
        mock.delete_async().await;
    }

    fn cached(&self, id: Uuid) -> Option<Quote> {
        self.workflow.coordinator().cache().get(&EntityKey::Quote(id))
    }
}

// ============================================================================
// Success paths
// ============================================================================

#[tokio::test]
async fn test_accept_commits_server_quote_and_siblings() {
    let h = Harness::start().await;
    let order_id = Uuid::new_v4();
    let quote = open_quote(order_id, 1_000_000);
    let sibling = open_quote(order_id, 1_100_000);
    h.seed(&quote).await;
    h.seed(&sibling).await;

    let now = Utc::now();
    let mut accepted = quote.clone();
    QuoteStateMachine::accept(&mut accepted, &actor(), None, now).unwrap();
    let mut rejected = sibling.clone();
    QuoteStateMachine::reject(&mut rejected, &actor(), SUPERSEDED_REJECTION_REASON, now).unwrap();

    let mock = h
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/api/v1/quotes/{}/accept", quote.id))
                .header("authorization", format!("Bearer {}", TOKEN));
            then.status(200).json_body(json!({
                "data": accepted,
                "affected_quotes": [rejected],
                "order_stage": "customer_quote",
            }));
        })
        .await;

    let outcome = h
        .workflow
        .accept(&ViewScope::new(), quote.id, None)
        .await
        .into_result()
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(outcome.order_stage, Some(OrderStage::CustomerQuote));
    assert_eq!(h.cached(quote.id), Some(accepted));
    assert_eq!(h.cached(sibling.id).unwrap().status(), QuoteStatus::Rejected);
    assert_eq!(h.notices.drain()[0].level, NoticeLevel::Success);
    assert_eq!(h.workflow.coordinator().pending_count(), 0);
}

#[tokio::test]
async fn test_counter_fetches_uncached_quote_first() {
    let h = Harness::start().await;
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    let mut countered = quote.clone();
    QuoteStateMachine::counter(&mut countered, &actor(), Decimal::from(900_000), None, Utc::now())
        .unwrap();

    let get = h
        .server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/api/v1/quotes/{}", quote.id));
            then.status(200).json_body(json!({ "data": quote }));
        })
        .await;
    let post = h
        .server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/api/v1/quotes/{}/counter", quote.id))
                .json_body(json!({ "price": "900000", "notes": null }));
            then.status(200).json_body(json!({ "data": countered }));
        })
        .await;

    let result = h
        .workflow
        .counter(&ViewScope::new(), quote.id, Decimal::from(900_000), None)
        .await;

    assert!(matches!(result, Delivery::Delivered(Ok(_))));
    get.assert_async().await;
    post.assert_async().await;
    let cached = h.cached(quote.id).unwrap();
    assert_eq!(cached.round(), 1);
    assert_eq!(cached.grand_total(), Decimal::from(900_000));
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_server_refusal_restores_snapshot() {
    let h = Harness::start().await;
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    h.seed(&quote).await;

    h.server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/v1/quotes/{}/accept", quote.id));
            then.status(422).json_body(json!({
                "message": "Quote has expired",
                "code": "QUOTE_EXPIRED",
                "rule": { "kind": "quote_expired" },
            }));
        })
        .await;

    let result = h
        .workflow
        .accept(&ViewScope::new(), quote.id, None)
        .await
        .into_result()
        .unwrap();

    assert_eq!(
        result.unwrap_err(),
        ClientError::Domain(NegotiationError::QuoteExpired)
    );
    assert_eq!(h.cached(quote.id), Some(quote));
    let notices = h.notices.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "Quote has expired");
}

#[tokio::test]
async fn test_server_error_without_body_uses_fallback() {
    let h = Harness::start().await;
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    h.seed(&quote).await;

    h.server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/v1/quotes/{}/cancel", quote.id));
            then.status(502).body("bad gateway");
        })
        .await;

    let result = h.workflow.cancel(&ViewScope::new(), quote.id, None).await;

    assert!(matches!(
        result,
        Delivery::Delivered(Err(ClientError::Server { status: 502, .. }))
    ));
    assert_eq!(h.cached(quote.id), Some(quote));
    assert_eq!(h.notices.drain()[0].message, FALLBACK_MESSAGE);
}

#[tokio::test]
async fn test_max_rounds_is_reported_by_server() {
    let h = Harness::start().await;
    let mut quote = open_quote(Uuid::new_v4(), 1_000_000);
    for i in 0..5 {
        let price = Decimal::from(900_000 - i * 1_000);
        QuoteStateMachine::counter(&mut quote, &actor(), price, None, Utc::now()).unwrap();
    }
    h.seed(&quote).await;

    let mock = h
        .server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/v1/quotes/{}/counter", quote.id));
            then.status(422).json_body(json!({
                "message": "Maximum negotiation rounds reached (5 of 5)",
                "code": "MAX_ROUNDS_REACHED",
                "rule": { "kind": "max_rounds_reached", "round": 5, "max": 5 },
            }));
        })
        .await;

    let result = h
        .workflow
        .counter(&ViewScope::new(), quote.id, Decimal::from(800_000), None)
        .await;

    mock.assert_async().await;
    assert!(matches!(
        result,
        Delivery::Delivered(Err(ClientError::Domain(NegotiationError::MaxRoundsReached { round: 5, max: 5 })))
    ));
    assert_eq!(h.cached(quote.id), Some(quote));
}

#[tokio::test]
async fn test_short_rejection_reason_never_sent() {
    let h = Harness::start().await;
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    h.seed(&quote).await;

    let mock = h
        .server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/v1/quotes/{}/reject", quote.id));
            then.status(200);
        })
        .await;

    let result = h.workflow.reject(&ViewScope::new(), quote.id, "no").await;

    assert_eq!(mock.hits_async().await, 0);
    match result {
        Delivery::Delivered(Err(err)) => assert!(err.is_validation()),
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert!(h.notices.notices().is_empty());
    assert_eq!(h.cached(quote.id).unwrap().history().len(), quote.history().len());
}

#[tokio::test]
async fn test_network_failure_rolls_back() {
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    // Nothing listens on port 9 of localhost
    let api = HttpQuoteApi::new(ClientConfig::new("http://127.0.0.1:9", TOKEN)).unwrap();
    let coordinator = Arc::new(OptimisticMutationCoordinator::new(QuoteCache::new()));
    coordinator.store_fetched([quote.clone()]);
    let notices = Arc::new(NoticeBoard::new());
    let workflow = QuoteWorkflow::new(Arc::new(api), coordinator.clone(), notices.clone(), actor());

    let result = workflow.accept(&ViewScope::new(), quote.id, None).await;

    assert!(matches!(result, Delivery::Delivered(Err(ClientError::Network(_)))));
    assert_eq!(coordinator.cache().get(&EntityKey::of(&quote)), Some(quote));
    assert_eq!(notices.drain()[0].message, FALLBACK_MESSAGE);
}

// ============================================================================
// Scope, duplicates and session
// ============================================================================

#[tokio::test]
async fn test_unmounted_view_gets_nothing_but_cache_is_reconciled() {
    let h = Harness::start().await;
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    h.seed(&quote).await;
    let mut accepted = quote.clone();
    QuoteStateMachine::accept(&mut accepted, &actor(), None, Utc::now()).unwrap();

    h.server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/v1/quotes/{}/accept", quote.id));
            then.status(200).json_body(json!({ "data": accepted }));
        })
        .await;

    let scope = ViewScope::new();
    scope.unmount();
    let result = h.workflow.accept(&scope, quote.id, None).await;

    assert!(result.is_dropped());
    assert!(h.notices.notices().is_empty());
    assert_eq!(h.cached(quote.id).unwrap().status(), QuoteStatus::Accepted);
}

#[tokio::test]
async fn test_start_create_routes_to_existing_quote() {
    let h = Harness::start().await;
    let order_id = Uuid::new_v4();
    let quote = open_quote(order_id, 1_000_000);

    h.server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/quotes/check-existing")
                .query_param("order_id", order_id.to_string());
            then.status(200).json_body(json!({
                "data": { "has_active_quote": true, "quote": quote }
            }));
        })
        .await;

    let route = h
        .workflow
        .start_create(&ViewScope::new(), order_id, None)
        .await
        .into_result()
        .unwrap()
        .unwrap();

    assert_eq!(route, shared::CreateRoute::EditExisting(Box::new(quote.clone())));
    assert!(h.cached(quote.id).is_some());
}

#[tokio::test]
async fn test_duplicate_create_is_a_conflict() {
    let h = Harness::start().await;
    h.server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/quotes");
            then.status(409).json_body(json!({
                "message": "Order already has an active quote for this vendor",
                "code": "DUPLICATE_QUOTE",
            }));
        })
        .await;

    let req = shared::CreateQuoteRequest {
        order_id: Some(Uuid::new_v4()),
        vendor: Party::new(Uuid::new_v4(), "PT Etching Jaya", None),
        customer: Party::new(Uuid::new_v4(), "CV Maju", None),
        currency: None,
        items: vec![QuoteItem::new("Brass plate", 1, Decimal::from(1_000))],
        tax_rate: None,
        valid_until: None,
        issue: None,
    };
    let result = h.workflow.create(&ViewScope::new(), req).await;

    assert!(matches!(result, Delivery::Delivered(Err(ClientError::Conflict(_)))));
    assert_eq!(
        h.notices.drain()[0].message,
        "Order already has an active quote for this vendor"
    );
}

#[tokio::test]
async fn test_logout_clears_cache() {
    let h = Harness::start().await;
    let quote = open_quote(Uuid::new_v4(), 1_000_000);
    h.seed(&quote).await;
    assert!(h.workflow.controls(quote.id).is_some());

    h.workflow.logout();

    assert!(h.cached(quote.id).is_none());
    assert!(h.workflow.controls(quote.id).is_none());
}

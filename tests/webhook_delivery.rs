//! End-to-end webhook delivery against a mock receiver

use std::sync::Arc;
use std::time::Duration;

use fulfillment::models::{CreateRequestInput, PageParams, Requirements, SubmitBidInput};
use fulfillment::store::{NewCreator, MIGRATOR};
use fulfillment::webhook::{DeliveryRecord, DeliveryStatus, DispatcherConfig};
use fulfillment::AppState;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup(config: DispatcherConfig) -> Arc<AppState> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    MIGRATOR.run(&pool).await.expect("Failed to run migrations");
    AppState::new(pool, config).unwrap()
}

fn manual_delivery() -> DispatcherConfig {
    DispatcherConfig {
        timeout: Duration::from_millis(300),
        deliver_on_enqueue: false,
        ..Default::default()
    }
}

async fn accepted_bid_flow(state: &AppState, webhook_url: &str) -> (Uuid, Uuid) {
    let org = state
        .store
        .create_organization("Tech Corp", "ops@techcorp.test", "key-1", Some(webhook_url))
        .await
        .unwrap();
    let creator = state
        .store
        .create_creator(NewCreator {
            name: "Alex".into(),
            email: "alex@creators.test".into(),
            skills: vec!["captioning".into()],
            is_verified: true,
            is_available: true,
            rating: 4.8,
        })
        .await
        .unwrap();

    let request = state
        .engine
        .create_request(
            org.id,
            CreateRequestInput {
                title: Some("Caption the keynote".into()),
                description: Some("Open captions for a 20 minute talk".into()),
                service_type: Some("captioning".into()),
                requirements: Some(Requirements {
                    skills: vec!["captioning".into()],
                    constraints: Default::default(),
                }),
                budget: Some(800.0),
                deadline: None,
            },
        )
        .await
        .unwrap();
    let bid = state
        .engine
        .submit_bid(SubmitBidInput {
            request_id: request.id,
            creator_id: creator.id,
            amount: 750.0,
            proposal: "Burned-in and sidecar captions".into(),
            estimated_days: Some(2),
        })
        .await
        .unwrap();
    state.engine.accept_bid(org.id, request.id, bid.id).await.unwrap();

    (org.id, request.id)
}

async fn records(state: &AppState, org_id: Uuid) -> Vec<DeliveryRecord> {
    state
        .dispatcher
        .deliveries()
        .list_for_organization(org_id, None, PageParams::new(1, 100))
        .await
        .unwrap()
        .data
}

#[tokio::test]
async fn test_status_change_is_delivered_with_envelope_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks"))
        .and(header("X-Webhook-Event", "request.status_changed"))
        .and(header("Content-Type", "application/json"))
        .and(header_exists("X-Webhook-Delivery"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let state = setup(manual_delivery()).await;
    let (org_id, request_id) = accepted_bid_flow(&state, &format!("{}/hooks", server.uri())).await;

    let pending = records(&state, org_id).await;
    assert_eq!(pending.len(), 1);
    assert!(state.dispatcher.deliver(pending[0].id).await);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["event"], "request.status_changed");
    assert_eq!(body["data"]["requestId"], request_id.to_string());
    assert_eq!(body["data"]["oldStatus"], "PENDING");
    assert_eq!(body["data"]["newStatus"], "BID_ACCEPTED");
    assert_eq!(body["data"]["project"]["creatorName"], "Alex");
    assert!(body["timestamp"].as_str().is_some());

    let delivered = records(&state, org_id).await;
    assert_eq!(delivered[0].status, DeliveryStatus::Success);
    assert_eq!(delivered[0].attempts, 1);
    assert!(delivered[0].last_attempt_at.is_some());
}

#[tokio::test]
async fn test_timeout_fails_then_retries_up_to_max() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let state = setup(manual_delivery()).await;
    let (org_id, _) = accepted_bid_flow(&state, &server.uri()).await;
    let record_id = records(&state, org_id).await[0].id;

    assert!(!state.dispatcher.deliver(record_id).await);
    let record = state.dispatcher.deliveries().get(record_id).await.unwrap();
    assert_eq!(record.status, DeliveryStatus::Failed);
    assert_eq!(record.attempts, 1);

    let report = state.dispatcher.retry_failed(3).await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(state.dispatcher.deliveries().get(record_id).await.unwrap().attempts, 2);

    state.dispatcher.retry_failed(3).await.unwrap();
    let record = state.dispatcher.deliveries().get(record_id).await.unwrap();
    assert_eq!(record.attempts, 3);
    assert_eq!(record.status, DeliveryStatus::Failed);

    // Exhausted records are excluded from further sweeps
    let report = state.dispatcher.sweep().await.unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(state.dispatcher.deliveries().get(record_id).await.unwrap().attempts, 3);
}

#[tokio::test]
async fn test_workflow_succeeds_when_endpoint_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let config = DispatcherConfig {
        timeout: Duration::from_millis(300),
        ..Default::default()
    };
    let state = setup(config).await;
    let (org_id, request_id) = accepted_bid_flow(&state, &server.uri()).await;

    // The accept committed regardless of the delivery outcome
    let request = state.store.get_request(request_id).await.unwrap();
    assert_eq!(request.status.as_str(), "BID_ACCEPTED");

    let mut record = records(&state, org_id).await.remove(0);
    for _ in 0..50 {
        if record.status != DeliveryStatus::Pending {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        record = state.dispatcher.deliveries().get(record.id).await.unwrap();
    }
    assert_eq!(record.status, DeliveryStatus::Failed);
    assert!(record.response.unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn test_success_is_never_redelivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let state = setup(manual_delivery()).await;
    let (org_id, _) = accepted_bid_flow(&state, &server.uri()).await;
    let record_id = records(&state, org_id).await[0].id;

    assert!(state.dispatcher.deliver(record_id).await);
    let report = state.dispatcher.retry_failed(3).await.unwrap();
    assert_eq!(report.attempted, 0);
    let report = state
        .dispatcher
        .deliver_stale_pending(chrono::Duration::seconds(-1))
        .await
        .unwrap();
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn test_send_test_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Webhook-Event", "webhook.test"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let state = setup(manual_delivery()).await;
    let org = state
        .store
        .create_organization("Tech Corp", "ops@techcorp.test", "key-1", Some(server.uri().as_str()))
        .await
        .unwrap();

    let (delivered, record) = state.dispatcher.send_test(org.id).await.unwrap();
    assert!(delivered);
    assert_eq!(record.status, DeliveryStatus::Success);
    assert_eq!(record.payload["message"], "This is a test webhook");
}

//! Webhook dispatcher
//!
//! The dispatcher handles:
//! - Enqueueing delivery records for organizations with a registered endpoint
//! - Fire-and-forget delivery of freshly enqueued records
//! - Single delivery attempts with a bounded timeout
//! - Retry sweeps over failed and orphaned records
//!
//! Workflow code and the dispatcher only share the persisted records; a
//! delivery task is handed a record id and reloads everything it needs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::event::{WebhookEvent, WebhookPayload};
use super::record::{DeliveryRecord, DeliveryStatus, DeliveryStore};
use crate::error::{AppError, Result};
use crate::store::Store;

/// Longest response body kept in a record's summary
const MAX_RESPONSE_CHARS: usize = 4096;

/// Dispatcher tuning
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Per-attempt HTTP timeout
    pub timeout: Duration,
    /// Attempts after which a failed record is left alone
    pub max_attempts: i64,
    /// Records picked up per sweep query
    pub batch_size: i64,
    /// Deliveries in flight at once
    pub concurrency: usize,
    /// Start delivery as soon as a record is enqueued
    pub deliver_on_enqueue: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            batch_size: 100,
            concurrency: 8,
            deliver_on_enqueue: true,
        }
    }
}

impl DispatcherConfig {
    /// Grace period before an unattempted PENDING record counts as orphaned
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.timeout * 2).unwrap_or_else(|_| chrono::Duration::seconds(20))
    }
}

/// Counts from one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl SweepReport {
    fn from_outcomes(outcomes: &[bool]) -> Self {
        let delivered = outcomes.iter().filter(|ok| **ok).count();
        Self {
            attempted: outcomes.len(),
            delivered,
            failed: outcomes.len() - delivered,
        }
    }

    fn merge(self, other: SweepReport) -> Self {
        Self {
            attempted: self.attempted + other.attempted,
            delivered: self.delivered + other.delivered,
            failed: self.failed + other.failed,
        }
    }
}

/// Delivers webhook notifications to organization endpoints
#[derive(Clone)]
pub struct Dispatcher {
    store: Store,
    deliveries: DeliveryStore,
    client: Client,
    config: DispatcherConfig,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    /// Create a new dispatcher with its own HTTP client
    pub fn new(store: Store, config: DispatcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("fulfillment-webhooks/1.0")
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            deliveries: DeliveryStore::new(store.pool().clone()),
            store,
            client,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            config,
        })
    }

    pub fn deliveries(&self) -> &DeliveryStore {
        &self.deliveries
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Record a notification intent for an organization.
    ///
    /// Returns `None` without writing anything when the organization has no
    /// registered endpoint. Never touches the network.
    pub async fn enqueue(
        &self,
        organization_id: Uuid,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<Option<DeliveryRecord>> {
        let organization = self.store.get_organization(organization_id).await?;

        let Some(url) = organization.webhook_url else {
            tracing::debug!(
                organization_id = %organization_id,
                event = %event,
                "No webhook endpoint registered, skipping"
            );
            return Ok(None);
        };

        let record = self
            .deliveries
            .create(organization_id, event, payload, &url)
            .await?;

        tracing::debug!(
            delivery_id = %record.id,
            organization_id = %organization_id,
            event = %event,
            "Enqueued webhook delivery"
        );

        Ok(Some(record))
    }

    /// Enqueue an event and hand it to a background delivery task.
    ///
    /// Called after the triggering workflow write has committed. Failures are
    /// logged and swallowed so the workflow caller still sees success.
    pub async fn notify(&self, organization_id: Uuid, event: WebhookEvent) -> Option<DeliveryRecord> {
        let name = event.name();
        match self.enqueue(organization_id, name, event.data()).await {
            Ok(Some(record)) => {
                if self.config.deliver_on_enqueue {
                    self.spawn_delivery(record.id);
                }
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(
                    organization_id = %organization_id,
                    event = %name,
                    error = %e,
                    "Failed to enqueue webhook delivery"
                );
                None
            }
        }
    }

    /// Deliver a record on a background task, bounded by the concurrency limit
    pub fn spawn_delivery(&self, record_id: Uuid) -> JoinHandle<bool> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let Ok(_permit) = dispatcher.permits.clone().acquire_owned().await else {
                return false;
            };
            dispatcher.deliver(record_id).await
        })
    }

    /// Make the first delivery attempt for a freshly enqueued record.
    ///
    /// The record is claimed first; once a sweep has picked it up this
    /// returns `false` without sending anything.
    pub async fn deliver(&self, record_id: Uuid) -> bool {
        match self.deliveries.claim_new(record_id, Utc::now()).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(delivery_id = %record_id, "Delivery already claimed, skipping");
                return false;
            }
            Err(e) => {
                tracing::error!(delivery_id = %record_id, error = %e, "Failed to claim delivery");
                return false;
            }
        }

        match self.deliveries.get(record_id).await {
            Ok(record) => self.attempt(&record, self.config.max_attempts).await,
            Err(e) => {
                tracing::error!(delivery_id = %record_id, error = %e, "Failed to load delivery record");
                false
            }
        }
    }

    /// Make one delivery attempt for a claimed record and persist its outcome.
    ///
    /// Returns whether the endpoint answered 2xx. Never fails: transport and
    /// store errors are logged and reported as `false`.
    async fn attempt(&self, record: &DeliveryRecord, max_attempts: i64) -> bool {
        if record.status == DeliveryStatus::Success {
            return true;
        }

        let payload = WebhookPayload {
            event: &record.event,
            data: &record.payload,
            timestamp: record.created_at.to_rfc3339(),
        };

        let outcome = self.post(record, &payload).await;
        let attempted_at = Utc::now();

        let (status, summary, delivered) = match outcome {
            Ok(summary) => (DeliveryStatus::Success, summary, true),
            Err(e) => (DeliveryStatus::Failed, e.to_string(), false),
        };

        if delivered {
            tracing::info!(
                delivery_id = %record.id,
                event = %record.event,
                attempt = record.attempts + 1,
                "Webhook delivered"
            );
        } else {
            tracing::warn!(
                delivery_id = %record.id,
                event = %record.event,
                attempt = record.attempts + 1,
                error = %summary,
                "Webhook delivery failed"
            );
        }

        match self
            .deliveries
            .record_attempt(record.id, status, &summary, attempted_at, max_attempts)
            .await
        {
            Ok(true) => delivered,
            Ok(false) => {
                tracing::warn!(delivery_id = %record.id, "Delivery record already final, attempt not recorded");
                false
            }
            Err(e) => {
                tracing::error!(delivery_id = %record.id, error = %e, "Failed to record delivery attempt");
                false
            }
        }
    }

    async fn post(&self, record: &DeliveryRecord, payload: &WebhookPayload<'_>) -> Result<String> {
        let response = self
            .client
            .post(&record.url)
            .header("X-Webhook-Event", record.event.as_str())
            .header("X-Webhook-Delivery", record.id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Delivery(format!("Request timeout ({}s)", self.config.timeout.as_secs_f64()))
                } else if e.is_connect() {
                    AppError::Delivery(format!("Connection failed: {}", e))
                } else {
                    AppError::Delivery(format!("Request error: {}", e))
                }
            })?;

        let status = response.status();
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_RESPONSE_CHARS)
            .collect();

        if !status.is_success() {
            return Err(AppError::Delivery(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        Ok(serde_json::json!({ "status": status.as_u16(), "body": body }).to_string())
    }

    /// Retry FAILED records that have fewer than `max_attempts` attempts.
    ///
    /// Processes one batch; each record is claimed before delivery so a
    /// concurrent sweep cannot attempt it too.
    pub async fn retry_failed(&self, max_attempts: i64) -> Result<SweepReport> {
        let records = self
            .deliveries
            .list_retryable(max_attempts, self.config.batch_size)
            .await?;

        let report = self
            .run_batch(records, move |record| async move {
                match self.deliveries.claim_failed(record.id, max_attempts, Utc::now()).await {
                    Ok(true) => Some(self.attempt(&record, max_attempts).await),
                    Ok(false) => None,
                    Err(e) => {
                        tracing::error!(delivery_id = %record.id, error = %e, "Failed to claim delivery");
                        None
                    }
                }
            })
            .await;

        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                "Retried failed webhooks"
            );
        }
        Ok(report)
    }

    /// Deliver PENDING records whose delivery task never finished
    pub async fn deliver_stale_pending(&self, older_than: chrono::Duration) -> Result<SweepReport> {
        let cutoff = Utc::now() - older_than;
        let records = self
            .deliveries
            .list_stale_pending(cutoff, self.config.max_attempts, self.config.batch_size)
            .await?;

        let report = self
            .run_batch(records, move |record| async move {
                match self.deliveries.claim_stale(record.id, cutoff, Utc::now()).await {
                    Ok(true) => Some(self.attempt(&record, self.config.max_attempts).await),
                    Ok(false) => None,
                    Err(e) => {
                        tracing::error!(delivery_id = %record.id, error = %e, "Failed to claim delivery");
                        None
                    }
                }
            })
            .await;

        if report.attempted > 0 {
            tracing::info!(
                attempted = report.attempted,
                delivered = report.delivered,
                "Delivered orphaned webhooks"
            );
        }
        Ok(report)
    }

    /// One full sweep: orphaned PENDING records, then FAILED retries
    pub async fn sweep(&self) -> Result<SweepReport> {
        let stale = self.deliver_stale_pending(self.config.stale_after()).await?;
        let retried = self.retry_failed(self.config.max_attempts).await?;
        Ok(stale.merge(retried))
    }

    async fn run_batch<'a, F, Fut>(&'a self, records: Vec<DeliveryRecord>, attempt: F) -> SweepReport
    where
        F: Fn(DeliveryRecord) -> Fut,
        Fut: std::future::Future<Output = Option<bool>> + 'a,
    {
        let outcomes: Vec<bool> = stream::iter(records)
            .map(attempt)
            .buffer_unordered(self.config.concurrency.max(1))
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await;

        SweepReport::from_outcomes(&outcomes)
    }

    /// Run [`Dispatcher::sweep`] on a fixed period until the task is aborted
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = dispatcher.sweep().await {
                    tracing::error!(error = %e, "Webhook sweep failed");
                }
            }
        })
    }

    /// Send a `webhook.test` event synchronously
    pub async fn send_test(&self, organization_id: Uuid) -> Result<(bool, DeliveryRecord)> {
        let event = WebhookEvent::test();
        let record = self
            .enqueue(organization_id, event.name(), event.data())
            .await?
            .ok_or_else(|| AppError::Validation("No webhook URL registered".to_string()))?;

        let delivered = self.deliver(record.id).await;
        let record = self.deliveries.get(record.id).await?;
        Ok((delivered, record))
    }
}

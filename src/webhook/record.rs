//! Persisted delivery records
//!
//! A record is created PENDING when an event is enqueued. Only the
//! dispatcher mutates it afterwards, and only its status/attempt fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Page, PageParams, Pagination};
use crate::store::{parse_status, parse_uuid};

/// Outcome of the latest delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Success => "SUCCESS",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeliveryStatus::Pending),
            "SUCCESS" => Ok(DeliveryStatus::Success),
            "FAILED" => Ok(DeliveryStatus::Failed),
            _ => Err(format!("Invalid delivery status: {}", s)),
        }
    }
}

/// One outbound notification and the outcome of its latest attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
    pub url: String,
    pub status: DeliveryStatus,
    pub attempts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Store for delivery records
#[derive(Clone)]
pub struct DeliveryStore {
    pool: SqlitePool,
}

impl DeliveryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        event: &str,
        payload: serde_json::Value,
        url: &str,
    ) -> Result<DeliveryRecord> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let payload_text = serde_json::to_string(&payload)
            .map_err(|e| AppError::Internal(format!("Invalid payload: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO delivery_records (id, organization_id, event, payload, url, status, attempts, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(event)
        .bind(payload_text)
        .bind(url)
        .bind(DeliveryStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(DeliveryRecord {
            id,
            organization_id,
            event: event.to_string(),
            payload,
            url: url.to_string(),
            status: DeliveryStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            response: None,
            created_at: now,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<DeliveryRecord> {
        sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, organization_id, event, payload, url, status, attempts, last_attempt_at, response, created_at
            FROM delivery_records
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Delivery record {} not found", id)))?
        .try_into()
    }

    /// Record the outcome of one attempt.
    ///
    /// A record that already reached SUCCESS or `max_attempts` is left
    /// untouched; returns whether the row was updated.
    pub async fn record_attempt(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        response: &str,
        attempted_at: DateTime<Utc>,
        max_attempts: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_records
            SET status = ?, attempts = attempts + 1, last_attempt_at = ?, response = ?
            WHERE id = ? AND status != 'SUCCESS' AND attempts < ?
            "#,
        )
        .bind(status.as_str())
        .bind(attempted_at)
        .bind(response)
        .bind(id.to_string())
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// FAILED records still under the attempt limit, oldest first
    pub async fn list_retryable(&self, max_attempts: i64, limit: i64) -> Result<Vec<DeliveryRecord>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, organization_id, event, payload, url, status, attempts, last_attempt_at, response, created_at
            FROM delivery_records
            WHERE status = 'FAILED' AND attempts < ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// PENDING records under the attempt limit whose last activity is
    /// older than `cutoff`: enqueued but never delivered, or claimed by a
    /// sweep that did not finish.
    pub async fn list_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        max_attempts: i64,
        limit: i64,
    ) -> Result<Vec<DeliveryRecord>> {
        let rows = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, organization_id, event, payload, url, status, attempts, last_attempt_at, response, created_at
            FROM delivery_records
            WHERE status = 'PENDING' AND attempts < ? AND COALESCE(last_attempt_at, created_at) < ?
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?
            "#,
        )
        .bind(max_attempts)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Claim a freshly enqueued record for its first attempt.
    ///
    /// Fails once any sweep has touched the record, so a delivery task that
    /// waited too long for a slot never sends a second copy.
    pub async fn claim_new(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_records SET last_attempt_at = ?
            WHERE id = ? AND status = 'PENDING' AND attempts = 0 AND last_attempt_at IS NULL
            "#,
        )
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a FAILED record back to PENDING before retrying it.
    ///
    /// Only one sweep can win the claim, so concurrent sweeps never push
    /// `attempts` past `max_attempts`.
    pub async fn claim_failed(&self, id: Uuid, max_attempts: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_records SET status = 'PENDING', last_attempt_at = ?
            WHERE id = ? AND status = 'FAILED' AND attempts < ?
            "#,
        )
        .bind(now)
        .bind(id.to_string())
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Claim a stale PENDING record by bumping its activity timestamp
    pub async fn claim_stale(&self, id: Uuid, cutoff: DateTime<Utc>, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_records SET last_attempt_at = ?
            WHERE id = ? AND status = 'PENDING' AND COALESCE(last_attempt_at, created_at) < ?
            "#,
        )
        .bind(now)
        .bind(id.to_string())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_organization(
        &self,
        organization_id: Uuid,
        status: Option<DeliveryStatus>,
        params: PageParams,
    ) -> Result<Page<DeliveryRecord>> {
        let (page, limit) = params.resolve(20);
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM delivery_records WHERE organization_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(organization_id.to_string())
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        let pagination = Pagination::new(page, limit, total);

        let rows = sqlx::query_as::<_, DeliveryRow>(
            r#"
            SELECT id, organization_id, event, payload, url, status, attempts, last_attempt_at, response, created_at
            FROM delivery_records
            WHERE organization_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(organization_id.to_string())
        .bind(status)
        .bind(status)
        .bind(i64::from(limit))
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            data: rows.into_iter().map(|r| r.try_into()).collect::<Result<_>>()?,
            pagination,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: String,
    organization_id: String,
    event: String,
    payload: String,
    url: String,
    status: String,
    attempts: i64,
    last_attempt_at: Option<DateTime<Utc>>,
    response: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for DeliveryRecord {
    type Error = AppError;

    fn try_from(row: DeliveryRow) -> Result<Self> {
        Ok(DeliveryRecord {
            id: parse_uuid(&row.id, "delivery")?,
            organization_id: parse_uuid(&row.organization_id, "organization_id")?,
            event: row.event,
            payload: serde_json::from_str(&row.payload)
                .map_err(|e| AppError::Internal(format!("Invalid payload: {}", e)))?,
            url: row.url,
            status: parse_status(&row.status)?,
            attempts: row.attempts,
            last_attempt_at: row.last_attempt_at,
            response: row.response,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::setup_test_db;

    async fn setup() -> (DeliveryStore, Uuid) {
        let store = setup_test_db().await;
        let org = store
            .create_organization("Tech Corp", "ops@techcorp.test", "key-1", Some("https://hooks.test/a"))
            .await
            .unwrap();
        (DeliveryStore::new(store.pool().clone()), org.id)
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({"a": 1}), "https://hooks.test/a")
            .await
            .unwrap();

        let fetched = deliveries.get(record.id).await.unwrap();
        assert_eq!(fetched.status, DeliveryStatus::Pending);
        assert_eq!(fetched.attempts, 0);
        assert_eq!(fetched.payload["a"], 1);
        assert!(fetched.last_attempt_at.is_none());
    }

    #[tokio::test]
    async fn test_record_attempt_increments() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();

        assert!(deliveries
            .record_attempt(record.id, DeliveryStatus::Failed, "HTTP 500", Utc::now(), 3)
            .await
            .unwrap());
        let fetched = deliveries.get(record.id).await.unwrap();
        assert_eq!(fetched.status, DeliveryStatus::Failed);
        assert_eq!(fetched.attempts, 1);
        assert_eq!(fetched.response.as_deref(), Some("HTTP 500"));
        assert!(fetched.last_attempt_at.is_some());
    }

    #[tokio::test]
    async fn test_success_is_final() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();

        deliveries
            .record_attempt(record.id, DeliveryStatus::Success, "HTTP 200", Utc::now(), 3)
            .await
            .unwrap();
        let updated = deliveries
            .record_attempt(record.id, DeliveryStatus::Failed, "late failure", Utc::now(), 3)
            .await
            .unwrap();

        assert!(!updated);
        let fetched = deliveries.get(record.id).await.unwrap();
        assert_eq!(fetched.status, DeliveryStatus::Success);
        assert_eq!(fetched.attempts, 1);
    }

    #[tokio::test]
    async fn test_record_attempt_stops_at_max_attempts() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();

        for _ in 0..2 {
            assert!(deliveries
                .record_attempt(record.id, DeliveryStatus::Failed, "HTTP 500", Utc::now(), 2)
                .await
                .unwrap());
        }
        let updated = deliveries
            .record_attempt(record.id, DeliveryStatus::Failed, "HTTP 500", Utc::now(), 2)
            .await
            .unwrap();

        assert!(!updated);
        assert_eq!(deliveries.get(record.id).await.unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_claim_new_only_before_any_activity() {
        let (deliveries, org_id) = setup().await;
        let first = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        assert!(deliveries.claim_new(first.id, Utc::now()).await.unwrap());
        assert!(!deliveries.claim_new(first.id, Utc::now()).await.unwrap());

        // A stale sweep got to it first
        let second = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        assert!(deliveries.claim_stale(second.id, cutoff, Utc::now()).await.unwrap());
        assert!(!deliveries.claim_new(second.id, Utc::now()).await.unwrap());

        let third = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        deliveries
            .record_attempt(third.id, DeliveryStatus::Failed, "x", Utc::now(), 3)
            .await
            .unwrap();
        assert!(!deliveries.claim_new(third.id, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_retryable_respects_max_attempts() {
        let (deliveries, org_id) = setup().await;
        let once = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        let thrice = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        let ok = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();

        deliveries
            .record_attempt(once.id, DeliveryStatus::Failed, "x", Utc::now(), 3)
            .await
            .unwrap();
        for _ in 0..3 {
            deliveries
                .record_attempt(thrice.id, DeliveryStatus::Failed, "x", Utc::now(), 3)
                .await
                .unwrap();
        }
        deliveries
            .record_attempt(ok.id, DeliveryStatus::Success, "ok", Utc::now(), 3)
            .await
            .unwrap();

        let retryable = deliveries.list_retryable(3, 100).await.unwrap();
        let ids: Vec<Uuid> = retryable.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![once.id]);
    }

    #[tokio::test]
    async fn test_list_stale_pending_uses_cutoff() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();

        let none = deliveries
            .list_stale_pending(record.created_at - chrono::Duration::seconds(1), 3, 100)
            .await
            .unwrap();
        assert!(none.is_empty());

        let stale = deliveries
            .list_stale_pending(Utc::now() + chrono::Duration::seconds(1), 3, 100)
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_failed_only_once() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        deliveries
            .record_attempt(record.id, DeliveryStatus::Failed, "x", Utc::now(), 3)
            .await
            .unwrap();

        assert!(deliveries.claim_failed(record.id, 3, Utc::now()).await.unwrap());
        assert!(!deliveries.claim_failed(record.id, 3, Utc::now()).await.unwrap());
        assert_eq!(deliveries.get(record.id).await.unwrap().status, DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn test_claim_failed_refuses_exhausted() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        deliveries
            .record_attempt(record.id, DeliveryStatus::Failed, "x", Utc::now(), 3)
            .await
            .unwrap();

        assert!(!deliveries.claim_failed(record.id, 1, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_stale_bumps_activity() {
        let (deliveries, org_id) = setup().await;
        let record = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        let cutoff = Utc::now() + chrono::Duration::seconds(1);

        assert!(deliveries.claim_stale(record.id, cutoff, cutoff + chrono::Duration::seconds(5)).await.unwrap());
        // last_attempt_at now lies beyond the cutoff
        assert!(!deliveries.claim_stale(record.id, cutoff, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_for_organization_filters_status() {
        let (deliveries, org_id) = setup().await;
        let failed = deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        deliveries
            .create(org_id, "webhook.test", serde_json::json!({}), "https://hooks.test/a")
            .await
            .unwrap();
        deliveries
            .record_attempt(failed.id, DeliveryStatus::Failed, "x", Utc::now(), 3)
            .await
            .unwrap();

        let all = deliveries
            .list_for_organization(org_id, None, PageParams::new(1, 20))
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 2);

        let only_failed = deliveries
            .list_for_organization(org_id, Some(DeliveryStatus::Failed), PageParams::new(1, 20))
            .await
            .unwrap();
        assert_eq!(only_failed.data.len(), 1);
        assert_eq!(only_failed.data[0].id, failed.id);
    }
}

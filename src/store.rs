//! Database store for organizations, creators, requests, bids and projects
//!
//! Methods taking `&mut SqliteConnection` are meant to run inside a
//! transaction opened with [`Store::begin`]; the rest use the pool directly.

use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    Bid, Creator, Organization, Page, PageParams, Pagination, Project, Request, Requirements,
};
use crate::workflow::{BidStatus, ProjectStatus, RequestStatus};

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a pool and bring the schema up to date
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    // Writers wait on each other's locks instead of failing with SQLITE_BUSY
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

    Ok(pool)
}

/// Fields of a request that passed validation
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub organization_id: Uuid,
    pub title: String,
    pub description: String,
    pub service_type: String,
    pub requirements: Requirements,
    pub budget: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Onboarding data for a creator
#[derive(Debug, Clone, Default)]
pub struct NewCreator {
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub is_verified: bool,
    pub is_available: bool,
    pub rating: f64,
}

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    // Organization operations

    pub async fn create_organization(
        &self,
        name: &str,
        email: &str,
        api_key: &str,
        webhook_url: Option<&str>,
    ) -> Result<Organization> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, email, api_key, webhook_url, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(email)
        .bind(api_key)
        .bind(webhook_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Organization {
            id,
            name: name.to_string(),
            email: email.to_string(),
            webhook_url: webhook_url.map(str::to_string),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_organization(&self, id: Uuid) -> Result<Organization> {
        sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, email, webhook_url, is_active, created_at, updated_at
            FROM organizations
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", id)))?
        .try_into()
    }

    pub async fn find_organization_by_api_key(&self, api_key: &str) -> Result<Option<Organization>> {
        sqlx::query_as::<_, OrganizationRow>(
            r#"
            SELECT id, name, email, webhook_url, is_active, created_at, updated_at
            FROM organizations
            WHERE api_key = ?
            "#,
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?
        .map(Organization::try_from)
        .transpose()
    }

    pub async fn set_organization_active(&self, id: Uuid, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE organizations SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Organization {} not found", id)));
        }
        Ok(())
    }

    /// Replace (or clear, with `None`) the organization's webhook endpoint
    pub async fn set_webhook_url(&self, id: Uuid, url: Option<&str>) -> Result<Organization> {
        let result = sqlx::query("UPDATE organizations SET webhook_url = ?, updated_at = ? WHERE id = ?")
            .bind(url)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Organization {} not found", id)));
        }
        self.get_organization(id).await
    }

    // Creator operations

    pub async fn create_creator(&self, creator: NewCreator) -> Result<Creator> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let skills = serde_json::to_string(&creator.skills)
            .map_err(|e| AppError::Internal(format!("Invalid skills: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO creators (id, name, email, skills, is_verified, is_available, rating, completed_projects, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&creator.name)
        .bind(&creator.email)
        .bind(skills)
        .bind(creator.is_verified)
        .bind(creator.is_available)
        .bind(creator.rating)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Creator {
            id,
            name: creator.name,
            email: creator.email,
            skills: creator.skills,
            is_verified: creator.is_verified,
            is_available: creator.is_available,
            rating: creator.rating,
            completed_projects: 0,
            created_at: now,
        })
    }

    pub async fn get_creator(&self, id: Uuid) -> Result<Creator> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_creator(&mut conn, id).await
    }

    pub async fn fetch_creator(conn: &mut SqliteConnection, id: Uuid) -> Result<Creator> {
        sqlx::query_as::<_, CreatorRow>(
            r#"
            SELECT id, name, email, skills, is_verified, is_available, rating, completed_projects, created_at
            FROM creators
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Creator {} not found", id)))?
        .try_into()
    }

    /// Creators eligible for matching: verified and available
    pub async fn list_matchable_creators(&self) -> Result<Vec<Creator>> {
        let rows = sqlx::query_as::<_, CreatorRow>(
            r#"
            SELECT id, name, email, skills, is_verified, is_available, rating, completed_projects, created_at
            FROM creators
            WHERE is_verified = 1 AND is_available = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    pub async fn increment_completed_projects(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE creators SET completed_projects = completed_projects + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    // Request operations

    pub async fn insert_request(conn: &mut SqliteConnection, new: NewRequest) -> Result<Request> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let requirements = serde_json::to_string(&new.requirements)
            .map_err(|e| AppError::Internal(format!("Invalid requirements: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO requests (id, organization_id, title, description, service_type, requirements, budget, deadline, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(new.organization_id.to_string())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.service_type)
        .bind(requirements)
        .bind(new.budget)
        .bind(new.deadline)
        .bind(RequestStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(Request {
            id,
            organization_id: new.organization_id,
            title: new.title,
            description: new.description,
            service_type: new.service_type,
            requirements: new.requirements,
            budget: new.budget,
            deadline: new.deadline,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_request(&self, id: Uuid) -> Result<Request> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_request(&mut conn, id).await
    }

    /// Fetch a request only if it belongs to the given organization
    pub async fn get_request_for_org(&self, organization_id: Uuid, id: Uuid) -> Result<Request> {
        let request = self.get_request(id).await?;
        if request.organization_id != organization_id {
            return Err(AppError::NotFound(format!("Request {} not found", id)));
        }
        Ok(request)
    }

    pub async fn fetch_request(conn: &mut SqliteConnection, id: Uuid) -> Result<Request> {
        sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, organization_id, title, description, service_type, requirements, budget, deadline, status, created_at, updated_at
            FROM requests
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?
        .try_into()
    }

    /// Take the write lock on a request and return its current state.
    ///
    /// SQLite serializes writers, so touching the row first makes every
    /// other transaction that locks the same request wait for this one to
    /// commit or roll back before it reads the status.
    pub async fn lock_request(
        conn: &mut SqliteConnection,
        id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<Request> {
        let result = sqlx::query(
            r#"
            UPDATE requests SET updated_at = ?
            WHERE id = ? AND (? IS NULL OR organization_id = ?)
            "#,
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(organization_id.map(|o| o.to_string()))
        .bind(organization_id.map(|o| o.to_string()))
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Request {} not found", id)));
        }

        Self::fetch_request(conn, id).await
    }

    pub async fn update_request_status(
        conn: &mut SqliteConnection,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE requests SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn list_requests(
        &self,
        organization_id: Uuid,
        status: Option<RequestStatus>,
        params: PageParams,
    ) -> Result<Page<Request>> {
        let (page, limit) = params.resolve(10);
        let status = status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM requests WHERE organization_id = ? AND (? IS NULL OR status = ?)",
        )
        .bind(organization_id.to_string())
        .bind(status)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        let pagination = Pagination::new(page, limit, total);

        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, organization_id, title, description, service_type, requirements, budget, deadline, status, created_at, updated_at
            FROM requests
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

    /// Requests creators can still bid on, optionally filtered by service type
    pub async fn list_available_requests(
        &self,
        service_type: Option<&str>,
        params: PageParams,
    ) -> Result<Page<Request>> {
        let (page, limit) = params.resolve(20);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM requests
            WHERE status IN ('PENDING', 'OPEN_FOR_BIDS') AND (? IS NULL OR service_type = ?)
            "#,
        )
        .bind(service_type)
        .bind(service_type)
        .fetch_one(&self.pool)
        .await?;
        let pagination = Pagination::new(page, limit, total);

        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, organization_id, title, description, service_type, requirements, budget, deadline, status, created_at, updated_at
            FROM requests
            WHERE status IN ('PENDING', 'OPEN_FOR_BIDS') AND (? IS NULL OR service_type = ?)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(service_type)
        .bind(service_type)
        .bind(i64::from(limit))
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            data: rows.into_iter().map(|r| r.try_into()).collect::<Result<_>>()?,
            pagination,
        })
    }

    // Bid operations

    /// Insert a pending bid, but only while the request still accepts bids.
    ///
    /// The status check and the insert are one statement, so a bid can never
    /// land on a request that was accepted or cancelled concurrently.
    /// Returns `None` when the request was not in a biddable state.
    pub async fn insert_bid_if_open(
        &self,
        request_id: Uuid,
        creator_id: Uuid,
        amount: f64,
        proposal: &str,
        estimated_days: Option<i64>,
    ) -> Result<Option<Bid>> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO bids (id, request_id, creator_id, amount, proposal, estimated_days, status, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, 'PENDING', ?, ?
            WHERE EXISTS (
                SELECT 1 FROM requests WHERE id = ? AND status IN ('PENDING', 'OPEN_FOR_BIDS')
            )
            "#,
        )
        .bind(id.to_string())
        .bind(request_id.to_string())
        .bind(creator_id.to_string())
        .bind(amount)
        .bind(proposal)
        .bind(estimated_days)
        .bind(now)
        .bind(now)
        .bind(request_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => AppError::Validation(format!(
                "Creator {} already has a bid on request {}",
                creator_id, request_id
            )),
            _ => AppError::Database(e),
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(Bid {
            id,
            request_id,
            creator_id,
            amount,
            proposal: proposal.to_string(),
            estimated_days,
            status: BidStatus::Pending,
            created_at: now,
            updated_at: now,
        }))
    }

    pub async fn fetch_bid(conn: &mut SqliteConnection, id: Uuid) -> Result<Bid> {
        sqlx::query_as::<_, BidRow>(
            r#"
            SELECT id, request_id, creator_id, amount, proposal, estimated_days, status, created_at, updated_at
            FROM bids
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bid {} not found", id)))?
        .try_into()
    }

    pub async fn list_bids(&self, request_id: Uuid) -> Result<Vec<Bid>> {
        let rows = sqlx::query_as::<_, BidRow>(
            r#"
            SELECT id, request_id, creator_id, amount, proposal, estimated_days, status, created_at, updated_at
            FROM bids
            WHERE request_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(request_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Mark one bid accepted and reject every other pending bid on the request.
    ///
    /// Returns the number of sibling bids rejected.
    pub async fn accept_bid(
        conn: &mut SqliteConnection,
        request_id: Uuid,
        bid_id: Uuid,
    ) -> Result<u64> {
        let now = Utc::now();

        sqlx::query("UPDATE bids SET status = 'ACCEPTED', updated_at = ? WHERE id = ? AND request_id = ?")
            .bind(now)
            .bind(bid_id.to_string())
            .bind(request_id.to_string())
            .execute(&mut *conn)
            .await?;

        let rejected = sqlx::query(
            r#"
            UPDATE bids SET status = 'REJECTED', updated_at = ?
            WHERE request_id = ? AND id != ? AND status = 'PENDING'
            "#,
        )
        .bind(now)
        .bind(request_id.to_string())
        .bind(bid_id.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(rejected.rows_affected())
    }

    // Project operations

    pub async fn insert_project(
        conn: &mut SqliteConnection,
        request_id: Uuid,
        creator_id: Uuid,
    ) -> Result<Project> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO projects (id, request_id, creator_id, status, started_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(request_id.to_string())
        .bind(creator_id.to_string())
        .bind(ProjectStatus::InProgress.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(Project {
            id,
            request_id,
            creator_id,
            status: ProjectStatus::InProgress,
            deliverable_url: None,
            notes: None,
            started_at: now,
            completed_at: None,
            approved_at: None,
        })
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Project> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_project(&mut conn, id).await
    }

    pub async fn fetch_project(conn: &mut SqliteConnection, id: Uuid) -> Result<Project> {
        sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, request_id, creator_id, status, deliverable_url, notes, started_at, completed_at, approved_at
            FROM projects
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?
        .try_into()
    }

    /// Take the write lock on a project, see [`Store::lock_request`]
    pub async fn lock_project(conn: &mut SqliteConnection, id: Uuid) -> Result<Project> {
        let result = sqlx::query("UPDATE projects SET status = status WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        Self::fetch_project(conn, id).await
    }

    pub async fn get_project_for_request(&self, request_id: Uuid) -> Result<Option<Project>> {
        sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, request_id, creator_id, status, deliverable_url, notes, started_at, completed_at, approved_at
            FROM projects
            WHERE request_id = ?
            "#,
        )
        .bind(request_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(Project::try_from)
        .transpose()
    }

    pub async fn count_projects_for_request(&self, request_id: Uuid) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE request_id = ?")
                .bind(request_id.to_string())
                .fetch_one(&self.pool)
                .await?,
        )
    }

    pub async fn mark_project_submitted(
        conn: &mut SqliteConnection,
        id: Uuid,
        deliverable_url: &str,
        notes: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE projects SET status = ?, deliverable_url = ?, notes = ?, completed_at = ?
            WHERE id = ?
            "#,
        )
        .bind(ProjectStatus::Submitted.as_str())
        .bind(deliverable_url)
        .bind(notes)
        .bind(completed_at)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn mark_project_approved(
        conn: &mut SqliteConnection,
        id: Uuid,
        approved_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE projects SET status = ?, approved_at = ? WHERE id = ?")
            .bind(ProjectStatus::Approved.as_str())
            .bind(approved_at)
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

// Internal row types for sqlx

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::Internal(format!("Invalid {} UUID: {}", field, e)))
}

pub(crate) fn parse_status<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(AppError::Internal)
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    email: String,
    webhook_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = AppError;

    fn try_from(row: OrganizationRow) -> Result<Self> {
        Ok(Organization {
            id: parse_uuid(&row.id, "organization")?,
            name: row.name,
            email: row.email,
            webhook_url: row.webhook_url,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CreatorRow {
    id: String,
    name: String,
    email: String,
    skills: String,
    is_verified: bool,
    is_available: bool,
    rating: f64,
    completed_projects: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<CreatorRow> for Creator {
    type Error = AppError;

    fn try_from(row: CreatorRow) -> Result<Self> {
        Ok(Creator {
            id: parse_uuid(&row.id, "creator")?,
            name: row.name,
            email: row.email,
            skills: serde_json::from_str(&row.skills)
                .map_err(|e| AppError::Internal(format!("Invalid skills: {}", e)))?,
            is_verified: row.is_verified,
            is_available: row.is_available,
            rating: row.rating,
            completed_projects: row.completed_projects,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: String,
    organization_id: String,
    title: String,
    description: String,
    service_type: String,
    requirements: String,
    budget: Option<f64>,
    deadline: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for Request {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self> {
        Ok(Request {
            id: parse_uuid(&row.id, "request")?,
            organization_id: parse_uuid(&row.organization_id, "organization_id")?,
            title: row.title,
            description: row.description,
            service_type: row.service_type,
            requirements: serde_json::from_str(&row.requirements)
                .map_err(|e| AppError::Internal(format!("Invalid requirements: {}", e)))?,
            budget: row.budget,
            deadline: row.deadline,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BidRow {
    id: String,
    request_id: String,
    creator_id: String,
    amount: f64,
    proposal: String,
    estimated_days: Option<i64>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = AppError;

    fn try_from(row: BidRow) -> Result<Self> {
        Ok(Bid {
            id: parse_uuid(&row.id, "bid")?,
            request_id: parse_uuid(&row.request_id, "request_id")?,
            creator_id: parse_uuid(&row.creator_id, "creator_id")?,
            amount: row.amount,
            proposal: row.proposal,
            estimated_days: row.estimated_days,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    request_id: String,
    creator_id: String,
    status: String,
    deliverable_url: Option<String>,
    notes: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: parse_uuid(&row.id, "project")?,
            request_id: parse_uuid(&row.request_id, "request_id")?,
            creator_id: parse_uuid(&row.creator_id, "creator_id")?,
            status: parse_status(&row.status)?,
            deliverable_url: row.deliverable_url,
            notes: row.notes,
            started_at: row.started_at,
            completed_at: row.completed_at,
            approved_at: row.approved_at,
        })
    }
}

//! Data models for organizations, creators, requests, bids and projects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::{BidStatus, ProjectStatus, RequestStatus};

/// An organization posting requests and receiving webhooks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub webhook_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An independent creator bidding on requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub is_verified: bool,
    pub is_available: bool,
    pub rating: f64,
    pub completed_projects: i64,
    pub created_at: DateTime<Utc>,
}

/// Structured requirements attached to a request.
///
/// `skills` drives creator matching; every other key is kept verbatim as a
/// free-form constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(flatten)]
    pub constraints: serde_json::Map<String, serde_json::Value>,
}

/// A posted unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: String,
    pub service_type: String,
    pub requirements: Requirements,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A creator's priced proposal for a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub request_id: Uuid,
    pub creator_id: Uuid,
    pub amount: f64,
    pub proposal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<i64>,
    pub status: BidStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Execution of a request by the creator whose bid was accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub request_id: Uuid,
    pub creator_id: Uuid,
    pub status: ProjectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverable_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

/// Immutable audit record of one request status transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLogEntry {
    pub id: Uuid,
    pub request_id: Uuid,
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub changed_by: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A request together with everything hanging off it
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: Request,
    pub bids: Vec<Bid>,
    pub project: Option<Project>,
    pub status_logs: Vec<StatusLogEntry>,
}

/// Request to create a new request
#[derive(Debug, Default, Deserialize)]
pub struct CreateRequestInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
    pub requirements: Option<Requirements>,
    pub budget: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Request to submit a bid
#[derive(Debug, Deserialize)]
pub struct SubmitBidInput {
    pub request_id: Uuid,
    pub creator_id: Uuid,
    pub amount: f64,
    pub proposal: String,
    pub estimated_days: Option<i64>,
}

/// Pagination parameters, 1-based
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Resolve to (page, limit) with the given default limit
    pub fn resolve(&self, default_limit: u32) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(default_limit)
            .clamp(1, Self::MAX_LIMIT);
        (page, limit)
    }
}

/// Pagination metadata returned with list results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let pages = (total + i64::from(limit) - 1) / i64::from(limit);
        Self {
            page,
            limit,
            total,
            pages,
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// A page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

//! HTTP API
//!
//! Organization routes authenticate with [`OrgIdentity`](crate::auth::OrgIdentity);
//! creator routes are open. Successful responses share the
//! `{ success, data, pagination? }` envelope.

pub mod creators;
pub mod requests;
pub mod webhooks;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Page, PageParams, Pagination};
use crate::AppState;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
            pagination: None,
        })
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn page(page: Page<T>) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: page.data,
            pagination: Some(page.pagination),
        })
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;

/// Query string shared by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub service_type: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }

    /// Parse the `status` filter, rejecting unknown values
    pub fn status<T: FromStr<Err = String>>(&self) -> Result<Option<T>> {
        self.status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().map_err(AppError::Validation))
            .transpose()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // Organization side
        .route("/api/requests", post(requests::create).get(requests::list))
        .route("/api/requests/:id", get(requests::get))
        .route("/api/requests/:id/status", patch(requests::change_status))
        .route("/api/requests/:id/accept-bid", post(requests::accept_bid))
        .route("/api/projects/:id/approve", post(requests::approve_project))
        // Creator side
        .route("/api/creators/bids", post(creators::submit_bid))
        .route("/api/creators/requests/available", get(creators::available_requests))
        .route("/api/creators/projects/:id/submit", post(creators::submit_project))
        .route("/api/creators/match/:request_id", get(creators::matches))
        // Webhooks
        .route(
            "/api/webhooks/register",
            post(webhooks::register).delete(webhooks::remove),
        )
        .route("/api/webhooks/events", get(webhooks::events))
        .route("/api/webhooks/test", post(webhooks::test))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

//! Creator-side routes

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiResponse, ApiResult, ListQuery};
use crate::error::Result;
use crate::matching::{self, CreatorMatch};
use crate::models::{Bid, Request, SubmitBidInput};
use crate::workflow::ProjectSubmission;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitProjectBody {
    pub deliverable_url: String,
    pub notes: Option<String>,
}

pub async fn submit_bid(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<SubmitBidInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Bid>>)> {
    let Json(input) = body?;
    let bid = state.engine.submit_bid(input).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(bid)))
}

pub async fn available_requests(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Request>> {
    let Query(query) = query?;
    let service_type = query.service_type.as_deref().filter(|s| !s.is_empty());
    let page = state
        .engine
        .list_available_requests(service_type, query.page_params())
        .await?;
    Ok(ApiResponse::page(page))
}

pub async fn submit_project(
    State(state): State<Arc<AppState>>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    body: std::result::Result<Json<SubmitProjectBody>, JsonRejection>,
) -> ApiResult<ProjectSubmission> {
    let Path(id) = id?;
    let Json(body) = body?;
    let submitted = state
        .engine
        .submit_project(id, &body.deliverable_url, body.notes)
        .await?;
    Ok(ApiResponse::ok(submitted))
}

pub async fn matches(
    State(state): State<Arc<AppState>>,
    request_id: std::result::Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Vec<CreatorMatch>> {
    let Path(request_id) = request_id?;
    let ranked = matching::find_matches(&state.store, request_id).await?;
    Ok(ApiResponse::ok(ranked))
}

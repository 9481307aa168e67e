//! Organization routes for requests and projects

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
use crate::auth::OrgIdentity;
use crate::error::{AppError, Result};
use crate::models::{CreateRequestInput, Project, Request, RequestDetail};
use crate::workflow::{BidAcceptance, RequestStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChangeStatusBody {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptBidBody {
    pub bid_id: Uuid,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    body: std::result::Result<Json<CreateRequestInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Request>>)> {
    let Json(input) = body?;
    let request = state.engine.create_request(org.id, input).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(request)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Request>> {
    let Query(query) = query?;
    let page = state
        .engine
        .list_requests(org.id, query.status::<RequestStatus>()?, query.page_params())
        .await?;
    Ok(ApiResponse::page(page))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> ApiResult<RequestDetail> {
    let Path(id) = id?;
    let detail = state.engine.get_request_detail(org.id, id).await?;
    Ok(ApiResponse::ok(detail))
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    body: std::result::Result<Json<ChangeStatusBody>, JsonRejection>,
) -> ApiResult<Request> {
    let Path(id) = id?;
    let Json(body) = body?;
    let status: RequestStatus = body.status.parse().map_err(AppError::Validation)?;

    let request = state
        .engine
        .change_request_status(org.id, id, status, body.notes)
        .await?;
    Ok(ApiResponse::ok(request))
}

pub async fn accept_bid(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    body: std::result::Result<Json<AcceptBidBody>, JsonRejection>,
) -> ApiResult<BidAcceptance> {
    let Path(id) = id?;
    let Json(body) = body?;
    let accepted = state.engine.accept_bid(org.id, id, body.bid_id).await?;
    Ok(ApiResponse::ok(accepted))
}

pub async fn approve_project(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Project> {
    let Path(id) = id?;
    let project = state.engine.approve_project(org.id, id).await?;
    Ok(ApiResponse::ok(project))
}

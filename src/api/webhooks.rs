//! Webhook registration, inspection and test delivery

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;

use super::{ApiResponse, ApiResult, ListQuery};
use crate::auth::OrgIdentity;
use crate::models::Organization;
use crate::webhook::{validate_endpoint, DeliveryRecord, DeliveryStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    #[serde(alias = "webhookUrl", alias = "webhook_url")]
    pub url: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> ApiResult<Organization> {
    let Json(body) = body?;
    let url = validate_endpoint(&body.url)?;

    let org = state.store.set_webhook_url(org.id, Some(url.as_str())).await?;
    tracing::info!(organization_id = %org.id, url = %url, "Webhook endpoint registered");

    let mut response = ApiResponse::ok(org);
    response.message = Some("Webhook URL registered".to_string());
    Ok(response)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
) -> ApiResult<Organization> {
    let org = state.store.set_webhook_url(org.id, None).await?;
    tracing::info!(organization_id = %org.id, "Webhook endpoint removed");

    let mut response = ApiResponse::ok(org);
    response.message = Some("Webhook URL removed".to_string());
    Ok(response)
}

pub async fn events(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<DeliveryRecord>> {
    let Query(query) = query?;
    let page = state
        .dispatcher
        .deliveries()
        .list_for_organization(org.id, query.status::<DeliveryStatus>()?, query.page_params())
        .await?;
    Ok(ApiResponse::page(page))
}

/// Deliver a `webhook.test` event synchronously.
///
/// `success` in the envelope reports whether the endpoint answered 2xx.
pub async fn test(
    State(state): State<Arc<AppState>>,
    OrgIdentity(org): OrgIdentity,
) -> ApiResult<DeliveryRecord> {
    let (delivered, record) = state.dispatcher.send_test(org.id).await?;

    let mut response = ApiResponse::ok(record);
    response.success = delivered;
    response.message = Some(if delivered {
        "Test webhook delivered successfully".to_string()
    } else {
        "Test webhook delivery failed".to_string()
    });
    Ok(response)
}

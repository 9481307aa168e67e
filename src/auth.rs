//! Identity gate: resolves the `X-API-Key` header to an organization

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderMap, request::Parts},
};

use crate::error::{AppError, Result};
use crate::models::Organization;
use crate::store::Store;
use crate::AppState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// The organization making an authenticated call
#[derive(Debug, Clone)]
pub struct OrgIdentity(pub Organization);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for OrgIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let organization = authenticate(&state.store, api_key(&parts.headers)).await?;
        Ok(OrgIdentity(organization))
    }
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Resolve a credential to an active organization
pub async fn authenticate(store: &Store, api_key: Option<&str>) -> Result<Organization> {
    let api_key = api_key.ok_or_else(|| AppError::Unauthorized("API key is required".to_string()))?;

    let organization = store
        .find_organization_by_api_key(api_key)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    if !organization.is_active {
        tracing::debug!(organization_id = %organization.id, "Rejected inactive organization");
        return Err(AppError::Forbidden("Organization account is inactive".to_string()));
    }

    Ok(organization)
}

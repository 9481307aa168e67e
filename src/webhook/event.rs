//! Outbound webhook events and the JSON envelope posted to endpoints

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::workflow::RequestStatus;

/// Project summary attached to `request.status_changed`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: Uuid,
    pub creator_name: String,
    pub deliverable_url: Option<String>,
}

/// Events emitted to organizations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebhookEvent {
    #[serde(rename_all = "camelCase")]
    RequestStatusChanged {
        request_id: Uuid,
        title: String,
        old_status: Option<RequestStatus>,
        new_status: RequestStatus,
        project: Option<ProjectSummary>,
    },
    #[serde(rename_all = "camelCase")]
    ProjectCompleted {
        project_id: Uuid,
        request_id: Uuid,
        request_title: String,
        creator_name: String,
        deliverable_url: Option<String>,
        completed_at: Option<DateTime<Utc>>,
    },
    Test {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl WebhookEvent {
    pub const REQUEST_STATUS_CHANGED: &'static str = "request.status_changed";
    pub const PROJECT_COMPLETED: &'static str = "project.completed";
    pub const TEST: &'static str = "webhook.test";

    pub fn test() -> Self {
        WebhookEvent::Test {
            message: "This is a test webhook".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Event name sent in the envelope and the `X-Webhook-Event` header
    pub fn name(&self) -> &'static str {
        match self {
            WebhookEvent::RequestStatusChanged { .. } => Self::REQUEST_STATUS_CHANGED,
            WebhookEvent::ProjectCompleted { .. } => Self::PROJECT_COMPLETED,
            WebhookEvent::Test { .. } => Self::TEST,
        }
    }

    /// The `data` object of the envelope
    pub fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Body of every webhook POST
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub event: &'a str,
    pub data: &'a serde_json::Value,
    pub timestamp: String,
}

//! Workflow engine
//!
//! Owns the request/bid/project state machine. Every operation that changes
//! a request's status takes the request's write lock first, so concurrent
//! callers are serialized by the store and the loser observes the winner's
//! committed state.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::status::{BidStatus, ProjectStatus, RequestStatus};
use crate::audit;
use crate::error::{AppError, Result};
use crate::models::{
    Bid, CreateRequestInput, Page, PageParams, Project, Request, RequestDetail, SubmitBidInput,
};
use crate::store::{NewRequest, Store};
use crate::webhook::{Dispatcher, ProjectSummary, WebhookEvent};

/// Outcome of a successful bid acceptance
#[derive(Debug, Clone, Serialize)]
pub struct BidAcceptance {
    pub request: Request,
    pub bid: Bid,
    pub project: Project,
    pub rejected_bids: u64,
}

/// Outcome of a successful project submission
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSubmission {
    pub request: Request,
    pub project: Project,
}

/// Applies workflow operations against the store
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Store,
    dispatcher: Dispatcher,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

impl WorkflowEngine {
    pub fn new(store: Store, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Post a new request in PENDING
    pub async fn create_request(&self, organization_id: Uuid, input: CreateRequestInput) -> Result<Request> {
        let title = required(input.title, "title")?;
        let description = required(input.description, "description")?;
        let service_type = required(input.service_type, "service_type")?;
        let requirements = input
            .requirements
            .ok_or_else(|| AppError::Validation("requirements is required".to_string()))?;

        if let Some(budget) = input.budget {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(AppError::Validation("budget must be positive".to_string()));
            }
        }

        let mut tx = self.store.begin().await?;
        let request = Store::insert_request(
            &mut tx,
            NewRequest {
                organization_id,
                title,
                description,
                service_type,
                requirements,
                budget: input.budget,
                deadline: input.deadline,
            },
        )
        .await?;
        audit::append(
            &mut tx,
            request.id,
            None,
            RequestStatus::Pending,
            organization_id,
            Some("Request created".to_string()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(request_id = %request.id, organization_id = %organization_id, "Request created");
        Ok(request)
    }

    /// Place a bid on a request that is still open
    pub async fn submit_bid(&self, input: SubmitBidInput) -> Result<Bid> {
        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }
        if input.proposal.trim().is_empty() {
            return Err(AppError::Validation("proposal is required".to_string()));
        }
        if matches!(input.estimated_days, Some(days) if days <= 0) {
            return Err(AppError::Validation("estimated_days must be positive".to_string()));
        }

        let request = self.store.get_request(input.request_id).await?;
        self.store.get_creator(input.creator_id).await?;

        if !request.status.accepts_bids() {
            return Err(AppError::NotAcceptingBids {
                request_id: request.id,
                status: request.status.to_string(),
            });
        }

        let bid = self
            .store
            .insert_bid_if_open(
                input.request_id,
                input.creator_id,
                input.amount,
                &input.proposal,
                input.estimated_days,
            )
            .await?;

        match bid {
            Some(bid) => {
                tracing::info!(
                    bid_id = %bid.id,
                    request_id = %bid.request_id,
                    creator_id = %bid.creator_id,
                    "Bid submitted"
                );
                Ok(bid)
            }
            // Closed between the status read and the insert
            None => {
                let current = self.store.get_request(input.request_id).await?;
                Err(AppError::NotAcceptingBids {
                    request_id: current.id,
                    status: current.status.to_string(),
                })
            }
        }
    }

    /// Accept one bid, reject its pending siblings and start the project
    pub async fn accept_bid(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        bid_id: Uuid,
    ) -> Result<BidAcceptance> {
        let mut tx = self.store.begin().await?;
        let request = Store::lock_request(&mut tx, request_id, Some(organization_id)).await?;
        let old_status = request.status;

        let bid = Store::fetch_bid(&mut tx, bid_id).await?;
        if bid.request_id != request_id {
            return Err(AppError::NotFound(format!(
                "Bid {} not found on request {}",
                bid_id, request_id
            )));
        }

        if !old_status.can_transition_to(RequestStatus::BidAccepted) {
            return Err(AppError::invalid_transition(old_status, RequestStatus::BidAccepted));
        }
        if bid.status != BidStatus::Pending {
            return Err(AppError::invalid_transition(bid.status, BidStatus::Accepted));
        }

        let rejected_bids = Store::accept_bid(&mut tx, request_id, bid_id).await?;
        Store::update_request_status(&mut tx, request_id, RequestStatus::BidAccepted).await?;
        let project = Store::insert_project(&mut tx, request_id, bid.creator_id).await?;
        audit::append(
            &mut tx,
            request_id,
            Some(old_status),
            RequestStatus::BidAccepted,
            organization_id,
            Some(format!("Bid {} accepted", bid_id)),
        )
        .await?;

        let creator = Store::fetch_creator(&mut tx, bid.creator_id).await?;
        let request = Store::fetch_request(&mut tx, request_id).await?;
        let bid = Store::fetch_bid(&mut tx, bid_id).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request_id,
            bid_id = %bid_id,
            project_id = %project.id,
            rejected_bids,
            "Bid accepted"
        );

        self.dispatcher
            .notify(
                organization_id,
                WebhookEvent::RequestStatusChanged {
                    request_id,
                    title: request.title.clone(),
                    old_status: Some(old_status),
                    new_status: RequestStatus::BidAccepted,
                    project: Some(ProjectSummary {
                        id: project.id,
                        creator_name: creator.name,
                        deliverable_url: None,
                    }),
                },
            )
            .await;

        Ok(BidAcceptance {
            request,
            bid,
            project,
            rejected_bids,
        })
    }

    /// Hand in the deliverable and complete the request
    pub async fn submit_project(
        &self,
        project_id: Uuid,
        deliverable_url: &str,
        notes: Option<String>,
    ) -> Result<ProjectSubmission> {
        let deliverable_url = deliverable_url.trim();
        if deliverable_url.is_empty() {
            return Err(AppError::Validation("deliverable_url is required".to_string()));
        }

        let mut tx = self.store.begin().await?;
        let project = Store::lock_project(&mut tx, project_id).await?;
        if !project.status.can_transition_to(ProjectStatus::Submitted) {
            return Err(AppError::invalid_transition(project.status, ProjectStatus::Submitted));
        }

        let request = Store::lock_request(&mut tx, project.request_id, None).await?;
        let old_status = request.status;
        if !old_status.can_transition_to(RequestStatus::Completed) {
            return Err(AppError::invalid_transition(old_status, RequestStatus::Completed));
        }

        let completed_at = Utc::now();
        Store::mark_project_submitted(&mut tx, project_id, deliverable_url, notes.as_deref(), completed_at)
            .await?;
        Store::update_request_status(&mut tx, request.id, RequestStatus::Completed).await?;
        audit::append(
            &mut tx,
            request.id,
            Some(old_status),
            RequestStatus::Completed,
            project.creator_id,
            Some(notes.unwrap_or_else(|| "Project submitted".to_string())),
        )
        .await?;

        let creator = Store::fetch_creator(&mut tx, project.creator_id).await?;
        let project = Store::fetch_project(&mut tx, project_id).await?;
        let request = Store::fetch_request(&mut tx, request.id).await?;
        tx.commit().await?;

        tracing::info!(project_id = %project_id, request_id = %request.id, "Project submitted");

        self.dispatcher
            .notify(
                request.organization_id,
                WebhookEvent::ProjectCompleted {
                    project_id,
                    request_id: request.id,
                    request_title: request.title.clone(),
                    creator_name: creator.name.clone(),
                    deliverable_url: project.deliverable_url.clone(),
                    completed_at: project.completed_at,
                },
            )
            .await;
        self.dispatcher
            .notify(
                request.organization_id,
                WebhookEvent::RequestStatusChanged {
                    request_id: request.id,
                    title: request.title.clone(),
                    old_status: Some(old_status),
                    new_status: RequestStatus::Completed,
                    project: Some(ProjectSummary {
                        id: project_id,
                        creator_name: creator.name,
                        deliverable_url: project.deliverable_url.clone(),
                    }),
                },
            )
            .await;

        Ok(ProjectSubmission { request, project })
    }

    /// Approve a submitted project and credit the creator.
    ///
    /// Leaves the request status alone, so no audit entry is written.
    pub async fn approve_project(&self, organization_id: Uuid, project_id: Uuid) -> Result<Project> {
        let mut tx = self.store.begin().await?;
        let project = Store::lock_project(&mut tx, project_id).await?;

        let request = Store::fetch_request(&mut tx, project.request_id).await?;
        if request.organization_id != organization_id {
            return Err(AppError::NotFound(format!("Project {} not found", project_id)));
        }

        if !project.status.can_transition_to(ProjectStatus::Approved) {
            return Err(AppError::invalid_transition(project.status, ProjectStatus::Approved));
        }

        Store::mark_project_approved(&mut tx, project_id, Utc::now()).await?;
        Store::increment_completed_projects(&mut tx, project.creator_id).await?;
        let project = Store::fetch_project(&mut tx, project_id).await?;
        tx.commit().await?;

        tracing::info!(project_id = %project_id, creator_id = %project.creator_id, "Project approved");
        Ok(project)
    }

    /// Organization-initiated transition (open for bids or cancel)
    pub async fn change_request_status(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        new_status: RequestStatus,
        notes: Option<String>,
    ) -> Result<Request> {
        let mut tx = self.store.begin().await?;
        let request = Store::lock_request(&mut tx, request_id, Some(organization_id)).await?;
        let old_status = request.status;

        if !new_status.is_manual_target() || !old_status.can_transition_to(new_status) {
            return Err(AppError::invalid_transition(old_status, new_status));
        }

        Store::update_request_status(&mut tx, request_id, new_status).await?;
        audit::append(&mut tx, request_id, Some(old_status), new_status, organization_id, notes).await?;
        let request = Store::fetch_request(&mut tx, request_id).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = %request_id,
            old_status = %old_status,
            new_status = %new_status,
            "Request status changed"
        );

        self.dispatcher
            .notify(
                organization_id,
                WebhookEvent::RequestStatusChanged {
                    request_id,
                    title: request.title.clone(),
                    old_status: Some(old_status),
                    new_status,
                    project: None,
                },
            )
            .await;

        Ok(request)
    }

    /// A request with its bids, project and history (newest first)
    pub async fn get_request_detail(&self, organization_id: Uuid, request_id: Uuid) -> Result<RequestDetail> {
        let request = self.store.get_request_for_org(organization_id, request_id).await?;
        let bids = self.store.list_bids(request_id).await?;
        let project = self.store.get_project_for_request(request_id).await?;

        let mut conn = self.store.pool().acquire().await?;
        let mut status_logs = audit::history(&mut conn, request_id).await?;
        status_logs.reverse();

        Ok(RequestDetail {
            request,
            bids,
            project,
            status_logs,
        })
    }

    pub async fn list_requests(
        &self,
        organization_id: Uuid,
        status: Option<RequestStatus>,
        params: PageParams,
    ) -> Result<Page<Request>> {
        self.store.list_requests(organization_id, status, params).await
    }

    pub async fn list_available_requests(
        &self,
        service_type: Option<&str>,
        params: PageParams,
    ) -> Result<Page<Request>> {
        self.store.list_available_requests(service_type, params).await
    }
}

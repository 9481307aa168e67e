//! Status types for requests, bids and projects
//!
//! The request transition table lives here; every status change in the
//! engine goes through [`RequestStatus::can_transition_to`].

use serde::{Deserialize, Serialize};

/// Status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Posted, bids may be submitted
    Pending,
    /// Explicitly opened for bidding by the organization
    OpenForBids,
    /// A bid was accepted and a project is running
    BidAccepted,
    /// The project was submitted
    Completed,
    /// Withdrawn before any bid was accepted
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::OpenForBids,
        RequestStatus::BidAccepted,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::OpenForBids => "OPEN_FOR_BIDS",
            RequestStatus::BidAccepted => "BID_ACCEPTED",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// Bids can be submitted and accepted in these states
    pub fn accepts_bids(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::OpenForBids)
    }

    /// Check whether `next` is a legal edge from this status
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self, next),
            (Pending, OpenForBids)
                | (Pending | OpenForBids, BidAccepted)
                | (BidAccepted, Completed)
                | (Pending | OpenForBids, Cancelled)
        )
    }

    /// Targets an organization may request directly.
    ///
    /// BID_ACCEPTED and COMPLETED are only reachable through bid acceptance
    /// and project submission.
    pub fn is_manual_target(&self) -> bool {
        matches!(self, RequestStatus::OpenForBids | RequestStatus::Cancelled)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "OPEN_FOR_BIDS" => Ok(RequestStatus::OpenForBids),
            "BID_ACCEPTED" => Ok(RequestStatus::BidAccepted),
            "COMPLETED" => Ok(RequestStatus::Completed),
            "CANCELLED" => Ok(RequestStatus::Cancelled),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

/// Status of a bid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Pending => "PENDING",
            BidStatus::Accepted => "ACCEPTED",
            BidStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BidStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BidStatus::Pending),
            "ACCEPTED" => Ok(BidStatus::Accepted),
            "REJECTED" => Ok(BidStatus::Rejected),
            _ => Err(format!("Invalid bid status: {}", s)),
        }
    }
}

/// Status of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// Work is underway
    InProgress,
    /// Deliverable handed in, awaiting the organization's approval
    Submitted,
    /// Approved by the organization
    Approved,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::Submitted => "SUBMITTED",
            ProjectStatus::Approved => "APPROVED",
        }
    }

    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        matches!(
            (self, next),
            (ProjectStatus::InProgress, ProjectStatus::Submitted)
                | (ProjectStatus::Submitted, ProjectStatus::Approved)
        )
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(ProjectStatus::InProgress),
            "SUBMITTED" => Ok(ProjectStatus::Submitted),
            "APPROVED" => Ok(ProjectStatus::Approved),
            _ => Err(format!("Invalid project status: {}", s)),
        }
    }
}

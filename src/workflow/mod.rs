//! Request, bid and project lifecycle
//!
//! The engine applies every multi-step mutation inside one store transaction,
//! writes the matching audit entry in that transaction, and only notifies the
//! webhook dispatcher after the commit.

pub mod engine;
pub mod status;

pub use engine::{BidAcceptance, ProjectSubmission, WorkflowEngine};
pub use status::{BidStatus, ProjectStatus, RequestStatus};

//! Outbound webhook notifications
//!
//! Workflow operations enqueue durable [`DeliveryRecord`]s; the
//! [`Dispatcher`] delivers them with at-least-once semantics. Receivers must
//! tolerate duplicates: a crash between a successful POST and the SUCCESS
//! write causes the record to be sent again by the next sweep.

pub mod dispatcher;
pub mod endpoint;
pub mod event;
pub mod record;

pub use dispatcher::{Dispatcher, DispatcherConfig, SweepReport};
pub use endpoint::validate_endpoint;
pub use event::{ProjectSummary, WebhookEvent, WebhookPayload};
pub use record::{DeliveryRecord, DeliveryStatus, DeliveryStore};

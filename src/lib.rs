//! Fulfillment server - request, bid and project broker with webhook notifications

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod matching;
pub mod models;
pub mod store;
pub mod webhook;
pub mod workflow;

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::webhook::{Dispatcher, DispatcherConfig};
use crate::workflow::WorkflowEngine;

/// Application state shared across handlers
pub struct AppState {
    pub store: store::Store,
    pub engine: WorkflowEngine,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: DispatcherConfig) -> error::Result<Arc<Self>> {
        let store = store::Store::new(pool);
        let dispatcher = Dispatcher::new(store.clone(), config)?;
        let engine = WorkflowEngine::new(store.clone(), dispatcher.clone());

        Ok(Arc::new(Self {
            store,
            engine,
            dispatcher,
        }))
    }
}

pub use api::router;

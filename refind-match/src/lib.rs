//! refind-match library interface
//!
//! Exposes the match engine, database operations, and HTTP router for
//! the service binary and for integration testing.

pub mod api;
pub mod db;
pub mod engine;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use refind_common::config::MatchingConfig;

use crate::engine::image_client::ImageSimilarity;
use crate::engine::runner::MatchRunner;
use crate::engine::text_client::TextSimilarity;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Validated matching configuration
    pub config: Arc<MatchingConfig>,
    /// Match lifecycle runner
    pub runner: Arc<MatchRunner>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Assemble state with injected signal providers
    pub fn new(
        db: SqlitePool,
        config: MatchingConfig,
        text: Arc<dyn TextSimilarity>,
        image: Arc<dyn ImageSimilarity>,
    ) -> Self {
        let config = Arc::new(config);
        let runner = Arc::new(MatchRunner::new(
            db.clone(),
            config.clone(),
            text,
            image,
        ));

        Self {
            db,
            config,
            runner,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::matching_routes())
        .merge(api::health_routes())
        .with_state(state)
}

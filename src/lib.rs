pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    attempt_service::AttemptService, metrics_service::MetricsService,
    progress_service::ProgressService,
};
use crate::store::postgres::{PgAttemptStore, PgCatalogStore, PgEnrollmentStore, PgMetricsStore};
use crate::store::{AttemptStore, CatalogStore, EnrollmentStore, MetricsStore};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub attempt_service: AttemptService,
    pub progress_service: ProgressService,
    pub metrics_service: MetricsService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self::with_stores(
            Arc::new(PgCatalogStore::new(pool.clone())),
            Arc::new(PgAttemptStore::new(pool.clone())),
            Arc::new(PgEnrollmentStore::new(pool.clone())),
            Arc::new(PgMetricsStore::new(pool)),
        )
    }

    /// Stores are injected here once at startup; nothing downstream
    /// reaches for ambient state. Tests pass the in-memory backend.
    pub fn with_stores(
        catalog: Arc<dyn CatalogStore>,
        attempts: Arc<dyn AttemptStore>,
        enrollments: Arc<dyn EnrollmentStore>,
        metrics: Arc<dyn MetricsStore>,
    ) -> Self {
        let progress_service = ProgressService::new(enrollments);
        let metrics_service = MetricsService::new(metrics);
        let attempt_service = AttemptService::new(
            catalog,
            attempts,
            progress_service.clone(),
            metrics_service.clone(),
        );
        Self {
            attempt_service,
            progress_service,
            metrics_service,
        }
    }
}

//! Store selection and the services shared by all handlers.

use std::sync::Arc;

use anyhow::Context;

use loomerp_core::{DomainResult, Segment};
use loomerp_infra::config::AppConfig;
use loomerp_infra::services::{DocumentService, StockService};
use loomerp_infra::store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};

pub struct AppServices {
    pub stock: StockService<dyn DocumentStore>,
    pub documents: DocumentService<dyn DocumentStore>,
    pub default_segment: Segment,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>, default_segment: Segment) -> Self {
        Self {
            stock: StockService::new(store.clone()),
            documents: DocumentService::new(store),
            default_segment,
        }
    }

    /// Dev/test wiring with nothing persisted.
    pub fn in_memory(default_segment: Segment) -> Self {
        Self::new(Arc::new(InMemoryDocumentStore::new()), default_segment)
    }

    /// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let Some(db) = &config.database else {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            return Ok(Self::in_memory(config.default_segment.clone()));
        };

        let store = PostgresDocumentStore::connect(&db.url, db.max_connections)
            .await
            .context("failed to connect to postgres")?;
        store.migrate().await.context("failed to apply schema")?;
        tracing::info!(max_connections = db.max_connections, "postgres store ready");

        Ok(Self::new(Arc::new(store), config.default_segment.clone()))
    }

    /// Requested segment, or the configured default when absent or blank.
    pub fn segment(&self, requested: Option<&str>) -> DomainResult<Segment> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Segment::new(s),
            None => Ok(self.default_segment.clone()),
        }
    }
}

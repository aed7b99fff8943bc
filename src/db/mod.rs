use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::error::StoreError;
use crate::geo::{BoundingBox, GeoPoint};
use crate::models::alert::Alert;
use crate::models::outcome::DeliveryOutcome;
use crate::models::recipient::Recipient;
use crate::models::suppression_window::SuppressionWindow;

pub mod pg;
pub mod queries;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Which recipients to load. Only rows with coordinates inside `bounds` come back.
#[derive(Debug, Clone, Copy)]
pub struct RecipientFilter {
    pub bounds: BoundingBox,
}

/// Storage collaborator shared by the suppression store, the recipient index
/// and outcome persistence.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn load_recipients(&self, filter: RecipientFilter) -> Result<Vec<Recipient>, StoreError>;

    async fn save_suppression_window(&self, window: &SuppressionWindow) -> Result<(), StoreError>;

    /// Windows created strictly after `since`. `center` lets a backend narrow
    /// the scan; callers still apply the exact distance check.
    async fn query_suppression_windows(
        &self,
        center: GeoPoint,
        since: DateTime<Utc>,
    ) -> Result<Vec<SuppressionWindow>, StoreError>;

    /// Windows expired at `before` are removed. Returns how many.
    async fn purge_suppression_windows(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn save_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Attaches the outcome once. Returns false if an outcome was already set.
    async fn save_alert_outcome(
        &self,
        alert_id: &str,
        outcome: &DeliveryOutcome,
    ) -> Result<bool, StoreError>;
}

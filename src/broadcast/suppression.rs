use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::Persistence;
use crate::error::StoreError;
use crate::geo::{distance_km, GeoPoint};
use crate::models::suppression_window::SuppressionWindow;

/// Answers "was a notification already sent near here recently?"
#[async_trait]
pub trait SuppressionStore: Send + Sync {
    async fn should_suppress(&self, center: GeoPoint, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Opens a new window. Only called for broadcasts that proceed.
    async fn record(&self, center: GeoPoint, now: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Suppression over persisted windows.
///
/// Check-then-record is not atomic: two alerts for the same place arriving
/// within milliseconds of each other can both pass `should_suppress` before
/// either records. That double notification is accepted; no lock is taken.
pub struct WindowSuppressionStore {
    persistence: Arc<dyn Persistence>,
    radius_km: f64,
    duration: Duration,
}

impl WindowSuppressionStore {
    pub fn new(persistence: Arc<dyn Persistence>, radius_km: f64, duration: Duration) -> Self {
        Self { persistence, radius_km, duration }
    }

    /// Radius boundary is inclusive, duration boundary exclusive.
    fn suppresses(&self, window: &SuppressionWindow, center: GeoPoint, now: DateTime<Utc>) -> bool {
        window.is_active(now)
            && now - window.created_at < self.duration
            && distance_km(center, window.center) <= self.radius_km
    }
}

#[async_trait]
impl SuppressionStore for WindowSuppressionStore {
    async fn should_suppress(&self, center: GeoPoint, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let windows = self
            .persistence
            .query_suppression_windows(center, now - self.duration)
            .await?;

        Ok(windows.iter().any(|w| self.suppresses(w, center, now)))
    }

    async fn record(&self, center: GeoPoint, now: DateTime<Utc>) -> Result<(), StoreError> {
        let window = SuppressionWindow::open(center, now, self.duration);
        self.persistence.save_suppression_window(&window).await?;

        // Expiry is checked on read, so a failed purge only costs space.
        match self.persistence.purge_suppression_windows(now).await {
            Ok(0) => {}
            Ok(n) => debug!(purged = n, "Purged expired suppression windows"),
            Err(e) => warn!(error = %e, "Failed to purge expired suppression windows"),
        }
        Ok(())
    }
}

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// A recent broadcast at a location. Never updated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct SuppressionWindow {
    pub window_id: Uuid,
    pub center: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SuppressionWindow {
    pub fn open(center: GeoPoint, now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            window_id: Uuid::new_v4(),
            center,
            created_at: now,
            expires_at: now + duration,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

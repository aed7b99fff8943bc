use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{Persistence, RecipientFilter};
use crate::error::StoreError;
use crate::geo::{distance_km, BoundingBox, GeoPoint};
use crate::models::recipient::Recipient;

#[async_trait]
pub trait RecipientIndex: Send + Sync {
    /// Reachable recipients within `radius_km` of `center` (inclusive).
    async fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Recipient>, StoreError>;
}

/// Bounding-box pre-filter in the store, exact haversine here.
pub struct GeoRecipientIndex {
    persistence: Arc<dyn Persistence>,
}

impl GeoRecipientIndex {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait]
impl RecipientIndex for GeoRecipientIndex {
    async fn find_within_radius(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> Result<Vec<Recipient>, StoreError> {
        let bounds = BoundingBox::around(center, radius_km);
        let candidates = self
            .persistence
            .load_recipients(RecipientFilter { bounds })
            .await?;

        let mut seen = HashSet::new();
        let mut selected: Vec<Recipient> = candidates
            .into_iter()
            .filter(|r| r.is_reachable())
            .filter(|r| {
                r.location.is_some_and(|loc| {
                    bounds.contains(loc) && distance_km(center, loc) <= radius_km
                })
            })
            .filter(|r| seen.insert(r.recipient_id.clone()))
            .collect();

        selected.sort_by(|a, b| a.recipient_id.cmp(&b.recipient_id));
        Ok(selected)
    }
}

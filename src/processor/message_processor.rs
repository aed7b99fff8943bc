use crate::broadcast::coordinator::BroadcastCoordinator;
use crate::db::Persistence;
use crate::geo::GeoPoint;
use crate::models::alert::Alert;
use crate::models::message::AlertSubmission;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything a consumed submission needs on its way to the coordinator.
pub struct Intake {
    pub persistence: Arc<dyn Persistence>,
    pub coordinator: BroadcastCoordinator,
}

/// Turns a submission into an alert. Out-of-range coordinates are rejected;
/// absent ones are passed through for the coordinator to refuse.
pub fn build_alert(submission: AlertSubmission, now: DateTime<Utc>) -> Result<Alert, String> {
    let origin = match (submission.latitude, submission.longitude) {
        (Some(lat), Some(lng)) => {
            let point = GeoPoint::new(lat, lng);
            if !point.is_valid() {
                return Err(format!("coordinates out of range: ({lat}, {lng})"));
            }
            Some(point)
        }
        _ => None,
    };

    let alert_id = submission
        .alert_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Ok(Alert {
        alert_id,
        category: submission.category,
        severity: submission.severity,
        title: submission.title,
        description: submission.description,
        origin,
        created_at: submission.created_at.unwrap_or(now),
        outcome: None,
    })
}

pub async fn process_message(intake: &Intake, payload: &[u8]) -> anyhow::Result<()> {
    // 1. Parse JSON
    let submission: AlertSubmission = match serde_json::from_slice(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!("Failed to parse alert submission: {}", e);
            return Ok(());
        }
    };

    let radius_override = submission
        .radius_km
        .filter(|r| r.is_finite() && *r > 0.0);

    // 2. Build the alert record
    let alert = match build_alert(submission, Utc::now()) {
        Ok(a) => a,
        Err(reason) => {
            warn!("Dropping alert submission: {}", reason);
            return Ok(());
        }
    };

    let radius_km = radius_override
        .unwrap_or_else(|| intake.coordinator.policy().radius_for(alert.severity));

    info!(
        alert_id = %alert.alert_id,
        category = %alert.category,
        severity = %alert.severity,
        radius_km,
        "Processing alert"
    );

    // 3. Persist before broadcasting; suppressed alerts stay queryable too
    intake.persistence.save_alert(&alert).await?;

    // 4. Broadcast
    let outcome = intake.coordinator.broadcast(alert, radius_km).await?;
    if outcome.suppressed {
        info!("Alert saved, notification suppressed (duplicate nearby)");
    }

    Ok(())
}

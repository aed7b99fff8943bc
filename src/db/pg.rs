use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use crate::db::{queries, DbPool, Persistence, RecipientFilter};
use crate::error::StoreError;
use crate::geo::GeoPoint;
use crate::models::alert::Alert;
use crate::models::outcome::DeliveryOutcome;
use crate::models::recipient::Recipient;
use crate::models::suppression_window::SuppressionWindow;

/// Postgres-backed persistence collaborator.
#[derive(Clone)]
pub struct PgPersistence {
    pool: DbPool,
}

impl PgPersistence {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for ddl in [
            queries::CREATE_ALERTS,
            queries::CREATE_RECIPIENTS,
            queries::CREATE_RECIPIENTS_GEO_INDEX,
            queries::CREATE_SUPPRESSION_WINDOWS,
            queries::CREATE_SUPPRESSION_WINDOWS_INDEX,
        ] {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for PgPersistence {
    async fn load_recipients(&self, filter: RecipientFilter) -> Result<Vec<Recipient>, StoreError> {
        let rows = sqlx::query(queries::SELECT_RECIPIENTS_IN_BOX)
            .bind(filter.bounds.min_lat)
            .bind(filter.bounds.max_lat)
            .bind(filter.bounds.min_lng)
            .bind(filter.bounds.max_lng)
            .fetch_all(&self.pool)
            .await?;

        let mut recipients = Vec::with_capacity(rows.len());
        for row in rows {
            let lat: Option<f64> = row.try_get("lat")?;
            let lng: Option<f64> = row.try_get("lng")?;
            recipients.push(Recipient {
                recipient_id: row.try_get("recipient_id")?,
                location: lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng)),
                phone: row.try_get("phone")?,
                email: row.try_get("email")?,
                sms_enabled: row.try_get("sms_enabled")?,
                email_enabled: row.try_get("email_enabled")?,
            });
        }
        Ok(recipients)
    }

    async fn save_suppression_window(&self, window: &SuppressionWindow) -> Result<(), StoreError> {
        sqlx::query(queries::INSERT_SUPPRESSION_WINDOW)
            .bind(window.window_id)
            .bind(window.center.lat)
            .bind(window.center.lng)
            .bind(window.created_at)
            .bind(window.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query_suppression_windows(
        &self,
        _center: GeoPoint,
        since: DateTime<Utc>,
    ) -> Result<Vec<SuppressionWindow>, StoreError> {
        let rows = sqlx::query(queries::SELECT_SUPPRESSION_WINDOWS_SINCE)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<SuppressionWindow, StoreError> {
                let window_id: Uuid = row.try_get("window_id")?;
                Ok(SuppressionWindow {
                    window_id,
                    center: GeoPoint::new(row.try_get("lat")?, row.try_get("lng")?),
                    created_at: row.try_get("created_at")?,
                    expires_at: row.try_get("expires_at")?,
                })
            })
            .collect()
    }

    async fn purge_suppression_windows(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(queries::DELETE_EXPIRED_SUPPRESSION_WINDOWS)
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn save_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        sqlx::query(queries::INSERT_ALERT)
            .bind(&alert.alert_id)
            .bind(alert.category.as_str())
            .bind(alert.severity.as_str())
            .bind(&alert.title)
            .bind(&alert.description)
            .bind(alert.origin.map(|p| p.lat))
            .bind(alert.origin.map(|p| p.lng))
            .bind(alert.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_alert_outcome(
        &self,
        alert_id: &str,
        outcome: &DeliveryOutcome,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::UPDATE_ALERT_OUTCOME)
            .bind(alert_id)
            .bind(outcome.suppressed)
            .bind(outcome.attempted as i32)
            .bind(outcome.delivered as i32)
            .bind(outcome.failed as i32)
            .bind(Json(outcome))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

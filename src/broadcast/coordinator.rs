use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::dispatcher::ChannelDispatcher;
use super::pool::WorkerPool;
use super::recipients::RecipientIndex;
use super::suppression::SuppressionStore;
use crate::config::BroadcastPolicy;
use crate::db::Persistence;
use crate::error::BroadcastError;
use crate::models::alert::Alert;
use crate::models::outcome::{DeliveryOutcome, DeliveryStatus, DispatchRecord};
use crate::models::recipient::{Channel, Recipient};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One delivery of one alert to one recipient over one channel.
#[derive(Debug, Clone)]
struct DispatchUnit {
    recipient_id: String,
    channel: Channel,
    address: String,
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Runs the broadcast pipeline for one alert at a time:
/// suppression check, recipient selection, fan-out, aggregation.
///
/// Holds no per-alert state; the persisted alert record is the source of
/// truth once an outcome is attached.
pub struct BroadcastCoordinator {
    policy: BroadcastPolicy,
    suppression: Arc<dyn SuppressionStore>,
    recipients: Arc<dyn RecipientIndex>,
    dispatcher: Arc<ChannelDispatcher>,
    persistence: Arc<dyn Persistence>,
    workers: WorkerPool,
    clock: Arc<dyn Clock>,
}

impl BroadcastCoordinator {
    pub fn new(
        policy: BroadcastPolicy,
        suppression: Arc<dyn SuppressionStore>,
        recipients: Arc<dyn RecipientIndex>,
        dispatcher: Arc<ChannelDispatcher>,
        persistence: Arc<dyn Persistence>,
        workers: WorkerPool,
    ) -> Self {
        Self {
            policy,
            suppression,
            recipients,
            dispatcher,
            persistence,
            workers,
            clock: Arc::new(SystemClock),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &BroadcastPolicy {
        &self.policy
    }

    /// Broadcasts `alert` to reachable recipients within `radius_km`.
    ///
    /// Call at most once per alert id. Dispatch failures are recorded in the
    /// outcome; only missing coordinates and store failures during selection
    /// or finalization are returned as errors.
    ///
    /// An alert without coordinates is still finalized, with zero attempts,
    /// before the error is returned.
    pub async fn broadcast(&self, mut alert: Alert, radius_km: f64) -> Result<DeliveryOutcome, BroadcastError> {
        let Some(center) = alert.origin else {
            error!(alert_id = %alert.alert_id, "Alert entered broadcast without coordinates");
            if let Err(e) = self.finalize(&mut alert, DeliveryOutcome::default()).await {
                error!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Failed to finalize alert without coordinates"
                );
            }
            return Err(BroadcastError::MissingCoordinates {
                alert_id: alert.alert_id,
            });
        };
        let now = self.clock.now();

        let suppressed = match self.suppression.should_suppress(center, now).await {
            Ok(suppressed) => suppressed,
            Err(e) => {
                warn!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Suppression check unavailable, proceeding as not suppressed (degraded mode)"
                );
                false
            }
        };

        if suppressed {
            info!(alert_id = %alert.alert_id, "Recent broadcast nearby, notification suppressed");
            return self.finalize(&mut alert, DeliveryOutcome::suppressed()).await;
        }

        if let Err(e) = self.suppression.record(center, now).await {
            warn!(
                alert_id = %alert.alert_id,
                error = %e,
                "Failed to record suppression window (degraded mode)"
            );
        }

        let recipients = self.recipients.find_within_radius(center, radius_km).await?;
        info!(
            alert_id = %alert.alert_id,
            recipients = recipients.len(),
            radius_km,
            "Recipients selected"
        );

        let records = if recipients.is_empty() {
            Vec::new()
        } else {
            let message: Arc<str> = Arc::from(alert.render_message());
            self.fan_out(&alert.alert_id, &recipients, message).await
        };

        self.finalize(&mut alert, DeliveryOutcome::from_records(records)).await
    }

    /// Spawns one task per (recipient, channel). Tasks are detached, so a
    /// dropped caller never abandons a send mid-flight.
    async fn fan_out(&self, alert_id: &str, recipients: &[Recipient], message: Arc<str>) -> Vec<DispatchRecord> {
        let units: Vec<DispatchUnit> = recipients
            .iter()
            .flat_map(|r| {
                r.channels().into_iter().map(|(channel, address)| DispatchUnit {
                    recipient_id: r.recipient_id.clone(),
                    channel,
                    address: address.to_string(),
                })
            })
            .collect();

        let retry = RetryPolicy {
            max_retries: self.policy.max_retries,
            backoff_base: self.policy.backoff_base,
        };

        let handles: Vec<_> = units
            .iter()
            .cloned()
            .map(|unit| {
                tokio::spawn(run_unit(
                    alert_id.to_string(),
                    unit,
                    message.clone(),
                    self.dispatcher.clone(),
                    self.workers.clone(),
                    retry,
                ))
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(units)
            .map(|(joined, unit)| match joined {
                Ok(record) => record,
                Err(e) => {
                    error!(alert_id, recipient_id = %unit.recipient_id, error = %e, "Dispatch task aborted");
                    DispatchRecord {
                        recipient_id: unit.recipient_id,
                        channel: unit.channel,
                        status: DeliveryStatus::Failed,
                        error: Some(format!("dispatch task aborted: {e}")),
                        retries: 0,
                    }
                }
            })
            .collect()
    }

    async fn finalize(&self, alert: &mut Alert, outcome: DeliveryOutcome) -> Result<DeliveryOutcome, BroadcastError> {
        alert.outcome = Some(outcome.clone());

        let written = self
            .persistence
            .save_alert_outcome(&alert.alert_id, &outcome)
            .await?;
        if !written {
            warn!(alert_id = %alert.alert_id, "Alert already carried an outcome, record left unchanged");
        }

        info!(
            alert_id = %alert.alert_id,
            suppressed = outcome.suppressed,
            attempted = outcome.attempted,
            delivered = outcome.delivered,
            failed = outcome.failed,
            "Broadcast finalized"
        );
        Ok(outcome)
    }
}

async fn run_unit(
    alert_id: String,
    unit: DispatchUnit,
    message: Arc<str>,
    dispatcher: Arc<ChannelDispatcher>,
    workers: WorkerPool,
    retry: RetryPolicy,
) -> DispatchRecord {
    let mut retries = 0;
    let result = loop {
        // Permit covers the send only, not the backoff sleep.
        let attempt = match workers.acquire().await {
            Ok(_permit) => dispatcher.send(unit.channel, &unit.address, &message).await,
            Err(e) => break Err(format!("worker pool closed: {e}")),
        };

        match attempt {
            Ok(()) => break Ok(()),
            Err(e) if e.is_retryable() && retries < retry.max_retries => {
                let delay = retry.backoff(retries);
                warn!(
                    alert_id = %alert_id,
                    recipient_id = %unit.recipient_id,
                    channel = %unit.channel,
                    retry = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Dispatch failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(e) => break Err(e.to_string()),
        }
    };

    match result {
        Ok(()) => DispatchRecord {
            recipient_id: unit.recipient_id,
            channel: unit.channel,
            status: DeliveryStatus::Delivered,
            error: None,
            retries,
        },
        Err(detail) => {
            warn!(
                alert_id = %alert_id,
                recipient_id = %unit.recipient_id,
                channel = %unit.channel,
                retries,
                error = %detail,
                "Dispatch failed"
            );
            DispatchRecord {
                recipient_id: unit.recipient_id,
                channel: unit.channel,
                status: DeliveryStatus::Failed,
                error: Some(detail),
                retries,
            }
        }
    }
}

//! In-memory stand-ins for the database and the gateways.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::broadcast::coordinator::Clock;
use crate::db::{Persistence, RecipientFilter};
use crate::error::{DispatchError, StoreError};
use crate::gateway::Gateway;
use crate::geo::GeoPoint;
use crate::models::alert::Alert;
use crate::models::outcome::DeliveryOutcome;
use crate::models::recipient::Recipient;
use crate::models::suppression_window::SuppressionWindow;

/// Ordered log of side effects shared between fakes.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn recipient(id: &str, location: Option<GeoPoint>) -> Recipient {
    let digits: String = id.bytes().map(|b| char::from(b'0' + b % 10)).collect();
    Recipient {
        recipient_id: id.to_string(),
        location,
        phone: Some(format!("+91{:0>10}", digits)),
        email: None,
        sms_enabled: true,
        email_enabled: false,
    }
}

#[derive(Default)]
pub struct MemoryPersistence {
    recipients: Mutex<Vec<Recipient>>,
    windows: Mutex<Vec<SuppressionWindow>>,
    alerts: Mutex<HashMap<String, Alert>>,
    outcomes: Mutex<HashMap<String, DeliveryOutcome>>,
    fail_window_reads: AtomicBool,
    fail_window_writes: AtomicBool,
    fail_recipient_reads: AtomicBool,
    fail_outcome_writes: AtomicBool,
    journal: Option<Journal>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub fn add_recipient(&self, recipient: Recipient) {
        self.recipients.lock().unwrap().push(recipient);
    }

    pub fn windows(&self) -> Vec<SuppressionWindow> {
        self.windows.lock().unwrap().clone()
    }

    pub fn alert(&self, alert_id: &str) -> Option<Alert> {
        self.alerts.lock().unwrap().get(alert_id).cloned()
    }

    pub fn outcome(&self, alert_id: &str) -> Option<DeliveryOutcome> {
        self.outcomes.lock().unwrap().get(alert_id).cloned()
    }

    pub fn fail_window_reads(&self, fail: bool) {
        self.fail_window_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_window_writes(&self, fail: bool) {
        self.fail_window_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_recipient_reads(&self, fail: bool) {
        self.fail_recipient_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_outcome_writes(&self, fail: bool) {
        self.fail_outcome_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn note(&self, entry: String) {
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(entry);
        }
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn load_recipients(&self, filter: RecipientFilter) -> Result<Vec<Recipient>, StoreError> {
        self.check(&self.fail_recipient_reads)?;
        // Unlocated rows are passed through so callers' own filtering is exercised.
        Ok(self
            .recipients
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.location.map_or(true, |p| filter.bounds.contains(p)))
            .cloned()
            .collect())
    }

    async fn save_suppression_window(&self, window: &SuppressionWindow) -> Result<(), StoreError> {
        self.check(&self.fail_window_writes)?;
        self.windows.lock().unwrap().push(window.clone());
        self.note("window".to_string());
        Ok(())
    }

    async fn query_suppression_windows(
        &self,
        _center: GeoPoint,
        since: DateTime<Utc>,
    ) -> Result<Vec<SuppressionWindow>, StoreError> {
        self.check(&self.fail_window_reads)?;
        Ok(self
            .windows
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.created_at > since)
            .cloned()
            .collect())
    }

    async fn purge_suppression_windows(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut windows = self.windows.lock().unwrap();
        let len = windows.len();
        windows.retain(|w| w.expires_at > before);
        Ok((len - windows.len()) as u64)
    }

    async fn save_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts
            .lock()
            .unwrap()
            .entry(alert.alert_id.clone())
            .or_insert_with(|| alert.clone());
        Ok(())
    }

    async fn save_alert_outcome(
        &self,
        alert_id: &str,
        outcome: &DeliveryOutcome,
    ) -> Result<bool, StoreError> {
        self.check(&self.fail_outcome_writes)?;
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.contains_key(alert_id) {
            return Ok(false);
        }
        outcomes.insert(alert_id.to_string(), outcome.clone());
        self.note("outcome".to_string());
        Ok(true)
    }
}

/// Gateway that replays scripted results per address, then succeeds.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, VecDeque<Result<(), DispatchError>>>>,
    calls: Mutex<HashMap<String, u32>>,
    delay: Option<std::time::Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    journal: Option<Journal>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn script(&self, address: &str, results: Vec<Result<(), DispatchError>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), results.into());
    }

    pub fn calls(&self, address: &str) -> u32 {
        self.calls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn deliver(&self, address: &str, _message: &str) -> Result<(), DispatchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert(0) += 1;
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(format!("deliver {address}"));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(address)
            .and_then(|q| q.pop_front());
        scripted.unwrap_or(Ok(()))
    }
}

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

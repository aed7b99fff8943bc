use serde::{Deserialize, Serialize};

use crate::models::recipient::Channel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[allow(dead_code)] // skipped-* are part of the stored audit vocabulary
pub enum DeliveryStatus {
    Delivered,
    Failed,
    SkippedSuppressed,
    SkippedOutOfRange,
}

/// One attempted (recipient, channel) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub recipient_id: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retries: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub suppressed: bool,
    pub attempted: u32,
    pub delivered: u32,
    pub failed: u32,
    pub records: Vec<DispatchRecord>,
}

impl DeliveryOutcome {
    pub fn suppressed() -> Self {
        Self { suppressed: true, ..Self::default() }
    }

    pub fn from_records(records: Vec<DispatchRecord>) -> Self {
        let delivered = records
            .iter()
            .filter(|r| r.status == DeliveryStatus::Delivered)
            .count() as u32;
        let failed = records
            .iter()
            .filter(|r| r.status == DeliveryStatus::Failed)
            .count() as u32;
        Self {
            suppressed: false,
            attempted: records.len() as u32,
            delivered,
            failed,
            records,
        }
    }
}

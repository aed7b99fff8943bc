use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::models::alert::{Category, Severity};

/// Alert submission as published on the ingest topic by the submission flow.
#[derive(Debug, Deserialize)]
pub struct AlertSubmission {
    pub alert_id: Option<String>,
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub longitude: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub radius_km: Option<f64>,
}

fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    let v: Option<StringOrFloat> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        Some(StringOrFloat::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::GeoPoint;
use crate::models::outcome::DeliveryOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Earthquake,
    Flood,
    Fire,
    Cyclone,
    Tsunami,
    Landslide,
    VolcanicActivity,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Earthquake => "earthquake",
            Category::Flood => "flood",
            Category::Fire => "fire",
            Category::Cyclone => "cyclone",
            Category::Tsunami => "tsunami",
            Category::Landslide => "landslide",
            Category::VolcanicActivity => "volcanic-activity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    /// Resolved upstream; `None` here is a contract violation.
    pub origin: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub outcome: Option<DeliveryOutcome>,
}

const SIGN_OFF: &str = "- DisasterWatch Team";

impl Alert {
    /// Text sent over every channel: headline, description, sign-off, one
    /// per line. An empty description drops its line.
    pub fn render_message(&self) -> String {
        let prefix = match self.severity {
            Severity::Critical => "CRITICAL ALERT",
            Severity::High => "HIGH PRIORITY ALERT",
            Severity::Medium | Severity::Low => "ALERT",
        };
        let category = self.category.as_str().replace('-', " ").to_uppercase();
        let headline = format!("{prefix}: {category} - {}", self.title.trim().to_uppercase());

        let description = self.description.trim();
        if description.is_empty() {
            format!("{headline}\n{SIGN_OFF}")
        } else {
            format!("{headline}\n{description}\n{SIGN_OFF}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(severity: Severity, description: &str) -> Alert {
        Alert {
            alert_id: "a-1".to_string(),
            category: Category::VolcanicActivity,
            severity,
            title: " Eruption near village ".to_string(),
            description: description.to_string(),
            origin: Some(GeoPoint::new(-7.54, 110.44)),
            created_at: Utc::now(),
            outcome: None,
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_category_wire_names() {
        let c: Category = serde_json::from_str("\"volcanic-activity\"").unwrap();
        assert_eq!(c, Category::VolcanicActivity);
        assert_eq!(serde_json::to_string(&Category::Fire).unwrap(), "\"fire\"");
    }

    #[test]
    fn test_render_message() {
        assert_eq!(
            alert(Severity::Critical, "Evacuate now").render_message(),
            "CRITICAL ALERT: VOLCANIC ACTIVITY - ERUPTION NEAR VILLAGE\nEvacuate now\n- DisasterWatch Team"
        );
        assert_eq!(
            alert(Severity::Low, "  ").render_message(),
            "ALERT: VOLCANIC ACTIVITY - ERUPTION NEAR VILLAGE\n- DisasterWatch Team"
        );
        assert_eq!(
            alert(Severity::High, "").render_message(),
            "HIGH PRIORITY ALERT: VOLCANIC ACTIVITY - ERUPTION NEAR VILLAGE\n- DisasterWatch Team"
        );
    }
}

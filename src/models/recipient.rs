use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => f.write_str("sms"),
            Channel::Email => f.write_str("email"),
        }
    }
}

/// Read-only snapshot of a notifiable subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub recipient_id: String,
    pub location: Option<GeoPoint>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub sms_enabled: bool,
    pub email_enabled: bool,
}

impl Recipient {
    /// Channels that are enabled and have an address to send to.
    pub fn channels(&self) -> Vec<(Channel, &str)> {
        let mut out = Vec::with_capacity(2);
        if self.sms_enabled {
            if let Some(phone) = self.phone.as_deref() {
                out.push((Channel::Sms, phone));
            }
        }
        if self.email_enabled {
            if let Some(email) = self.email.as_deref() {
                out.push((Channel::Email, email));
            }
        }
        out
    }

    pub fn is_reachable(&self) -> bool {
        self.location.is_some() && !self.channels().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_require_flag_and_address() {
        let r = Recipient {
            recipient_id: "r1".to_string(),
            location: Some(GeoPoint::new(1.0, 1.0)),
            phone: Some("+919800000001".to_string()),
            email: None,
            sms_enabled: true,
            email_enabled: true,
        };
        assert_eq!(r.channels(), vec![(Channel::Sms, "+919800000001")]);
        assert!(r.is_reachable());

        let silent = Recipient { sms_enabled: false, ..r.clone() };
        assert!(!silent.is_reachable());

        let unlocated = Recipient { location: None, ..r };
        assert!(!unlocated.is_reachable());
    }
}

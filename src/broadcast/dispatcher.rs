use std::sync::Arc;
use std::time::Duration;

use crate::error::DispatchError;
use crate::gateway::Gateway;
use crate::models::recipient::Channel;

/// Sends one message to one address over one channel. Exactly one gateway
/// call per `send`; retries and rate limiting belong to the caller.
pub struct ChannelDispatcher {
    sms: Arc<dyn Gateway>,
    email: Arc<dyn Gateway>,
    timeout: Duration,
    country_code: String,
}

pub const DEFAULT_COUNTRY_CODE: &str = "+91";

impl ChannelDispatcher {
    pub fn new(sms: Arc<dyn Gateway>, email: Arc<dyn Gateway>, timeout: Duration) -> Self {
        Self {
            sms,
            email,
            timeout,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }

    /// Prefix applied to phone numbers written without a leading `+`.
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub async fn send(&self, channel: Channel, address: &str, message: &str) -> Result<(), DispatchError> {
        let (gateway, address) = match channel {
            Channel::Sms => match normalize_phone(address, &self.country_code) {
                Some(e164) => (&self.sms, e164),
                None => {
                    return Err(DispatchError::InvalidAddress(format!(
                        "malformed phone number: {address}"
                    )))
                }
            },
            Channel::Email => {
                if !is_valid_email(address) {
                    return Err(DispatchError::InvalidAddress(format!(
                        "malformed email address: {address}"
                    )));
                }
                (&self.email, address.trim().to_string())
            }
        };

        match tokio::time::timeout(self.timeout, gateway.deliver(&address, message)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::GatewayUnavailable(format!(
                "{channel} gateway timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// E.164 form of `phone`, or `None` when it is malformed.
///
/// Accepts an optional leading `+` followed by 10-15 digits once spaces and
/// dashes are removed. Numbers without `+` get `country_code` prepended, and
/// the result must still fit E.164's 15 digits.
pub fn normalize_phone(phone: &str, country_code: &str) -> Option<String> {
    let cleaned: String = phone
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    let (international, digits) = match cleaned.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let e164 = if international {
        format!("+{digits}")
    } else {
        format!("{country_code}{digits}")
    };
    (e164.len() - 1 <= 15).then_some(e164)
}

/// `+` followed by 1-3 digits.
pub fn is_valid_country_code(code: &str) -> bool {
    code.strip_prefix('+').is_some_and(|digits| {
        (1..=3).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
    })
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.trim().split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => !local.is_empty() && domain.contains('.'),
        _ => false,
    }
}

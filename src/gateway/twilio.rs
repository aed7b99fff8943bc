use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{classify_status, classify_transport, Gateway};
use crate::config::TwilioConfig;
use crate::error::DispatchError;

/// Twilio error code for an invalid `To` number.
const INVALID_TO_NUMBER: u32 = 21211;
/// Twilio error code for a recipient who replied STOP.
const UNSUBSCRIBED_RECIPIENT: u32 = 21610;

#[derive(Debug, Deserialize)]
struct TwilioError {
    code: Option<u32>,
    message: Option<String>,
}

/// SMS over the Twilio Messages API.
pub struct TwilioSms {
    client: Client,
    config: TwilioConfig,
}

impl TwilioSms {
    pub fn new(client: Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Gateway for TwilioSms {
    async fn deliver(&self, address: &str, message: &str) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", address),
                ("From", self.config.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status.is_success() {
            debug!(to = address, "Twilio accepted message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_twilio(status, &body))
    }
}

fn classify_twilio(status: reqwest::StatusCode, body: &str) -> DispatchError {
    if let Ok(err) = serde_json::from_str::<TwilioError>(body) {
        let detail = err.message.unwrap_or_else(|| status.to_string());
        match err.code {
            Some(INVALID_TO_NUMBER) => return DispatchError::InvalidAddress(detail),
            Some(UNSUBSCRIBED_RECIPIENT) => return DispatchError::GatewayRejected(detail),
            _ => {}
        }
    }
    classify_status(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_twilio_error_codes() {
        let invalid = r#"{"code": 21211, "message": "The 'To' number is not valid", "status": 400}"#;
        assert!(matches!(
            classify_twilio(StatusCode::BAD_REQUEST, invalid),
            DispatchError::InvalidAddress(_)
        ));

        let stopped = r#"{"code": 21610, "message": "Attempt to send to unsubscribed recipient"}"#;
        assert!(matches!(
            classify_twilio(StatusCode::BAD_REQUEST, stopped),
            DispatchError::GatewayRejected(_)
        ));

        assert!(classify_twilio(StatusCode::BAD_GATEWAY, "<html>").is_retryable());
    }

    #[test]
    fn test_messages_url() {
        let sms = TwilioSms::new(
            Client::new(),
            TwilioConfig {
                api_base: "https://api.twilio.com/".to_string(),
                account_sid: "AC123".to_string(),
                auth_token: "t".to_string(),
                from_number: "+15550000000".to_string(),
                default_country_code: "+91".to_string(),
            },
        );
        assert_eq!(
            sms.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}

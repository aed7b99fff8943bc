use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{classify_status, classify_transport, Gateway};
use crate::config::EmailConfig;
use crate::error::DispatchError;

const SUBJECT: &str = "DISASTER ALERT";

#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Email through an HTTP relay that accepts a JSON envelope.
pub struct HttpEmail {
    client: Client,
    config: EmailConfig,
}

impl HttpEmail {
    pub fn new(client: Client, config: EmailConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Gateway for HttpEmail {
    async fn deliver(&self, address: &str, message: &str) -> Result<(), DispatchError> {
        let payload = EmailRequest {
            from: &self.config.from_address,
            to: address,
            subject: SUBJECT,
            body: message,
        };

        let mut request = self.client.post(&self.config.gateway_url).json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if status.is_success() {
            debug!(to = address, "Email relay accepted message");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

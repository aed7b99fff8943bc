use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::DispatchError;

pub mod email;
pub mod twilio;

/// One external delivery primitive per channel.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn deliver(&self, address: &str, message: &str) -> Result<(), DispatchError>;
}

/// Maps a non-success HTTP status onto the dispatch taxonomy.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> DispatchError {
    let detail = format!("{status}: {}", body.chars().take(200).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        DispatchError::GatewayUnavailable(detail)
    } else {
        DispatchError::GatewayRejected(detail)
    }
}

pub(crate) fn classify_transport(e: reqwest::Error) -> DispatchError {
    DispatchError::GatewayUnavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(!classify_status(StatusCode::FORBIDDEN, "opted out").is_retryable());
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad"),
            DispatchError::GatewayRejected(_)
        ));
    }
}

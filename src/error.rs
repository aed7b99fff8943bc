use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Failure of a single send over one channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("gateway rejected: {0}")]
    GatewayRejected(String),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::GatewayUnavailable(_))
    }
}

/// Broadcast-level failures surfaced to the caller. Per-recipient dispatch
/// errors never appear here.
#[derive(Error, Debug)]
pub enum BroadcastError {
    #[error("alert {alert_id} reached the broadcast pipeline without coordinates")]
    MissingCoordinates { alert_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

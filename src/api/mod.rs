// Remote webhook access: predictions, the two chatbots and login.

pub mod client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::{INVALID_CREDENTIALS_MESSAGE, NETWORK_ERROR_MESSAGE};
use crate::chat::ConversationKind;
use crate::predictions::record::PredictionRecord;

pub use client::WebhookClient;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("{0}")]
    MalformedPayload(String),

    /// The auth webhook refused the credentials.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    /// Message shown under the login form for this failure.
    pub fn login_message(&self) -> String {
        match self {
            ApiError::Rejected(message) if !message.trim().is_empty() => message.clone(),
            ApiError::Rejected(_) => INVALID_CREDENTIALS_MESSAGE.to_string(),
            _ => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Token and expiry granted by a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginGrant {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// Everything the app loop needs from the network. [`WebhookClient`] is the
/// real implementation; tests substitute their own.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn fetch_predictions(&self) -> Result<Vec<PredictionRecord>, ApiError>;

    /// Ask one chatbot a question. `token` is attached when the caller holds
    /// a valid session.
    async fn ask(
        &self,
        kind: ConversationKind,
        question: &str,
        token: Option<&str>,
    ) -> Result<String, ApiError>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError>;
}

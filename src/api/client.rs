// reqwest client for the prediction, chat and auth webhooks.
//
// Every call is a single JSON request/response. Transport failures, non-2xx
// statuses and payloads that do not match the expected shape are mapped to
// `ApiError` variants for the app loop to turn into user-visible state.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ApiError, LoginGrant, RemoteService};
use crate::auth::session::parse_expiry;
use crate::chat::ConversationKind;
use crate::config::{Config, EndpointsConfig};
use crate::predictions::record::{parse_payload, PredictionRecord};

// ---------------------------------------------------------------------------
// WebhookClient
// ---------------------------------------------------------------------------

pub struct WebhookClient {
    http: reqwest::Client,
    endpoints: EndpointsConfig,
}

impl WebhookClient {
    /// Build a client from the application config.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http.timeout())
            .build()?;
        Ok(Self {
            http,
            endpoints: config.endpoints.clone(),
        })
    }

    fn chat_url(&self, kind: ConversationKind) -> &str {
        match kind {
            ConversationKind::Daily => &self.endpoints.chat,
            ConversationKind::PreDay => &self.endpoints.weekly_chat,
        }
    }
}

#[async_trait]
impl RemoteService for WebhookClient {
    async fn fetch_predictions(&self) -> Result<Vec<PredictionRecord>, ApiError> {
        debug!(url = %self.endpoints.predictions, "fetching predictions");
        let response = self.http.get(&self.endpoints.predictions).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "prediction fetch failed");
            return Err(ApiError::Status(status.as_u16()));
        }

        let payload = read_json(response).await?;
        let records =
            parse_payload(payload).map_err(|e| ApiError::MalformedPayload(e.to_string()))?;
        debug!(count = records.len(), "predictions decoded");
        Ok(records)
    }

    async fn ask(
        &self,
        kind: ConversationKind,
        question: &str,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        let body = chat_request_body(question, token);
        debug!(?kind, "sending chat question");
        let response = self.http.post(self.chat_url(kind)).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(?kind, status = status.as_u16(), "chat request failed");
            return Err(ApiError::Status(status.as_u16()));
        }

        let payload = read_json(response).await?;
        parse_answer(&payload)
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError> {
        debug!(email, "sending login");
        let response = self
            .http
            .post(&self.endpoints.auth)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let payload = read_json(response).await?;
        if status.is_success() {
            parse_login_grant(&payload)
        } else {
            warn!(status = status.as_u16(), "login rejected");
            Err(ApiError::Rejected(rejection_message(&payload)))
        }
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::MalformedPayload(format!("response is not JSON: {e}")))
}

/// `{question}` plus `token` when a session is active.
pub(crate) fn chat_request_body(question: &str, token: Option<&str>) -> Value {
    let mut body = json!({ "question": question });
    if let Some(token) = token {
        body["token"] = Value::String(token.to_string());
    }
    body
}

/// Extract `answer` from a chat response.
pub(crate) fn parse_answer(payload: &Value) -> Result<String, ApiError> {
    payload
        .get("answer")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::MalformedPayload("chat response has no answer".into()))
}

/// Read token and expiry from a login response. The webhook capitalizes the
/// keys; lowercase is accepted too.
pub(crate) fn parse_login_grant(payload: &Value) -> Result<LoginGrant, ApiError> {
    let field = |upper: &str, lower: &str| payload.get(upper).or_else(|| payload.get(lower));

    let token = field("Token", "token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::MalformedPayload("login response has no token".into()))?;
    let expiry = field("Expiry", "expiry")
        .and_then(parse_expiry)
        .ok_or_else(|| ApiError::MalformedPayload("login response has no valid expiry".into()))?;

    Ok(LoginGrant {
        token: token.to_string(),
        expiry,
    })
}

fn rejection_message(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

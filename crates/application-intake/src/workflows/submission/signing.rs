use std::fmt::Debug;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::domain::{SigningRequest, SigningRequestId};
use crate::config::SigningConfig;

/// Outbound port to the e-signature service.
#[async_trait]
pub trait SigningGateway: Debug + Send + Sync {
    async fn create_request(
        &self,
        request: &SigningRequest,
    ) -> Result<SigningRequestId, SigningError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signing client unavailable: {0}")]
    Client(String),
    #[error("signing service unreachable: {0}")]
    Transport(String),
    #[error("signing service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("template request failed: {status} {reason}")]
    TemplateUnavailable { status: u16, reason: String },
    #[error("unreadable signing service response: {0}")]
    Decode(String),
}

/// `Authorization` value for the signing API: the key is the Basic username and the
/// password half is empty.
pub fn basic_authorization(api_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{api_key}:")))
}

#[derive(Serialize)]
struct CreateRequestBody<'a> {
    document: &'a SigningRequest,
}

/// HTTP client for the Modusign REST API.
#[derive(Clone)]
pub struct ModusignClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ModusignClient {
    pub fn new(config: &SigningConfig) -> Result<Self, SigningError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SigningError::Client(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Same connection pool and base URL, authenticated as a different account.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_key: api_key.into(),
        }
    }

    pub async fn submit(
        &self,
        request: &SigningRequest,
    ) -> Result<SigningRequestId, SigningError> {
        let url = format!(
            "{}/templates/{}/requests",
            self.base_url, request.template_id
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, basic_authorization(&self.api_key))
            .json(&CreateRequestBody { document: request })
            .send()
            .await
            .map_err(|err| SigningError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SigningError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(SigningError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| value.get("id").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();

        info!(template_id = %request.template_id, signing_request_id = %id, "signing request created");
        Ok(SigningRequestId(id))
    }

    /// Template metadata exactly as the service returns it.
    pub async fn template(&self, template_id: &str) -> Result<Value, SigningError> {
        let url = format!("{}/templates/{}", self.base_url, template_id);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, basic_authorization(&self.api_key))
            .send()
            .await
            .map_err(|err| SigningError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SigningError::TemplateUnavailable {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| SigningError::Decode(err.to_string()))
    }
}

impl Debug for ModusignClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModusignClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningGateway for ModusignClient {
    async fn create_request(
        &self,
        request: &SigningRequest,
    ) -> Result<SigningRequestId, SigningError> {
        self.submit(request).await
    }
}

//! Outbound submission of a form record.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use shared::{domain::Record, error::FailureCategory};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server answered with status {status}")]
    Status { status: u16 },
    #[error("response body is not valid JSON: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

impl TransportError {
    pub fn category(&self) -> FailureCategory {
        match self {
            TransportError::Encode(_) | TransportError::Network { .. } => {
                FailureCategory::Transport
            }
            TransportError::Status { .. } => FailureCategory::Status,
            TransportError::MalformedBody(_) => FailureCategory::MalformedBody,
        }
    }
}

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    async fn post_record(&self, record: &Record) -> Result<serde_json::Value, TransportError>;
}

pub struct HttpSubmissionTransport {
    http: Client,
    endpoint: Url,
}

impl HttpSubmissionTransport {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn network_error(&self, source: reqwest::Error) -> TransportError {
        TransportError::Network {
            endpoint: self.endpoint.to_string(),
            source,
        }
    }
}

#[async_trait]
impl SubmissionTransport for HttpSubmissionTransport {
    async fn post_record(&self, record: &Record) -> Result<serde_json::Value, TransportError> {
        // reqwest's `.json()` would send a bare `application/json`; the charset is part of the contract.
        let body = serde_json::to_vec(record).map_err(TransportError::Encode)?;
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        debug!(status = status.as_u16(), endpoint = %self.endpoint, "form: response received");
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.network_error(e))?;
        serde_json::from_slice(&bytes).map_err(TransportError::MalformedBody)
    }
}

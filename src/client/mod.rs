//! Resilient API Client
//!
//! Authenticated access to the demand/procurement API.
//!
//! ## Retry policy
//!
//! A request that comes back `401 Unauthorized` triggers one token renewal
//! and, if renewal succeeds, one reissue of the original request. Nothing
//! else is retried here, so a logical request never costs more than two
//! transport calls.
//!
//! Concurrent requests renew independently: two simultaneous 401s each
//! call `auth/refresh` once. Both writes replace the whole credential, so
//! the last one wins.

mod renewal;
mod transport;

pub use renewal::{RefreshTokenRenewal, TokenRenewal};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

use crate::procurement::ProcurementInterval;
use crate::session::SessionContext;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8000/api/")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Time window for the dashboard endpoint
#[derive(Debug, Clone, Default)]
pub struct DashboardQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DashboardQuery {
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }
}

/// Client for the demand/procurement API
pub struct ApiClient<T = ReqwestTransport, R = RefreshTokenRenewal<ReqwestTransport>> {
    transport: Arc<T>,
    renewal: R,
    session: SessionContext,
    base_url: String,
}

impl ApiClient {
    /// Build a client on `reqwest`, renewing through `{base}auth/refresh`
    pub fn new(config: &ClientConfig, session: SessionContext) -> ClientResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(std::time::Duration::from_millis(
            config.request_timeout_ms,
        ))?);
        let refresh_url = join_url(&config.base_url, "auth/refresh");
        let renewal = RefreshTokenRenewal::new(Arc::clone(&transport), session.clone(), refresh_url);

        Ok(Self::with_parts(&config.base_url, transport, renewal, session))
    }
}

impl<T: Transport, R: TokenRenewal> ApiClient<T, R> {
    /// Assemble a client from explicit parts
    pub fn with_parts(
        base_url: &str,
        transport: Arc<T>,
        renewal: R,
        session: SessionContext,
    ) -> Self {
        Self {
            transport,
            renewal,
            session,
            base_url: base_url.to_string(),
        }
    }

    /// The session this client authenticates with
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Send a request, renewing the bearer credential once on 401.
    ///
    /// Returns every response the server produced, including error
    /// statuses. `Err` means no response was received.
    pub async fn request(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let caller_authorized = request.headers.contains_key(AUTHORIZATION);

        let mut first = request.clone();
        set_request_id(&mut first.headers, &request_id)?;
        if !caller_authorized {
            if let Some(token) = self.session.bearer() {
                set_bearer(&mut first.headers, &token)?;
            }
        }

        tracing::debug!(request_id = %request_id, method = %request.method, url = %request.url, "Sending request");
        let response = self.transport.send(first).await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(request_id = %request_id, "Unauthorized, renewing bearer credential");
        let token = match self.renewal.renew().await {
            Ok(credential) => match credential.bearer_token {
                Some(token) => token,
                None => return Ok(response),
            },
            Err(ClientError::NoRenewalCredential) => {
                tracing::debug!(request_id = %request_id, "Unauthorized with no renewal credential");
                return Ok(response);
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Token renewal failed");
                return Ok(response);
            }
        };

        let mut retry = request;
        set_request_id(&mut retry.headers, &request_id)?;
        set_bearer(&mut retry.headers, &token)?;

        let response = self.transport.send(retry).await?;
        tracing::debug!(request_id = %request_id, status = %response.status, "Retried after renewal");

        Ok(response)
    }

    /// Send a request and decode a successful JSON body
    pub async fn get_json<D: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<D> {
        let response = self.request(request).await?;

        if !response.is_success() {
            let body = response.text();
            tracing::warn!(status = %response.status, "API request failed");
            return Err(ClientError::RequestFailed {
                status: response.status.as_u16(),
                body,
            });
        }

        response.json()
    }

    /// GET `demand/dashboard` for a time window
    pub async fn dashboard(&self, query: &DashboardQuery) -> ClientResult<Vec<ProcurementInterval>> {
        let mut request = ApiRequest::get(self.url("demand/dashboard"));
        if let Some(start) = &query.start {
            request = request.query("start", start);
        }
        if let Some(end) = &query.end {
            request = request.query("end", end);
        }

        let intervals: Vec<ProcurementInterval> = self.get_json(request).await?;
        tracing::info!(intervals = intervals.len(), "Fetched dashboard intervals");
        Ok(intervals)
    }

    /// POST `demand/bulk-add` and return the computed intervals
    pub async fn bulk_add(&self, payload: &serde_json::Value) -> ClientResult<Vec<ProcurementInterval>> {
        let request = ApiRequest::post(self.url("demand/bulk-add")).json(payload.clone());

        let intervals: Vec<ProcurementInterval> = self.get_json(request).await?;
        tracing::info!(intervals = intervals.len(), "Bulk upload processed");
        Ok(intervals)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Authorization value for a token, without doubling an existing scheme
fn bearer_value(token: &str) -> String {
    let token = token.trim();
    match token.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => token.to_string(),
        _ => format!("Bearer {}", token),
    }
}

fn set_bearer(headers: &mut HeaderMap, token: &str) -> ClientResult<()> {
    let value = HeaderValue::from_str(&bearer_value(token))
        .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

fn set_request_id(headers: &mut HeaderMap, request_id: &str) -> ClientResult<()> {
    let value = HeaderValue::from_str(request_id)
        .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
    headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    Ok(())
}

/// Errors that can occur when talking to the API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No renewal credential stored")]
    NoRenewalCredential,

    #[error("Token renewal failed: {0}")]
    RenewalFailed(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

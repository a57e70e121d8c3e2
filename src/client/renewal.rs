//! Token renewal
//!
//! Exchanges the stored renewal credential for a new bearer credential
//! with a single `POST auth/refresh`.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::transport::{ApiRequest, Transport};
use super::{ClientError, ClientResult};
use crate::session::{Credential, SessionContext};

/// Obtains a fresh bearer credential
///
/// Implementations must not retry internally: the request client calls
/// `renew` at most once per failed request. Returning
/// [`ClientError::NoRenewalCredential`] tells the client there was nothing
/// to renew with, and the original 401 is handed back unchanged.
#[async_trait]
pub trait TokenRenewal: Send + Sync {
    async fn renew(&self) -> ClientResult<Credential>;
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Renewal against the API's `auth/refresh` endpoint
pub struct RefreshTokenRenewal<T> {
    transport: Arc<T>,
    session: SessionContext,
    refresh_url: String,
}

impl<T: Transport> RefreshTokenRenewal<T> {
    pub fn new(transport: Arc<T>, session: SessionContext, refresh_url: impl Into<String>) -> Self {
        Self {
            transport,
            session,
            refresh_url: refresh_url.into(),
        }
    }

    pub fn refresh_url(&self) -> &str {
        &self.refresh_url
    }
}

#[async_trait]
impl<T: Transport> TokenRenewal for RefreshTokenRenewal<T> {
    async fn renew(&self) -> ClientResult<Credential> {
        let renewal_token = self
            .session
            .renewal()
            .ok_or(ClientError::NoRenewalCredential)?;

        let request = ApiRequest::post(&self.refresh_url)
            .json(serde_json::json!({ "refresh_token": renewal_token }));

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ClientError::RenewalFailed(e.to_string()))?;

        if !response.is_success() {
            return Err(ClientError::RenewalFailed(format!(
                "refresh endpoint returned {}",
                response.status
            )));
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| ClientError::RenewalFailed(e.to_string()))?;

        let credential = Credential {
            bearer_token: Some(body.access_token),
            renewal_token: body.refresh_token,
            bearer_expiry_hint_seconds: body
                .expires_in
                .unwrap_or_else(|| self.session.bearer_ttl_secs()),
        };
        self.session.store(&credential);

        tracing::info!(
            rotated = credential.renewal_token.is_some(),
            expires_in = credential.bearer_expiry_hint_seconds,
            "Bearer credential renewed"
        );

        Ok(Credential {
            renewal_token: credential.renewal_token.or(Some(renewal_token)),
            ..credential
        })
    }
}

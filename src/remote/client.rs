// ABOUTME: HTTP client for the CNPJ product API
// ABOUTME: Handles auth, company lookups, and ETL job control with bearer-token requests

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, GENERIC_REQUEST_FAILURE};

use super::models::{
    EtlLogs, EtlStartAck, EtlStartRequest, EtlStatus, EtlValidation, LoginRequest, TokenResponse,
    User,
};

/// Shape of the backend's non-2xx error bodies.
#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Typed boundary to the product API.
///
/// The bearer token is fixed at construction; a login/logout creates a new
/// client rather than mutating an existing one. The client keeps the latest
/// successfully fetched [`EtlValidation`] and [`EtlStatus`], replaced whole
/// on every successful call (never merged field by field).
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    last_validation: Mutex<Option<EtlValidation>>,
    last_status: Mutex<Option<EtlStatus>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            last_validation: Mutex::new(None),
            last_status: Mutex::new(None),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request with the bearer token attached (when present),
    /// mapping non-2xx responses to [`ApiError::Http`] with the server's
    /// `detail` message or a generic fallback.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(ApiError::Transport)?;
        let status = response.status();

        if !status.is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.detail)
                .unwrap_or_else(|_| GENERIC_REQUEST_FAILURE.to_string());
            return Err(ApiError::Http {
                status: status.as_u16(),
                detail,
            });
        }

        response.json().await.map_err(ApiError::Decode)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/auth/login")).json(&body))
            .await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.send(self.http.get(self.url("/auth/me"))).await
    }

    pub async fn lookup_cnpj(&self, cnpj: &str) -> Result<serde_json::Value, ApiError> {
        self.send(self.http.get(self.url(&format!("/cnpj/{}", cnpj))))
            .await
    }

    /// Read-only pre-start check. No effect on any running job.
    pub async fn validate(&self) -> Result<EtlValidation, ApiError> {
        let validation: EtlValidation = self.send(self.http.get(self.url("/etl/validate"))).await?;
        *lock(&self.last_validation) = Some(validation.clone());
        Ok(validation)
    }

    /// Requests a job start. No client-side guard against a job already
    /// running; the server answers 409 in that case and it surfaces as a
    /// plain [`ApiError::Http`].
    pub async fn start(&self, request: &EtlStartRequest) -> Result<EtlStartAck, ApiError> {
        self.send(self.http.post(self.url("/etl/start")).json(request))
            .await
    }

    /// Idempotent, side-effect-free snapshot of the current job.
    pub async fn fetch_status(&self) -> Result<EtlStatus, ApiError> {
        let status: EtlStatus = self.send(self.http.get(self.url("/etl/status"))).await?;
        *lock(&self.last_status) = Some(status.clone());
        Ok(status)
    }

    pub async fn fetch_logs(&self, lines: u32) -> Result<EtlLogs, ApiError> {
        self.send(
            self.http
                .get(self.url("/etl/logs"))
                .query(&[("lines", lines)]),
        )
        .await
    }

    /// Latest validation result from a successful [`validate`](Self::validate) call.
    pub fn last_validation(&self) -> Option<EtlValidation> {
        lock(&self.last_validation).clone()
    }

    /// Latest status snapshot from a successful [`fetch_status`](Self::fetch_status) call.
    pub fn last_status(&self) -> Option<EtlStatus> {
        lock(&self.last_status).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//! HTTP client for the Taskline REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use taskline_session::{
    AuthBackend, BackendError, BackendResult, ChangePinRequest, ChangeUsernameRequest, Session,
    SettingsSupplier, SetupRequest,
};
use tracing::{debug, warn};

use crate::envelope::decode_response;
use crate::error::{ApiError, Result};
use crate::models::{AuthResponse, AutoLockUpdate, LoginRequest, UserSettings, UsernameResponse};

/// Client for the authentication and settings endpoints
///
/// The session credential is an HTTP-only cookie held in the client's cookie
/// jar; it is never read or stored by this crate.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::new(0, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the signed-in user's settings
    pub async fn settings(&self) -> Result<UserSettings> {
        let path = "/api/settings";
        parse(self.send(self.http.get(self.url(path)), path).await?)
    }

    /// Change the auto-lock threshold; 0 disables it
    pub async fn update_auto_lock(&self, minutes: u32) -> Result<UserSettings> {
        let path = "/api/settings/auto-lock";
        let body = AutoLockUpdate { minutes };
        parse(self.send(self.http.put(self.url(path)).json(&body), path).await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", path, e);
            ApiError::network()
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            warn!("Failed to read response from {}: {}", path, e);
            ApiError::unexpected()
        })?;

        decode_response(status, &body).inspect_err(|e| {
            debug!("{} returned {}: {}", path, e.code, e.message);
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!("Unexpected response shape: {}", e);
        ApiError::unexpected()
    })
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn validate_session(&self) -> BackendResult<()> {
        self.settings().await.map(|_| ()).map_err(BackendError::from)
    }

    async fn login(&self, username: &str, pin: &str) -> BackendResult<Session> {
        let path = "/api/auth/login";
        let body = LoginRequest {
            username: username.to_string(),
            pin: pin.to_string(),
        };
        let response: AuthResponse =
            parse(self.send(self.http.post(self.url(path)).json(&body), path).await?)?;
        Ok(response.user)
    }

    async fn logout(&self) -> BackendResult<()> {
        let path = "/api/auth/logout";
        self.send(self.http.post(self.url(path)), path).await?;
        Ok(())
    }

    async fn setup(&self, request: &SetupRequest) -> BackendResult<Session> {
        let path = "/api/auth/setup";
        let response: AuthResponse =
            parse(self.send(self.http.post(self.url(path)).json(request), path).await?)?;
        Ok(response.user)
    }

    async fn change_pin(&self, request: &ChangePinRequest) -> BackendResult<()> {
        let path = "/api/auth/pin";
        self.send(self.http.put(self.url(path)).json(request), path).await?;
        Ok(())
    }

    async fn change_username(&self, request: &ChangeUsernameRequest) -> BackendResult<String> {
        let path = "/api/auth/username";
        let response: UsernameResponse =
            parse(self.send(self.http.put(self.url(path)).json(request), path).await?)?;
        Ok(response.username)
    }
}

#[async_trait]
impl SettingsSupplier for ApiClient {
    async fn auto_lock_minutes(&self) -> BackendResult<Option<u32>> {
        let settings = self.settings().await?;
        Ok(Some(settings.auto_lock_minutes))
    }
}

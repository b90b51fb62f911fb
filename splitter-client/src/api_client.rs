//! Authenticated API client.
//!
//! Every request carries the current access token. A 401 triggers one token
//! refresh and one retry of the original request; a failed refresh ends the
//! session. Concurrent requests that expire together each refresh on their
//! own; nothing serializes them.

use crate::config::ClientConfig;
use crate::endpoints::{
    AuthApi, BalancesApi, ExpensesApi, GroupsApi, NotificationsApi, SettlementsApi,
};
use crate::session::SessionStore;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use splitter_core::{AuthResponse, ErrorBody, RefreshTokenRequest};
use std::sync::Arc;

pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";

/// Fallback text for API errors that carry no readable message.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Fallback text for errors that did not come from the API client.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Request failed with status code {}", status.as_u16())]
    Status {
        status: StatusCode,
        body: Option<ErrorBody>,
        raw: String,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("No refresh token")]
    MissingRefreshToken,
    #[error("Session refresh failed: {0}")]
    RefreshFailed(Box<ApiClientError>),
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("Config error: {0}")]
    Config(String),
}

impl ApiClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiClientError::Status { status, .. } => Some(*status),
            ApiClientError::RefreshFailed(inner) => inner.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiClientError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// User-facing text: server `message`, then server `error`, then this
    /// error's own description, then a fixed fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiClientError::Status { body, .. } => body
                .as_ref()
                .and_then(ErrorBody::preferred_text)
                .map(str::to_string)
                .unwrap_or_else(|| non_blank_or(self.to_string(), GENERIC_ERROR_MESSAGE)),
            ApiClientError::RefreshFailed(inner) => inner.user_message(),
            other => non_blank_or(other.to_string(), GENERIC_ERROR_MESSAGE),
        }
    }
}

/// Extract a human-readable message from any error.
pub fn error_message(error: &(dyn std::error::Error + 'static)) -> String {
    match error.downcast_ref::<ApiClientError>() {
        Some(api_error) => api_error.user_message(),
        None => non_blank_or(error.to_string(), UNEXPECTED_ERROR_MESSAGE),
    }
}

fn non_blank_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    login_route: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("session", &self.session)
            .field("login_route", &self.login_route)
            .finish()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiClientError> {
        let transport = ReqwestTransport::new(&config.api_base_url, config.request_timeout())?;
        Ok(Self::with_transport(
            Arc::new(transport),
            session,
            config.login_route.clone(),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            session,
            login_route: login_route.into(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn groups(&self) -> GroupsApi<'_> {
        GroupsApi::new(self)
    }

    pub fn expenses(&self) -> ExpensesApi<'_> {
        ExpensesApi::new(self)
    }

    pub fn balances(&self) -> BalancesApi<'_> {
        BalancesApi::new(self)
    }

    pub fn settlements(&self) -> SettlementsApi<'_> {
        SettlementsApi::new(self)
    }

    pub fn notifications(&self) -> NotificationsApi<'_> {
        NotificationsApi::new(self)
    }

    /// Send a request with the session's bearer token, recovering once from
    /// an expired token.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiClientError> {
        let mut token = self.session.access_token();
        let mut retried = false;
        loop {
            let mut attempt = request.clone();
            if let Some(token) = token.as_deref() {
                attempt.set_bearer(token)?;
            }
            let response = self.transport.send(attempt).await?;
            if response.status != StatusCode::UNAUTHORIZED || retried {
                return check_status(response);
            }

            retried = true;
            tracing::debug!(method = %request.method, path = %request.path, "Access token rejected, refreshing");
            match self.refresh_session().await {
                Ok(tokens) => token = Some(tokens.access_token),
                Err(err) => {
                    tracing::warn!(error = %err, "Session refresh failed, logging out");
                    self.session.logout();
                    self.session.redirect_to_login(&self.login_route);
                    return Err(ApiClientError::RefreshFailed(Box::new(err)));
                }
            }
        }
    }

    /// Exchange the stored refresh token for a new pair. Goes straight to the
    /// transport so a 401 here cannot recurse into another refresh.
    async fn refresh_session(&self) -> Result<AuthResponse, ApiClientError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(ApiClientError::MissingRefreshToken)?;
        let request = HttpRequest::post(REFRESH_PATH).with_json(&RefreshTokenRequest { refresh_token })?;
        let response = check_status(self.transport.send(request).await?)?;
        let tokens: AuthResponse = response.json()?;
        self.session.set_tokens(&tokens);
        Ok(tokens)
    }

    pub async fn get_json<T>(&self, path: &str, query: Vec<(String, String)>) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(HttpRequest::get(path).with_query(query)).await?;
        Ok(response.json()?)
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(HttpRequest::post(path).with_json(body)?).await?;
        Ok(response.json()?)
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        let response = self.execute(HttpRequest::post(path)).await?;
        Ok(response.json()?)
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(HttpRequest::put(path).with_json(body)?).await?;
        Ok(response.json()?)
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.execute(HttpRequest::patch(path).with_json(body)?).await?;
        Ok(response.json()?)
    }

    /// POST whose response body is ignored.
    pub async fn post_unit<B>(&self, path: &str, body: Option<&B>) -> Result<(), ApiClientError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = HttpRequest::post(path);
        if let Some(body) = body {
            request = request.with_json(body)?;
        }
        self.execute(request).await?;
        Ok(())
    }

    pub async fn put_unit<B>(&self, path: &str, body: &B) -> Result<(), ApiClientError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(HttpRequest::put(path).with_json(body)?).await?;
        Ok(())
    }

    pub async fn delete_unit(&self, path: &str) -> Result<(), ApiClientError> {
        self.execute(HttpRequest::delete(path)).await?;
        Ok(())
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiClientError> {
    if response.is_success() {
        return Ok(response);
    }
    let body = serde_json::from_str::<ErrorBody>(&response.body).ok();
    Err(ApiClientError::Status {
        status: response.status,
        body,
        raw: response.body,
    })
}

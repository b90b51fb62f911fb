use super::api_path;
use crate::api_client::{ApiClient, ApiClientError};
use splitter_core::{
    AuthResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenValidation,
};

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiClientError> {
        self.client.post_json(&api_path("/auth/login"), req).await
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiClientError> {
        self.client.post_json(&api_path("/auth/register"), req).await
    }

    /// Explicit refresh. The interceptor performs its own refresh on 401 and
    /// does not use this.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, ApiClientError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.client.post_json(&api_path("/auth/refresh"), &body).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiClientError> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.client
            .post_unit(&api_path("/auth/logout"), Some(&body))
            .await
    }

    pub async fn logout_all(&self) -> Result<(), ApiClientError> {
        self.client
            .post_unit::<()>(&api_path("/auth/logout-all"), None)
            .await
    }

    pub async fn validate(&self) -> Result<TokenValidation, ApiClientError> {
        self.client
            .get_json(&api_path("/auth/validate"), Vec::new())
            .await
    }
}

//! HTTP client for the authorization and resource servers

use rand::Rng;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::ClientError;

const STATE_LENGTH: usize = 16;

/// Client registration as known to the client itself
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the authorization server
    pub server_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Response from a resource server call
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub status: StatusCode,
    pub body: String,
}

pub struct OAuthClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl OAuthClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.config.server_url.trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// URL the user's browser is sent to for login and consent.
    pub fn authorize_url(&self, scope: Option<&str>, state: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint("/oauth/authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri);
            if let Some(scope) = scope {
                query.append_pair("scope", scope);
            }
            query.append_pair("state", state);
        }
        Ok(url)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ClientError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self.post_authenticated("/oauth/token", &params).await?;
        tracing::info!("Exchanged authorization code for tokens");
        Ok(response.json().await?)
    }

    /// Use a refresh token, optionally narrowing the scope.
    pub async fn refresh(&self, refresh_token: &str, scope: Option<&str>) -> Result<TokenResponse, ClientError> {
        let mut params = vec![("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        if let Some(scope) = scope {
            params.push(("scope", scope));
        }
        let response = self.post_authenticated("/oauth/token", &params).await?;
        tracing::info!("Refreshed access token");
        Ok(response.json().await?)
    }

    /// Ask the authorization server to decode and verify an access token.
    pub async fn introspect(&self, token: &str) -> Result<Value, ClientError> {
        let response = self.post_authenticated("/oauth/check_token", &[("token", token)]).await?;
        Ok(response.json().await?)
    }

    pub async fn revoke(&self, token: &str) -> Result<(), ClientError> {
        self.post_authenticated("/oauth/revoke", &[("token", token)]).await?;
        tracing::info!("Revoked token");
        Ok(())
    }

    /// GET a resource with the access token as a bearer credential.
    ///
    /// Non-success statuses are returned, not turned into errors, so 401/403
    /// responses can be inspected.
    pub async fn call(&self, url: &str, access_token: &str) -> Result<ResourceResponse, ClientError> {
        let response = self.http.get(url).bearer_auth(access_token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("GET {} -> {}", url, status);
        Ok(ResourceResponse { status, body })
    }

    async fn post_authenticated(&self, path: &str, params: &[(&str, &str)]) -> Result<Response, ClientError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(params)
            .send()
            .await?;
        check(response).await
    }
}

/// Random value for the `state` parameter.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await?;
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => Err(ClientError::OAuth {
            status: status.as_u16(),
            error: error.error,
            description: error.error_description,
        }),
        Err(_) => Err(ClientError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

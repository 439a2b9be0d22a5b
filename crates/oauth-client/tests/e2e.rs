//! End-to-end tests for oauth-client.
//!
//! Runs the authorization server and resource server on ephemeral ports and
//! drives them over real HTTP with the client.

use std::net::SocketAddr;
use std::sync::Arc;

use authorization_server::codes::AuthorizationCode;
use authorization_server::config::Config;
use authorization_server::session::SessionManager;
use authorization_server::storage::Storage;
use chrono::Duration;
use oauth2_token::{KeyPair, Scopes, TokenVerifier};
use oauth_client::{ClientConfig, ClientError, OAuthClient};
use reqwest::StatusCode;

const PRIVATE_KEY: &str = include_str!("../../oauth2-token/tests/fixtures/private_key.pem");

struct Servers {
    auth_addr: SocketAddr,
    resource_addr: SocketAddr,
    auth_state: Arc<authorization_server::AppState>,
}

impl Servers {
    async fn start() -> Self {
        let key_pair = KeyPair::from_pem("oauth2-jwt", PRIVATE_KEY).unwrap();

        let auth_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let auth_addr = auth_listener.local_addr().unwrap();
        let auth_state = Arc::new(
            authorization_server::AppState::new(
                Config::demo_with_cost(4).unwrap(),
                Storage::in_memory(),
                &key_pair,
                SessionManager::new(cookie::Key::generate(), 3600),
                &format!("http://{auth_addr}"),
            )
            .await
            .unwrap(),
        );
        let auth_app = authorization_server::router(auth_state.clone());
        tokio::spawn(async move { axum::serve(auth_listener, auth_app).await });

        let resource_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let resource_addr = resource_listener.local_addr().unwrap();
        let verifier = TokenVerifier::new(auth_state.public_key.clone());
        let resource_app = resource_server::router(Arc::new(resource_server::AppState::new(verifier)));
        tokio::spawn(async move { axum::serve(resource_listener, resource_app).await });

        Self {
            auth_addr,
            resource_addr,
            auth_state,
        }
    }

    fn client(&self, client_secret: &str) -> OAuthClient {
        OAuthClient::new(ClientConfig {
            server_url: format!("http://{}", self.auth_addr),
            client_id: "demo".to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: "https://app/cb".to_string(),
        })
    }

    /// Stand in for the browser half of the flow.
    async fn issue_code(&self, code: &str, scope: &str) {
        let record = AuthorizationCode::new("demo", "user", Scopes::parse(scope), "https://app/cb", Duration::minutes(5));
        self.auth_state.codes.store(code, record).await.unwrap();
    }

    fn resource(&self, path: &str) -> String {
        format!("http://{}{}", self.resource_addr, path)
    }
}

#[tokio::test]
async fn test_code_to_resource() {
    let servers = Servers::start().await;
    let client = servers.client("demo-secret");
    servers.issue_code("abc123", "read").await;

    let tokens = client.exchange_code("abc123").await.unwrap();
    assert_eq!(tokens.token_type, "bearer");
    assert_eq!(tokens.scope.as_deref(), Some("read"));

    let protected = client.call(&servers.resource("/v1/protected"), &tokens.access_token).await.unwrap();
    assert_eq!(protected.status, StatusCode::OK);
    assert!(protected.body.contains("\"subject\":\"user\""));

    let admin = client.call(&servers.resource("/v1/admin"), &tokens.access_token).await.unwrap();
    assert_eq!(admin.status, StatusCode::FORBIDDEN);

    // The code is single-use
    match client.exchange_code("abc123").await {
        Err(ClientError::OAuth { status, error, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(error, "invalid_grant");
        }
        other => panic!("Expected invalid_grant, got {other:?}"),
    }
}

#[tokio::test]
async fn test_introspect_refresh_revoke() {
    let servers = Servers::start().await;
    let client = servers.client("demo-secret");
    servers.issue_code("code-1", "read write").await;
    let tokens = client.exchange_code("code-1").await.unwrap();

    let claims = client.introspect(&tokens.access_token).await.unwrap();
    assert_eq!(claims["active"], true);
    assert_eq!(claims["sub"], "user");
    assert_eq!(claims["iss"], format!("http://{}", servers.auth_addr));

    let refresh_token = tokens.refresh_token.unwrap();
    let narrowed = client.refresh(&refresh_token, Some("read")).await.unwrap();
    assert_eq!(narrowed.scope.as_deref(), Some("read"));
    assert_eq!(narrowed.refresh_token.as_deref(), Some(refresh_token.as_str()));

    client.revoke(&refresh_token).await.unwrap();
    assert!(matches!(
        client.refresh(&refresh_token, None).await,
        Err(ClientError::OAuth { error, .. }) if error == "invalid_grant"
    ));
}

#[tokio::test]
async fn test_wrong_secret_is_invalid_client() {
    let servers = Servers::start().await;
    servers.issue_code("code-2", "read").await;

    let result = servers.client("wrong").exchange_code("code-2").await;
    assert!(matches!(
        result,
        Err(ClientError::OAuth { status: 401, error, .. }) if error == "invalid_client"
    ));

    // The failed attempt did not consume the code
    assert!(servers.client("demo-secret").exchange_code("code-2").await.is_ok());
}

#[tokio::test]
async fn test_call_without_valid_token() {
    let servers = Servers::start().await;
    let client = servers.client("demo-secret");

    let response = client.call(&servers.resource("/v1/protected"), "garbage").await.unwrap();
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let hello = client.call(&servers.resource("/v1/hello"), "garbage").await.unwrap();
    assert_eq!(hello.body, "Hello User");
}

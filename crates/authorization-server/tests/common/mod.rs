//! Shared harness for driving the authorization server router in-process.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use authorization_server::config::Config;
use authorization_server::session::SessionManager;
use authorization_server::storage::Storage;
use authorization_server::{AppState, router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use base64::Engine;
use cookie::Key;
use oauth2_token::{KeyPair, TokenVerifier};
use serde_json::Value;
use tower::ServiceExt;

pub const PRIVATE_KEY: &str = include_str!("../../../oauth2-token/tests/fixtures/private_key.pem");
pub const PUBLIC_URL: &str = "http://localhost:8080";
pub const REDIRECT_URI: &str = "https://app/cb";

/// Response with the body already collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {}", self.body))
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).map(|v| v.to_str().unwrap())
    }

    pub fn location(&self) -> &str {
        self.header(header::LOCATION).expect("Expected a redirect")
    }

    /// Query parameters of the redirect target.
    pub fn redirect_params(&self) -> HashMap<String, String> {
        let url = url::Url::parse(self.location()).expect("Redirect target is not absolute");
        url.query_pairs().into_owned().collect()
    }
}

pub struct TestServer {
    pub state: Arc<AppState>,
    pub app: Router,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(Config::demo_with_cost(4).unwrap()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let key_pair = KeyPair::from_pem("oauth2-jwt", PRIVATE_KEY).unwrap();
        let sessions = SessionManager::new(Key::generate(), 3600);
        let state = AppState::new(config, Storage::in_memory(), &key_pair, sessions, PUBLIC_URL)
            .await
            .unwrap();
        let state = Arc::new(state);
        Self {
            app: router(state.clone()),
            state,
        }
    }

    /// Verifier a resource server would build from the published key.
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(self.state.public_key.clone()).with_issuer(PUBLIC_URL)
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        cookie: Option<&str>,
        basic: Option<(&str, &str)>,
    ) -> TestResponse {
        self.send(form_request(path, form, cookie, basic)).await
    }

    /// Log in as the demo user and return the `Cookie` header value.
    pub async fn login(&self) -> String {
        let response = self
            .post_form("/login", &[("username", "user"), ("password", "password")], None, None)
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);

        let set_cookie = response.header(header::SET_COOKIE).expect("Login should set a cookie");
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Run the browser half of the flow and return the issued code.
    pub async fn authorize(&self, cookie: &str, scope: &str) -> String {
        let consent = self.get(&authorize_path("demo", REDIRECT_URI, Some(scope), Some("xyz")), Some(cookie)).await;
        assert_eq!(consent.status, StatusCode::OK, "{}", consent.body);

        let response = self
            .post_form(
                "/oauth/authorize",
                &[
                    ("response_type", "code"),
                    ("client_id", "demo"),
                    ("redirect_uri", REDIRECT_URI),
                    ("scope", scope),
                    ("state", "xyz"),
                    ("user_oauth_approval", "true"),
                ],
                Some(cookie),
                None,
            )
            .await;
        let params = response.redirect_params();
        assert_eq!(params.get("state").map(String::as_str), Some("xyz"));
        params.get("code").cloned().expect("Expected a code")
    }

    /// Exchange a code at the token endpoint with the demo client's credentials.
    pub async fn exchange(&self, code: &str) -> TestResponse {
        self.post_form(
            "/oauth/token",
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", REDIRECT_URI),
            ],
            None,
            Some(("demo", "demo-secret")),
        )
        .await
    }
}

pub fn authorize_path(client_id: &str, redirect_uri: &str, scope: Option<&str>, state: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("response_type", "code");
    query.append_pair("client_id", client_id);
    query.append_pair("redirect_uri", redirect_uri);
    if let Some(scope) = scope {
        query.append_pair("scope", scope);
    }
    if let Some(state) = state {
        query.append_pair("state", state);
    }
    format!("/oauth/authorize?{}", query.finish())
}

pub fn form_request(
    path: &str,
    form: &[(&str, &str)],
    cookie: Option<&str>,
    basic: Option<(&str, &str)>,
) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish();

    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    if let Some((id, secret)) = basic {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{id}:{secret}"));
        request = request.header(header::AUTHORIZATION, format!("Basic {encoded}"));
    }
    request.body(Body::from(body)).unwrap()
}

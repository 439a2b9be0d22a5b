//! Browser side of the authorization code flow: login, consent, redirects.

mod common;

use std::sync::Arc;

use axum::http::{StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use common::{REDIRECT_URI, TestServer, authorize_path};

#[tokio::test]
async fn test_full_flow_reaches_protected_resource() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let code = server.authorize(&cookie, "read").await;
    let response = server.exchange(&code).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let tokens = response.json();
    assert_eq!(tokens["token_type"], "bearer");
    assert_eq!(tokens["scope"], "read");
    assert!(tokens["expires_in"].as_u64().unwrap() > 3500);
    assert!(tokens["refresh_token"].is_string());
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    // The resource server verifies the token locally with the published key
    let resources = resource_server::router(Arc::new(resource_server::AppState::new(server.verifier())));
    let get = |path: &'static str| {
        let resources = resources.clone();
        let access_token = access_token.clone();
        async move {
            resources
                .oneshot(
                    axum::http::Request::builder()
                        .uri(path)
                        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                        .body(axum::body::Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
                .status()
        }
    };
    assert_eq!(get("/v1/protected").await, StatusCode::OK);
    assert_eq!(get("/v1/admin").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_access_token_carries_user_details() {
    let server = TestServer::new().await;
    let cookie = server.login().await;
    let code = server.authorize(&cookie, "read write").await;
    let tokens = server.exchange(&code).await.json();

    let verified = server
        .verifier()
        .verify(tokens["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(verified.subject(), "user");
    assert_eq!(verified.client_id(), "demo");
    assert!(verified.has_scope("write"));
    assert_eq!(verified.claims.custom("name"), Some(&Value::from("Demo User")));
    assert_eq!(verified.claims.iss.as_deref(), Some(common::PUBLIC_URL));
}

#[tokio::test]
async fn test_unauthenticated_request_redirects_to_login() {
    let server = TestServer::new().await;
    let path = authorize_path("demo", REDIRECT_URI, Some("read"), Some("xyz"));

    let response = server.get(&path, None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location();
    assert!(location.starts_with("/login?return_to="), "{location}");

    // Logging in with that return_to lands back on the authorization request
    let return_to = url::form_urlencoded::parse(location.split_once('?').unwrap().1.as_bytes())
        .find(|(name, _)| name == "return_to")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    assert_eq!(return_to, path);

    let login = server
        .post_form(
            "/login",
            &[("username", "user"), ("password", "password"), ("return_to", &return_to)],
            None,
            None,
        )
        .await;
    assert_eq!(login.status, StatusCode::SEE_OTHER);
    assert_eq!(login.location(), path);
}

#[tokio::test]
async fn test_wrong_password_shows_login_again() {
    let server = TestServer::new().await;
    let response = server
        .post_form("/login", &[("username", "user"), ("password", "nope")], None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.header(header::SET_COOKIE).is_none());
    assert!(response.body.contains("Invalid username or password"));
}

#[tokio::test]
async fn test_unknown_client_is_not_redirected() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .get(&authorize_path("nobody", REDIRECT_URI, Some("read"), Some("xyz")), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.header(header::LOCATION).is_none());
    assert!(response.body.contains("invalid_client"));
}

#[tokio::test]
async fn test_mismatched_redirect_uri_is_not_redirected() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    for redirect_uri in ["https://evil/cb", "https://app/cb/extra"] {
        let response = server
            .get(&authorize_path("demo", redirect_uri, Some("read"), Some("xyz")), Some(&cookie))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.header(header::LOCATION).is_none());
        assert!(response.body.contains("invalid_request"));
    }
}

#[tokio::test]
async fn test_invalid_scope_redirects_with_error_and_state() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .get(&authorize_path("demo", REDIRECT_URI, Some("read admin"), Some("xyz")), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.location().starts_with(REDIRECT_URI));

    let params = response.redirect_params();
    assert_eq!(params["error"], "invalid_scope");
    assert_eq!(params["state"], "xyz");
    assert!(!params.contains_key("code"));
}

#[tokio::test]
async fn test_unsupported_response_type_redirects_with_error() {
    let server = TestServer::new().await;
    let cookie = server.login().await;
    let path = authorize_path("demo", REDIRECT_URI, Some("read"), None).replace("response_type=code", "response_type=token");

    let response = server.get(&path, Some(&cookie)).await;
    let params = response.redirect_params();
    assert_eq!(params["error"], "unsupported_response_type");
    assert!(!params.contains_key("state"));
}

#[tokio::test]
async fn test_denial_redirects_with_access_denied() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .post_form(
            "/oauth/authorize",
            &[
                ("response_type", "code"),
                ("client_id", "demo"),
                ("redirect_uri", REDIRECT_URI),
                ("scope", "read"),
                ("state", "xyz"),
                ("user_oauth_approval", "false"),
            ],
            Some(&cookie),
            None,
        )
        .await;
    let params = response.redirect_params();
    assert_eq!(params["error"], "access_denied");
    assert_eq!(params["state"], "xyz");
    assert!(!params.contains_key("code"));

    // A denial is not remembered as consent
    let again = server
        .get(&authorize_path("demo", REDIRECT_URI, Some("read"), Some("xyz")), Some(&cookie))
        .await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_out_of_range_approval_lifetime_redirects_with_server_error() {
    let mut config = authorization_server::config::Config::demo_with_cost(4).unwrap();
    config.tokens.approval_lifetime_secs = u64::MAX;
    let server = TestServer::with_config(config).await;
    let cookie = server.login().await;

    let response = server
        .post_form(
            "/oauth/authorize",
            &[
                ("response_type", "code"),
                ("client_id", "demo"),
                ("redirect_uri", REDIRECT_URI),
                ("scope", "read"),
                ("state", "xyz"),
                ("user_oauth_approval", "true"),
            ],
            Some(&cookie),
            None,
        )
        .await;
    let params = response.redirect_params();
    assert_eq!(params["error"], "server_error");
    assert_eq!(params["state"], "xyz");
    assert!(!params.contains_key("code"));
}

#[tokio::test]
async fn test_consent_post_without_session_requires_login() {
    let server = TestServer::new().await;
    let response = server
        .post_form(
            "/oauth/authorize",
            &[
                ("response_type", "code"),
                ("client_id", "demo"),
                ("redirect_uri", REDIRECT_URI),
                ("scope", "read"),
                ("user_oauth_approval", "true"),
            ],
            None,
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.location().starts_with("/login?return_to="));
}

#[tokio::test]
async fn test_remembered_approval_skips_consent() {
    let server = TestServer::new().await;
    let cookie = server.login().await;
    server.authorize(&cookie, "read write").await;

    // Same or narrower scopes go straight to the redirect
    let response = server
        .get(&authorize_path("demo", REDIRECT_URI, Some("read"), Some("again")), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let params = response.redirect_params();
    assert!(params.contains_key("code"));
    assert_eq!(params["state"], "again");
}

#[tokio::test]
async fn test_auto_approve_client_skips_consent() {
    let mut config = authorization_server::config::Config::demo_with_cost(4).unwrap();
    config.clients[0].auto_approve = true;
    let server = TestServer::with_config(config).await;
    let cookie = server.login().await;

    let response = server
        .get(&authorize_path("demo", REDIRECT_URI, Some("read"), Some("xyz")), Some(&cookie))
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let params = response.redirect_params();
    assert!(params.contains_key("code"));

    let tokens = server.exchange(&params["code"]).await;
    assert_eq!(tokens.status, StatusCode::OK);
}

#[tokio::test]
async fn test_omitted_scope_defaults_to_client_scopes() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let consent = server
        .get(&authorize_path("demo", REDIRECT_URI, None, None), Some(&cookie))
        .await;
    assert_eq!(consent.status, StatusCode::OK);
    assert!(consent.body.contains("read"));
    assert!(consent.body.contains("write"));
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let home = server.get("/", Some(&cookie)).await;
    assert!(home.body.contains("Signed in"));
    assert!(server.get("/", None).await.body.contains("Not signed in"));

    let logout = server.post_form("/logout", &[], Some(&cookie), None).await;
    assert_eq!(logout.status, StatusCode::SEE_OTHER);
    assert_eq!(logout.location(), "/login");
    let cleared = logout.header(header::SET_COOKIE).unwrap();
    assert!(cleared.starts_with("oauth_session="));
}

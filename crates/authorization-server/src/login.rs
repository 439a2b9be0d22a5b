//! Login and logout endpoints

use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::AppState;
use crate::html;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Where to send the user after a successful login
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub return_to: Option<String>,
}

/// Accept only local paths so the login form cannot become an open redirect.
pub fn safe_return_to(return_to: Option<&str>) -> Option<&str> {
    let target = return_to?;
    let local = target.starts_with('/') && !target.starts_with("//") && !target.contains('\\');
    if !local {
        tracing::warn!("Ignoring non-local return_to: {}", target);
    }
    local.then_some(target)
}

/// GET /login - Show login page
pub async fn get_login(Query(query): Query<LoginQuery>) -> Html<String> {
    Html(html::login_page(safe_return_to(query.return_to.as_deref()), None))
}

/// POST /login - Verify credentials and start a session
pub async fn post_login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> Response {
    let return_to = safe_return_to(form.return_to.as_deref());

    let Some(user) = state.users.authenticate(&form.username, &form.password).await else {
        tracing::warn!("Failed login for user {}", form.username);
        return (
            StatusCode::UNAUTHORIZED,
            Html(html::login_page(return_to, Some("Invalid username or password"))),
        )
            .into_response();
    };

    let cookie = state.sessions.start(&user.username);
    tracing::info!("User {} logged in", user.username);

    (
        [(header::SET_COOKIE, cookie.encoded().to_string())],
        Redirect::to(return_to.unwrap_or("/")),
    )
        .into_response()
}

/// POST /logout - Clear session
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let cookie = state.sessions.clear();
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to("/login"),
    )
        .into_response()
}

/// GET / - Show who is signed in
pub async fn home(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    let session = state.sessions.current(&headers);
    Html(html::home_page(session.as_ref().map(|s| s.username.as_str())))
}

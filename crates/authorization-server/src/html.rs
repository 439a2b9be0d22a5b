//! Inline HTML templates for the login, consent and error pages

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use oauth2_token::Scopes;

/// Login form. `return_to` is carried through as a hidden field.
pub fn login_page(return_to: Option<&str>, error: Option<&str>) -> String {
    let return_input = return_to
        .map(|r| format!(r#"<input type="hidden" name="return_to" value="{}">"#, attr(r)))
        .unwrap_or_default();
    let error_banner = error
        .map(|e| format!(r#"<div class="status error">{}</div>"#, text(e)))
        .unwrap_or_default();

    page(
        "Sign in",
        &format!(
            r#"<h1>Sign in</h1>
        <p>Sign in to continue to the application.</p>
        {error_banner}
        <form method="post" action="/login">
            {return_input}
            <div class="field">
                <label for="username">Username</label>
                <input type="text" id="username" name="username" required autofocus>
            </div>
            <div class="field">
                <label for="password">Password</label>
                <input type="password" id="password" name="password" required>
            </div>
            <button type="submit">Sign in</button>
        </form>"#
        ),
    )
}

/// Hidden fields replayed by the consent form
pub struct ConsentParams<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scopes: &'a Scopes,
    pub state: Option<&'a str>,
}

/// Consent page asking `username` to approve the requested scopes.
pub fn consent_page(username: &str, params: &ConsentParams<'_>) -> String {
    let scope_items: String = params
        .scopes
        .iter()
        .map(|scope| format!("<li><code>{}</code></li>", text(scope)))
        .collect();
    let state_input = params
        .state
        .map(|s| format!(r#"<input type="hidden" name="state" value="{}">"#, attr(s)))
        .unwrap_or_default();

    page(
        "Authorize application",
        &format!(
            r#"<h1>Authorize {client}</h1>
        <p>Signed in as <strong>{user}</strong>. <strong>{client}</strong> is requesting access to:</p>
        <ul class="scopes">{scope_items}</ul>
        <form method="post" action="/oauth/authorize">
            <input type="hidden" name="response_type" value="code">
            <input type="hidden" name="client_id" value="{client_attr}">
            <input type="hidden" name="redirect_uri" value="{redirect_attr}">
            <input type="hidden" name="scope" value="{scope_attr}">
            {state_input}
            <button type="submit" name="user_oauth_approval" value="true">Approve</button>
            <button type="submit" name="user_oauth_approval" value="false" class="secondary">Deny</button>
        </form>"#,
            client = text(params.client_id),
            user = text(username),
            client_attr = attr(params.client_id),
            redirect_attr = attr(params.redirect_uri),
            scope_attr = attr(&params.scopes.to_string()),
        ),
    )
}

/// Error page for authorization requests that cannot be redirected back.
pub fn error_page(error: &str, description: &str) -> String {
    page(
        "Authorization error",
        &format!(
            r#"<h1>Authorization error</h1>
        <div class="status error"><code>{}</code></div>
        <p>{}</p>"#,
            text(error),
            text(description)
        ),
    )
}

/// Landing page after login without a `return_to`
pub fn home_page(username: Option<&str>) -> String {
    let body = match username {
        Some(user) => format!(
            r#"<h1>Signed in</h1>
        <p>You are signed in as <strong>{}</strong>.</p>
        <form method="post" action="/logout"><button type="submit" class="secondary">Sign out</button></form>"#,
            text(user)
        ),
        None => r#"<h1>Not signed in</h1>
        <p><a href="/login" class="button">Sign in</a></p>"#
            .to_string(),
    };
    page("Authorization server", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>{}</style>
</head>
<body>
    <div class="container">
        {}
    </div>
</body>
</html>"#,
        text(title),
        CSS_STYLES,
        body
    )
}

const CSS_STYLES: &str = r#"
* { box-sizing: border-box; }
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    background: #f4f5f7;
    color: #222;
    margin: 0;
    padding: 20px;
    min-height: 100vh;
    display: flex;
    align-items: center;
    justify-content: center;
}
.container {
    background: #fff;
    padding: 32px;
    border-radius: 10px;
    max-width: 420px;
    width: 100%;
    box-shadow: 0 2px 12px rgba(0,0,0,0.08);
}
h1 { margin: 0 0 12px 0; font-size: 22px; }
p { color: #555; line-height: 1.5; }
.field { margin-bottom: 16px; }
label { display: block; margin-bottom: 6px; font-size: 14px; }
input { width: 100%; padding: 10px; border: 1px solid #ccc; border-radius: 6px; font-size: 15px; }
button, .button {
    display: block;
    width: 100%;
    padding: 12px;
    margin-top: 8px;
    background: #2563eb;
    color: #fff;
    border: none;
    border-radius: 6px;
    font-size: 15px;
    cursor: pointer;
    text-align: center;
    text-decoration: none;
}
button.secondary { background: #6b7280; }
.scopes { padding-left: 20px; }
.status.error { background: #fee2e2; color: #991b1b; padding: 10px; border-radius: 6px; margin-bottom: 12px; }
code { background: #f1f1f1; padding: 2px 6px; border-radius: 4px; }
"#;

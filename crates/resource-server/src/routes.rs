//! Resource endpoints

use axum::{Extension, Json};
use oauth2_token::VerifiedToken;
use serde::Serialize;
use serde_json::{Map, Value};

/// `GET /v1/hello` - no authentication
pub async fn hello() -> &'static str {
    "Hello User"
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
    pub subject: String,
}

/// `GET /v1/protected` - requires `read`
pub async fn protected(Extension(token): Extension<VerifiedToken>) -> Json<Message> {
    Json(Message {
        message: "Protected resource".to_string(),
        subject: token.subject().to_string(),
    })
}

/// `GET /v1/admin` - requires `write`
pub async fn admin(Extension(token): Extension<VerifiedToken>) -> Json<Message> {
    Json(Message {
        message: "Admin resource".to_string(),
        subject: token.subject().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub subject: String,
    pub client_id: String,
    pub scope: String,
    pub expires_at: i64,

    /// Custom claims added by the authorization server
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub claims: Map<String, Value>,
}

/// `GET /v1/me` - requires `read`; echoes the verified token
pub async fn me(Extension(token): Extension<VerifiedToken>) -> Json<Me> {
    Json(Me {
        subject: token.subject().to_string(),
        client_id: token.client_id().to_string(),
        scope: token.scopes().to_string(),
        expires_at: token.claims.exp,
        claims: token.claims.extra.clone(),
    })
}

pub async fn health() -> &'static str {
    "OK"
}

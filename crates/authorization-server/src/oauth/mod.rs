//! OAuth2 endpoints

pub mod authorize;
pub mod introspect;
pub mod metadata;
pub mod revoke;
pub mod token;

use axum::http::{HeaderMap, header};
use base64::Engine;

use crate::AppState;
use crate::clients::ClientRegistration;
use crate::error::OAuthError;

/// Client credentials presented with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Extract client credentials from HTTP Basic auth or form fields.
///
/// Basic auth wins when both are present. Returns `None` when neither is.
pub fn client_credentials(
    headers: &HeaderMap,
    form_client_id: Option<&str>,
    form_client_secret: Option<&str>,
) -> Result<Option<ClientCredentials>, OAuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| OAuthError::InvalidClient("Invalid Authorization header".to_string()))?;
        if let Some(encoded) = value.strip_prefix("Basic ") {
            return parse_basic(encoded.trim()).map(Some);
        }
    }

    match (form_client_id, form_client_secret) {
        (Some(client_id), Some(client_secret)) => Ok(Some(ClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })),
        _ => Ok(None),
    }
}

fn parse_basic(encoded: &str) -> Result<ClientCredentials, OAuthError> {
    let malformed = || OAuthError::InvalidClient("Malformed Basic credentials".to_string());

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (client_id, client_secret) = decoded.split_once(':').ok_or_else(malformed)?;

    Ok(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
    })
}

/// Authenticate the calling client; missing credentials are `invalid_client`.
pub async fn authenticate_client(
    state: &AppState,
    headers: &HeaderMap,
    form_client_id: Option<&str>,
    form_client_secret: Option<&str>,
) -> Result<ClientRegistration, OAuthError> {
    let credentials = client_credentials(headers, form_client_id, form_client_secret)?
        .ok_or_else(|| OAuthError::InvalidClient("Client authentication required".to_string()))?;

    state
        .clients
        .authenticate(&credentials.client_id, &credentials.client_secret)
        .await
}

//! OAuth2 Authorization Endpoint
//!
//! A request moves through three states: awaiting user authentication,
//! awaiting consent, and code issued. [`AuthorizationEndpoint`] decides the
//! next state without touching HTTP; the handlers below turn the outcome into
//! a redirect or a page.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use oauth2_token::Scopes;
use serde::Deserialize;
use url::Url;

use crate::AppState;
use crate::approvals::ApprovalStatus;
use crate::clients::{ClientRegistration, GrantType};
use crate::error::OAuthError;
use crate::html::{self, ConsentParams};

/// Authorization request parameters
///
/// Every field is optional so a missing parameter becomes an OAuth error
/// instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    /// Must be "code"
    pub response_type: Option<String>,

    pub client_id: Option<String>,

    /// Must exactly match a registered redirect URI
    pub redirect_uri: Option<String>,

    /// Space-delimited; defaults to every scope the client may request
    pub scope: Option<String>,

    /// Opaque client state, echoed on every redirect
    pub state: Option<String>,
}

impl AuthorizeRequest {
    /// Local URL that replays this request, used as the login `return_to`.
    pub fn to_local_url(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let fields = [
            ("response_type", &self.response_type),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("scope", &self.scope),
            ("state", &self.state),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                query.append_pair(name, value);
            }
        }
        format!("/oauth/authorize?{}", query.finish())
    }
}

/// Consent form posted back from the consent page
#[derive(Debug, Deserialize)]
pub struct ConsentForm {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,

    /// "true" to approve, anything else denies
    #[serde(default)]
    pub user_oauth_approval: Option<String>,
}

impl ConsentForm {
    pub fn approved(&self) -> bool {
        self.user_oauth_approval.as_deref() == Some("true")
    }

    fn request(&self) -> AuthorizeRequest {
        AuthorizeRequest {
            response_type: self.response_type.clone(),
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
            state: self.state.clone(),
        }
    }
}

/// A request whose client, redirect URI and scopes have been checked
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub client: ClientRegistration,
    pub redirect_uri: String,
    pub scopes: Scopes,
    pub state: Option<String>,
}

#[derive(Debug)]
pub enum AuthorizeOutcome {
    /// The redirect URI cannot be trusted; show an error page instead.
    Rejected(OAuthError),

    /// Report the error back to the client's redirect URI.
    ErrorRedirect {
        redirect_uri: String,
        error: OAuthError,
        state: Option<String>,
    },

    /// No authenticated user yet.
    LoginRequired,

    /// The user must approve the requested scopes.
    ConsentRequired(ValidatedRequest),

    CodeIssued {
        redirect_uri: String,
        code: String,
        state: Option<String>,
    },
}

pub struct AuthorizationEndpoint<'a> {
    state: &'a AppState,
}

impl<'a> AuthorizationEndpoint<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Check the request against the client registration.
    ///
    /// Unknown clients and unregistered redirect URIs are never redirected to.
    pub async fn validate(&self, request: &AuthorizeRequest) -> Result<ValidatedRequest, AuthorizeOutcome> {
        let client_id = request.client_id.as_deref().ok_or_else(|| {
            AuthorizeOutcome::Rejected(OAuthError::InvalidRequest("Missing client_id".to_string()))
        })?;
        let client = self
            .state
            .clients
            .lookup(client_id)
            .await
            .map_err(AuthorizeOutcome::Rejected)?;

        let redirect_uri = match request.redirect_uri.as_deref() {
            Some(uri) if client.has_redirect_uri(uri) => uri.to_string(),
            Some(uri) => {
                tracing::warn!("Client {} sent unregistered redirect_uri {}", client_id, uri);
                return Err(AuthorizeOutcome::Rejected(OAuthError::InvalidRequest(
                    "redirect_uri does not match a registered URI for this client".to_string(),
                )));
            }
            None => {
                return Err(AuthorizeOutcome::Rejected(OAuthError::InvalidRequest(
                    "Missing redirect_uri".to_string(),
                )));
            }
        };

        let redirect_error = |error: OAuthError| AuthorizeOutcome::ErrorRedirect {
            redirect_uri: redirect_uri.clone(),
            error,
            state: request.state.clone(),
        };

        match request.response_type.as_deref() {
            Some("code") => {}
            Some(other) => {
                return Err(redirect_error(OAuthError::UnsupportedResponseType(format!(
                    "Unsupported response_type: {other}"
                ))));
            }
            None => {
                return Err(redirect_error(OAuthError::InvalidRequest(
                    "Missing response_type".to_string(),
                )));
            }
        }

        if !client.allows_grant(GrantType::AuthorizationCode) {
            return Err(redirect_error(OAuthError::UnauthorizedClient(format!(
                "Client {client_id} may not use the authorization_code grant"
            ))));
        }

        let allowed = client.allowed_scopes();
        let scopes = match request.scope.as_deref() {
            Some(scope) => Scopes::parse(scope),
            None => allowed.clone(),
        };
        if scopes.is_empty() {
            return Err(redirect_error(OAuthError::InvalidScope("Empty scope".to_string())));
        }
        if !scopes.is_subset(&allowed) {
            return Err(redirect_error(OAuthError::InvalidScope(format!(
                "Invalid scope: {scopes}, allowed: {allowed}"
            ))));
        }

        Ok(ValidatedRequest {
            client,
            redirect_uri,
            scopes,
            state: request.state.clone(),
        })
    }

    /// GET: decide between login, consent and issuing a code directly.
    pub async fn evaluate(&self, request: &AuthorizeRequest, user: Option<&str>) -> AuthorizeOutcome {
        let validated = match self.validate(request).await {
            Ok(validated) => validated,
            Err(outcome) => return outcome,
        };
        let Some(user) = user else {
            return AuthorizeOutcome::LoginRequired;
        };

        let approved = if validated.client.auto_approve {
            true
        } else {
            match self
                .state
                .approvals
                .covers(user, &validated.client.client_id, &validated.scopes)
                .await
            {
                Ok(covered) => covered,
                Err(e) => return self.server_error(validated, e.into()),
            }
        };

        if approved {
            self.issue_code(validated, user).await
        } else {
            AuthorizeOutcome::ConsentRequired(validated)
        }
    }

    /// POST: record the user's decision and finish the flow.
    pub async fn decide(
        &self,
        request: &AuthorizeRequest,
        user: Option<&str>,
        approved: bool,
    ) -> AuthorizeOutcome {
        let validated = match self.validate(request).await {
            Ok(validated) => validated,
            Err(outcome) => return outcome,
        };
        let Some(user) = user else {
            return AuthorizeOutcome::LoginRequired;
        };

        let status = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Denied
        };
        let Some(lifetime) = crate::config::lifetime(self.state.config.tokens.approval_lifetime_secs) else {
            let e = OAuthError::ServerError("Approval lifetime is out of range".to_string());
            return self.server_error(validated, e);
        };
        if let Err(e) = self
            .state
            .approvals
            .record(user, &validated.client.client_id, &validated.scopes, status, lifetime)
            .await
        {
            return self.server_error(validated, e.into());
        }

        if !approved {
            tracing::info!("User {} denied client {}", user, validated.client.client_id);
            return AuthorizeOutcome::ErrorRedirect {
                redirect_uri: validated.redirect_uri,
                error: OAuthError::AccessDenied("User denied access".to_string()),
                state: validated.state,
            };
        }

        self.issue_code(validated, user).await
    }

    async fn issue_code(&self, validated: ValidatedRequest, user: &str) -> AuthorizeOutcome {
        match self
            .state
            .codes
            .issue(
                &validated.client.client_id,
                user,
                validated.scopes.clone(),
                &validated.redirect_uri,
            )
            .await
        {
            Ok(code) => AuthorizeOutcome::CodeIssued {
                redirect_uri: validated.redirect_uri,
                code,
                state: validated.state,
            },
            Err(e) => self.server_error(validated, e),
        }
    }

    fn server_error(&self, validated: ValidatedRequest, error: OAuthError) -> AuthorizeOutcome {
        AuthorizeOutcome::ErrorRedirect {
            redirect_uri: validated.redirect_uri,
            error,
            state: validated.state,
        }
    }
}

/// Append query parameters to a registered redirect URI.
pub fn redirect_url(redirect_uri: &str, params: &[(&str, &str)]) -> Result<String, OAuthError> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| OAuthError::InvalidRequest(format!("Registered redirect_uri is not a URL: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in params {
            query.append_pair(name, value);
        }
    }
    Ok(url.to_string())
}

fn error_page(error: &OAuthError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(html::error_page(error.code(), &error.description())),
    )
        .into_response()
}

fn respond(outcome: AuthorizeOutcome, request: &AuthorizeRequest, user: Option<&str>) -> Response {
    let (redirect_uri, params) = match outcome {
        AuthorizeOutcome::Rejected(error) => {
            tracing::warn!("Rejected authorization request: {}", error);
            return error_page(&error);
        }
        AuthorizeOutcome::LoginRequired => {
            let return_to: String =
                url::form_urlencoded::byte_serialize(request.to_local_url().as_bytes()).collect();
            return Redirect::to(&format!("/login?return_to={return_to}")).into_response();
        }
        AuthorizeOutcome::ConsentRequired(validated) => {
            let params = ConsentParams {
                client_id: &validated.client.client_id,
                redirect_uri: &validated.redirect_uri,
                scopes: &validated.scopes,
                state: validated.state.as_deref(),
            };
            return Html(html::consent_page(user.unwrap_or_default(), &params)).into_response();
        }
        AuthorizeOutcome::ErrorRedirect {
            redirect_uri,
            error,
            state,
        } => {
            tracing::info!("Authorization request failed with {}: {}", error.code(), error);
            let mut params = vec![
                ("error", error.code().to_string()),
                ("error_description", error.description()),
            ];
            if let Some(state) = state {
                params.push(("state", state));
            }
            (redirect_uri, params)
        }
        AuthorizeOutcome::CodeIssued {
            redirect_uri,
            code,
            state,
        } => {
            let mut params = vec![("code", code)];
            if let Some(state) = state {
                params.push(("state", state));
            }
            (redirect_uri, params)
        }
    };

    let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
    match redirect_url(&redirect_uri, &params) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => error_page(&e),
    }
}

/// Handler for `GET /oauth/authorize`
pub async fn get_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(request): Query<AuthorizeRequest>,
) -> Response {
    let user = state.sessions.current(&headers).map(|s| s.username);
    let outcome = AuthorizationEndpoint::new(&state)
        .evaluate(&request, user.as_deref())
        .await;
    respond(outcome, &request, user.as_deref())
}

/// Handler for `POST /oauth/authorize` - processes the consent form
pub async fn post_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ConsentForm>,
) -> Response {
    let user = state.sessions.current(&headers).map(|s| s.username);
    let request = form.request();
    let outcome = AuthorizationEndpoint::new(&state)
        .decide(&request, user.as_deref(), form.approved())
        .await;
    respond(outcome, &request, user.as_deref())
}

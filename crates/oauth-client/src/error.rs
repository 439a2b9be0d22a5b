use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Error response from the authorization server (`{error, error_description}`)
    #[error("{error}: {}", description.as_deref().unwrap_or("no description"))]
    OAuth {
        status: u16,
        error: String,
        description: Option<String>,
    },

    /// Non-success response without an OAuth error body
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

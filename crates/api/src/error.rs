//! API client error types.

/// Errors from the hosting API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("access token rejected (401)")]
    CredentialInvalid,

    #[error("API error {status} {status_text}: {detail}")]
    Api {
        status: u16,
        status_text: String,
        detail: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid access token")]
    InvalidToken,
}

impl Error {
    /// HTTP status of the failed response, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::CredentialInvalid => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Json(_) | Self::InvalidToken => None,
        }
    }

    /// True for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

//! LMS client error types.

use std::sync::Arc;

use quire_core::Error;

/// Error codes the LMS uses for a rejected or expired credential.
const AUTH_ERROR_CODES: &[&str] = &["invalidtoken", "accessexception", "requireloginerror", "forcepasswordchangenotice"];

/// Errors from the LMS web service client.
#[derive(Debug, thiserror::Error)]
pub enum LmsError {
    /// The web service answered with an error payload.
    #[error("LMS error {}: {message}", .errorcode.as_deref().unwrap_or("unknown"))]
    Api { errorcode: Option<String>, message: String },

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),

    /// The locator carries no module id.
    #[error("no module id in locator: {0}")]
    NoModuleId(String),

    /// Neither the module files nor the locator itself yielded HTML.
    #[error("no HTML content available for module {0}")]
    NoContent(i64),
}

impl LmsError {
    pub fn is_auth_failure(&self) -> bool {
        match self {
            LmsError::Api { errorcode: Some(code), .. } => AUTH_ERROR_CODES.contains(&code.as_str()),
            LmsError::HttpStatus { status } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LmsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { LmsError::Timeout } else { LmsError::Network(Arc::new(err)) }
    }
}

impl From<LmsError> for Error {
    fn from(err: LmsError) -> Self {
        if err.is_auth_failure() {
            return Error::Unauthorized(err.to_string());
        }

        match err {
            LmsError::Api { errorcode, message } => match errorcode {
                Some(code) => Error::Origin(format!("{code}: {message}")),
                None => Error::Origin(message),
            },
            LmsError::HttpStatus { status: 404 } => Error::NotFound("origin returned 404".into()),
            LmsError::HttpStatus { status } => Error::HttpStatus { status },
            LmsError::Timeout => Error::FetchTimeout("origin request timed out".into()),
            LmsError::Network(e) => Error::HttpError(e.to_string()),
            LmsError::Parse(msg) => Error::Origin(format!("unreadable response: {msg}")),
            LmsError::NoModuleId(locator) => Error::InvalidLocator(locator),
            err @ LmsError::NoContent(_) => Error::NotFound(err.to_string()),
        }
    }
}

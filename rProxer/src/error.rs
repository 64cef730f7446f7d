//! Error types.

use std::sync::Arc;

use thiserror::Error;

/// A single cause of a failed operation.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Operation requires a logged in session.
    #[error("Not logged in")]
    NotLoggedIn,

    /// The anti-bot challenge could not be answered.
    #[error("Anti-bot challenge could not be solved")]
    Challenge,

    /// The anti-bot challenge kept coming back.
    #[error("Anti-bot challenge still present after {attempts} attempts")]
    ChallengeRetriesExhausted { attempts: u32 },

    /// The server answered with something we cannot use.
    #[error("Unexpected response (status: {status:?})")]
    WrongResponse { status: Option<u16>, body: String },

    /// The site refused access to the requested page.
    #[error("No access to the requested resource")]
    NoAccess,

    /// Proxer returned an error envelope.
    #[error("Proxer API error{}: {message}", .code.map(|c| format!(" [{c}]")).unwrap_or_default())]
    Api { code: Option<i64>, message: String },

    /// Failed to parse response data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required field was missing in the response.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Invalid argument passed to an API method.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// The object owning a lazy property was dropped.
    #[error("Owner of the property is gone")]
    Detached,

    /// Initializer finished without populating its property.
    #[error("Property was not populated by its initializer")]
    Uninitialized,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an API error.
    pub fn api(code: Option<i64>, message: impl Into<String>) -> Self {
        Error::Api {
            code,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Error::MissingField(field.into())
    }

    /// Create an invalid argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a wrong response error.
    pub fn wrong_response(status: Option<u16>, body: impl Into<String>) -> Self {
        Error::WrongResponse {
            status,
            body: body.into(),
        }
    }

    /// Check if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::Challenge | Error::ChallengeRetriesExhausted { .. }
        )
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::NotLoggedIn | Error::NoAccess)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(Arc::new(err))
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(Arc::new(err))
    }
}

/// A failed operation with its ordered list of causes.
///
/// The list may be empty when a content check aborted without reporting why.
#[derive(Debug, Clone, Default, Error)]
#[error("{}", describe(.causes))]
pub struct Failure {
    causes: Vec<Error>,
}

fn describe(causes: &[Error]) -> String {
    match causes {
        [] => "Operation failed without a recorded cause".to_owned(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl Failure {
    /// Create a failure with a single cause.
    pub fn new(cause: impl Into<Error>) -> Self {
        Self {
            causes: vec![cause.into()],
        }
    }

    /// Create a failure from a list of causes.
    pub fn from_causes(causes: impl IntoIterator<Item = Error>) -> Self {
        Self {
            causes: causes.into_iter().collect(),
        }
    }

    /// Create a failure carrying no cause.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the causes in order.
    pub fn causes(&self) -> &[Error] {
        &self.causes
    }

    /// Take the causes.
    pub fn into_causes(self) -> Vec<Error> {
        self.causes
    }

    /// The first recorded cause, if any.
    pub fn first(&self) -> Option<&Error> {
        self.causes.first()
    }

    /// Check whether no cause was recorded.
    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// Append another cause.
    pub fn push(&mut self, cause: impl Into<Error>) {
        self.causes.push(cause.into());
    }

    /// Concatenate the causes of an inner failure after ours.
    pub fn merge(mut self, other: Failure) -> Self {
        self.causes.extend(other.causes);
        self
    }

    /// Check whether any cause matches.
    pub fn contains(&self, pred: impl Fn(&Error) -> bool) -> bool {
        self.causes.iter().any(pred)
    }

    /// Check whether the failure was caused by a missing login.
    pub fn is_not_logged_in(&self) -> bool {
        self.contains(|e| matches!(e, Error::NotLoggedIn))
    }
}

impl Extend<Error> for Failure {
    fn extend<I: IntoIterator<Item = Error>>(&mut self, iter: I) {
        self.causes.extend(iter);
    }
}

impl FromIterator<Error> for Failure {
    fn from_iter<I: IntoIterator<Item = Error>>(iter: I) -> Self {
        Self::from_causes(iter)
    }
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::new(err)
    }
}

impl From<reqwest::Error> for Failure {
    fn from(err: reqwest::Error) -> Self {
        Failure::new(Error::from(err))
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::new(Error::from(err))
    }
}

impl From<url::ParseError> for Failure {
    fn from(err: url::ParseError) -> Self {
        Failure::new(Error::Url(err))
    }
}

/// Result type alias for rProxer operations.
pub type Result<T> = std::result::Result<T, Failure>;

/// Fallback helpers for results.
pub trait ResultExt<T> {
    /// Return the value, or `fallback` if the operation failed.
    fn on_error(self, fallback: T) -> T;

    /// Return the value, or compute a fallback from the failure.
    fn on_error_with(self, f: impl FnOnce(&Failure) -> T) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn on_error(self, fallback: T) -> T {
        self.unwrap_or(fallback)
    }

    fn on_error_with(self, f: impl FnOnce(&Failure) -> T) -> T {
        match self {
            Ok(value) => value,
            Err(failure) => f(&failure),
        }
    }
}

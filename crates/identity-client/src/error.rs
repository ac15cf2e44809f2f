use std::fmt;

/// Errors from the identity provider client
#[derive(Debug)]
pub enum IdentityError {
    /// The provider has no account for the username or uid
    NotFound(String),
    /// Timeouts, connection failures and 408/429/5xx responses
    Transient(String),
    /// Any other non-success status
    Rejected { status: u16, message: String },
    /// The request could not be built
    Request(String),
    /// The response body did not match the expected shape
    InvalidResponse(String),
}

impl IdentityError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "Identity not found: {what}"),
            Self::Transient(msg) => write!(f, "Identity service unavailable: {msg}"),
            Self::Rejected { status, message } => {
                write!(f, "Identity service rejected request ({status}): {message}")
            }
            Self::Request(msg) => write!(f, "Invalid identity request: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "Invalid identity response: {msg}"),
        }
    }
}

impl std::error::Error for IdentityError {}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Request(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;

use std::fmt;

use identity_client::IdentityError;
use profile_db::StoreError;

/// Errors surfaced by the view operations
#[derive(Debug)]
pub enum ViewError {
    /// The identity provider does not know the requested user
    IdentityNotFound(String),
    /// A user or cursor id is not a valid object id
    InvalidIdentifier(String),
    /// The identity provider kept failing transiently until the retry
    /// budget ran out
    TransientUpstreamFailure { attempts: u32, message: String },
    /// The identity provider failed in a way retrying will not fix
    Upstream(String),
    Store(StoreError),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::IdentityNotFound(who) => write!(f, "Identity not found: {who}"),
            ViewError::InvalidIdentifier(id) => write!(f, "Invalid identifier: {id}"),
            ViewError::TransientUpstreamFailure { attempts, message } => write!(
                f,
                "Identity service unavailable after {attempts} attempt(s): {message}"
            ),
            ViewError::Upstream(msg) => write!(f, "Identity service error: {msg}"),
            ViewError::Store(e) => write!(f, "Store error: {e}"),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ViewError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidIdentifier(id) => ViewError::InvalidIdentifier(id),
            other => ViewError::Store(other),
        }
    }
}

impl From<IdentityError> for ViewError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound(who) => ViewError::IdentityNotFound(who),
            IdentityError::Transient(message) => ViewError::TransientUpstreamFailure {
                attempts: 1,
                message,
            },
            other => ViewError::Upstream(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifier_is_lifted_out_of_store_errors() {
        let err = ViewError::from(StoreError::InvalidIdentifier("nope".to_string()));
        assert!(matches!(err, ViewError::InvalidIdentifier(ref id) if id == "nope"));

        let err = ViewError::from(StoreError::Decode("bad row".to_string()));
        assert!(matches!(err, ViewError::Store(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_identity_error_mapping() {
        assert!(matches!(
            ViewError::from(IdentityError::NotFound("jdoe".to_string())),
            ViewError::IdentityNotFound(_)
        ));
        assert!(matches!(
            ViewError::from(IdentityError::Rejected {
                status: 401,
                message: "denied".to_string()
            }),
            ViewError::Upstream(_)
        ));
    }
}

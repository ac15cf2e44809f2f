use std::fmt;

/// Errors raised by the profile, avatar and follow stores
#[derive(Debug)]
pub enum StoreError {
    /// An identifier did not match the store's native id format
    InvalidIdentifier(String),
    Database(sqlx::Error),
    /// A stored value could not be mapped back to an entity
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier(id) => write!(f, "Invalid identifier: {id}"),
            Self::Database(e) => write!(f, "Database error: {e}"),
            Self::Decode(msg) => write!(f, "Decode error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifier_display() {
        let err = StoreError::InvalidIdentifier("not-an-id".to_string());
        assert_eq!(format!("{err}"), "Invalid identifier: not-an-id");
    }

    #[test]
    fn test_decode_error_display() {
        let err = StoreError::Decode("unknown follow status 'maybe'".to_string());
        assert_eq!(
            format!("{err}"),
            "Decode error: unknown follow status 'maybe'"
        );
    }

    #[test]
    fn test_database_error_has_source() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(std::error::Error::source(&err).is_some());
    }
}

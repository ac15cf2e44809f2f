use std::fmt;

#[derive(Debug)]
pub enum MigrateError {
    Database(Box<sqlx::Error>),
    Config(String),
}

impl fmt::Display for MigrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrateError::Database(err) => write!(f, "Database error: {}", err),
            MigrateError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for MigrateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrateError::Database(err) => Some(err.as_ref()),
            MigrateError::Config(_) => None,
        }
    }
}

impl From<sqlx::Error> for MigrateError {
    fn from(err: sqlx::Error) -> Self {
        MigrateError::Database(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for MigrateError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        MigrateError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;

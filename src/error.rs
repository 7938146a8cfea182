use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Authentication and authorization failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("separation of duties violation: you cannot resolve a market you created")]
    SeparationOfDuty,

    #[error("user is banned{}", ban_suffix(.reason))]
    UserBanned { reason: Option<String> },
}

fn ban_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {r}"))
        .unwrap_or_default()
}

/// State-machine precondition violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("an access request for this group is already pending")]
    DuplicateRequest,

    #[error("user is already a member of this group")]
    AlreadyMember,

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Coarse error classification used by inbound adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    AuthenticationFailed,
    PermissionDenied,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::AuthenticationFailed => "authentication_failed",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("credential error: {0}")]
    Credential(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a missing entity.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for an authorization failure.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::Access(AccessError::PermissionDenied(message.into()))
    }

    /// Shorthand for an authentication failure.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::Access(AccessError::AuthenticationFailed(message.into()))
    }

    /// Classify this error for the caller.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(_) => ErrorKind::Validation,
            Self::Access(AccessError::AuthenticationFailed(_)) => ErrorKind::AuthenticationFailed,
            Self::Access(_) => ErrorKind::PermissionDenied,
            Self::State(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Connection(_)
            | Self::Database(_)
            | Self::Parse(_)
            | Self::Credential(_) => ErrorKind::Internal,
        }
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Error::State(StateError::Conflict(info.message().to_string()))
            }
            other => Error::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            Error::from(DomainError::EmptyOutcomes).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::permission_denied("nope").kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            Error::from(AccessError::SeparationOfDuty).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            Error::from(AccessError::UserBanned { reason: None }).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            Error::authentication_failed("bad token").kind(),
            ErrorKind::AuthenticationFailed
        );
        assert_eq!(
            Error::from(StateError::DuplicateRequest).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(Error::not_found("market", 7).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Database("locked".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn banned_message_includes_reason() {
        let err = AccessError::UserBanned {
            reason: Some("spam".into()),
        };
        assert_eq!(err.to_string(), "user is banned: spam");
        let err = AccessError::UserBanned { reason: None };
        assert_eq!(err.to_string(), "user is banned");
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = Error::not_found("group", 12);
        assert_eq!(err.to_string(), "group not found: 12");
    }
}

use thiserror::Error;

/// Failure reported by the remote accessor.
///
/// `status` is `None` when the request never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredentials,
    Conflict,
    InvalidToken,
    Unauthenticated,
}

/// Errors surfaced by the client to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Missing or malformed input, rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Auth { kind: AuthErrorKind, message: String },

    /// Request failed or the server was unreachable.
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    NotFound(String),

    /// The persisted session could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn auth(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self::Auth {
            kind,
            message: message.into(),
        }
    }

    pub fn auth_kind(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Auth { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Maps a remote failure; `unauthorized` picks the kind used for a 401.
    pub fn from_api(err: ApiError, unauthorized: AuthErrorKind) -> Self {
        match err.status {
            None => Self::Network(err.message),
            Some(400) => Self::Validation(err.message),
            Some(401) => Self::auth(unauthorized, err.message),
            Some(404) => Self::NotFound(err.message),
            Some(409) => Self::auth(AuthErrorKind::Conflict, err.message),
            Some(_) => Self::Network(err.message),
        }
    }
}

impl From<super::storage::StorageError> for ClientError {
    fn from(err: super::storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

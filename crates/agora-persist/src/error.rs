use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome categories every failure is reported as at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Database,
    Authentication,
    Authorization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Database => "database",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
    },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} failed: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<PersistError>,
    },
}

impl PersistError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        PersistError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Maps the failure onto the boundary taxonomy.
    ///
    /// Storage-engine rejections are `Database` unless the engine reported
    /// a missing (401) or insufficient (403) identity.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistError::NotFound { .. } => ErrorKind::NotFound,
            PersistError::Validation(_) => ErrorKind::Validation,
            PersistError::Api { status: 401, .. } => ErrorKind::Authentication,
            PersistError::Api { status: 403, .. } => ErrorKind::Authorization,
            PersistError::Operation { source, .. } => source.kind(),
            PersistError::Http(_)
            | PersistError::Serialization(_)
            | PersistError::Api { .. }
            | PersistError::InvalidResponse(_)
            | PersistError::Config(_) => ErrorKind::Database,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether storage refused the write because the key already exists
    /// (Postgres `unique_violation`).
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self.root(),
            PersistError::Api { code: Some(code), .. } if code == "23505"
        )
    }

    /// Name of the repository operation that failed, if recorded.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            PersistError::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// The underlying failure with any operation context removed.
    pub fn root(&self) -> &PersistError {
        match self {
            PersistError::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;

/// Attaches the failing operation's name to a repository error.
pub(crate) trait OperationContext<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> OperationContext<T> for Result<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|err| match err {
            err @ PersistError::Operation { .. } => err,
            err => PersistError::Operation {
                operation,
                source: Box::new(err),
            },
        })
    }
}

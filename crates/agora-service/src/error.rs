use agora_persist::{ErrorKind, PersistError};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// The single structured failure every service operation reports.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<Value>,
}

/// Serialisable form of a [`ServiceError`] for callers across a wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(entity: &str, key: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{} not found: {}", entity, key))
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Wraps a persistence failure, recording which service operation hit it.
    pub fn from_persist(operation: &str, err: PersistError) -> Self {
        let kind = err.kind();
        let mut details = json!({ "operation": operation });
        if let Some(step) = err.operation() {
            details["step"] = json!(step);
        }
        if let PersistError::Api { code: Some(code), .. } = err.root() {
            details["code"] = json!(code);
        }

        match kind {
            ErrorKind::Database => tracing::error!(operation, error = %err, "Storage failure"),
            _ => tracing::debug!(operation, error = %err, "Operation rejected"),
        }

        Self {
            kind,
            message: err.root().to_string(),
            details: Some(details),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind,
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Attaches the service operation name to persistence results.
pub(crate) trait Context<T> {
    fn context(self, operation: &str) -> ServiceResult<T>;
}

impl<T> Context<T> for agora_persist::Result<T> {
    fn context(self, operation: &str) -> ServiceResult<T> {
        self.map_err(|err| ServiceError::from_persist(operation, err))
    }
}

use crate::values::{Value, format_value};

/// Errors surfaced while replaying a chain.
///
/// Only [`ChainError::AttributeResolution`] originates in the engine itself;
/// every other variant is produced by the callables a chain invokes and is
/// passed through untouched.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{chain} cannot find attribute '{name}'")]
    AttributeResolution { chain: String, name: String },
    #[error("'{0}' object is not callable")]
    NotCallable(String),
    #[error("'{0}' object is not iterable")]
    NotIterable(String),
    #[error("{0}")]
    Message(String),
    #[error("raised {}", format_value(.0))]
    Raised(Value),
    #[error("cannot reuse an already awaited future")]
    AlreadyAwaited,
    #[error("background call failed: {0}")]
    Join(String),
}

impl ChainError {
    pub fn message(message: impl Into<String>) -> Self {
        ChainError::Message(message.into())
    }

    /// Name of the unresolved member, if this is a resolution failure.
    pub fn missing_name(&self) -> Option<&str> {
        match self {
            ChainError::AttributeResolution { name, .. } => Some(name),
            _ => None,
        }
    }
}

pub type R = Result<Value, ChainError>;

pub fn ok(value: Value) -> R {
    Ok(value)
}

//! Error types for the cartprobe system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::cart::EngineFault;

/// Convenience alias used by every port and component.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for cartprobe operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an error for a collaborator that is not ready for use.
    #[must_use]
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable(what.into()))
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(what.into()))
    }

    /// Creates an error for an operation the engine declined.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected(reason.into()))
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest(reason.into()))
    }

    /// Creates an error carrying a fault raised inside the engine.
    #[must_use]
    pub fn engine(fault: EngineFault) -> Self {
        Self::new(ErrorKind::Engine(fault))
    }

    /// Returns the engine fault, if this error carries one.
    #[must_use]
    pub fn as_fault(&self) -> Option<&EngineFault> {
        match &self.kind {
            ErrorKind::Engine(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<EngineFault> for Error {
    fn from(fault: EngineFault) -> Self {
        Self::engine(fault)
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A collaborator (cart, session, user context) is not initialized.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A referenced product, variant, or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The engine declined the operation through its normal path.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The simulation request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The engine, or an extension it invoked, raised a fault.
    #[error("engine fault: {0}")]
    Engine(EngineFault),

    /// A report could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was running.
    pub operation: Option<String>,
    /// Chain of enclosing operations, innermost last.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = &self.operation {
            write!(f, "during {operation}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}

//! # Failure Definitions
//!
//! Every outcome crossing a proxy or executor is `Result<Value, CallError>`.
//!
//! ## Taxonomy
//!
//! - **Transient**: `ObjectMigrating`. The object is being relocated; the caller's
//!   backoff loop retries it. Executors never retry it themselves.
//! - **Permanent**: everything raised by the dispatch layer itself
//!   (`DestinationNotFound`, `MethodNotFound`, ...). Never retried.
//! - **User-level**: `App`. Raised by the wrapped method and passed through
//!   every layer verbatim.

use std::fmt;

use crate::address::HostAddress;
use crate::address::ObjectId;
use crate::call::Signature;
use crate::transport::TransportError;

/// A failure raised by user code inside a wrapped method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    kind: String,
    message: String,
}

impl AppError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Application-defined failure class, e.g. `"NoSuchList"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

/// Tagged outcome of a failed call or migration.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// The object is temporarily unavailable because it is being relocated.
    ObjectMigrating,
    /// The migration destination is not one of the known hosts.
    DestinationNotFound { address: HostAddress },
    /// The object's dispatch table has no entry for the signature.
    MethodNotFound(Signature),
    /// The argument list does not fit the method.
    BadArguments(String),
    /// No executor for the object lives on the addressed host.
    ObjectNotFound(ObjectId),
    /// Moving the wrapper to the destination failed; the source kept it.
    TransferFailed(String),
    /// The transport could not carry the request or its reply.
    Transport(TransportError),
    /// The peer answered with a malformed or uncorrelated frame.
    Protocol(String),
    /// The wrapped method itself failed.
    App(AppError),
}

impl CallError {
    /// True only for the relocation signal; every other failure is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ObjectMigrating)
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectMigrating => write!(f, "object is migrating"),
            Self::DestinationNotFound { address } => {
                write!(f, "destination {} is not a known host", address)
            }
            Self::MethodNotFound(sig) => write!(f, "method not found: {}", sig),
            Self::BadArguments(msg) => write!(f, "bad arguments: {}", msg),
            Self::ObjectNotFound(id) => write!(f, "{} not found", id),
            Self::TransferFailed(msg) => write!(f, "transfer failed: {}", msg),
            Self::Transport(e) => write!(f, "transport failure: {}", e),
            Self::Protocol(msg) => write!(f, "protocol violation: {}", msg),
            Self::App(e) => write!(f, "application failure: {}", e),
        }
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::App(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for CallError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<AppError> for CallError {
    fn from(e: AppError) -> Self {
        Self::App(e)
    }
}

pub type Result<T> = std::result::Result<T, CallError>;

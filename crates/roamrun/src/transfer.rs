//! # Wrapper transfer
//!
//! The seam through which a migrating executor hands its wrapper to the
//! destination host. Ownership moves; it is never duplicated. A failed transfer
//! gives the wrapper back to the caller inside the error.

use std::fmt;
use std::sync::Arc;

use roamrpc::HostAddress;
use roamrpc::ObjectId;

use crate::executor::ExecutorRef;
use crate::wrapper::AppObjectWrapper;

/// A transfer that did not happen. Carries the wrapper back to its owner.
pub struct TransferError {
    reason: String,
    wrapper: AppObjectWrapper,
}

impl TransferError {
    pub fn new(reason: impl Into<String>, wrapper: AppObjectWrapper) -> Self {
        Self {
            reason: reason.into(),
            wrapper,
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn into_parts(self) -> (String, AppObjectWrapper) {
        (self.reason, self.wrapper)
    }
}

impl fmt::Debug for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferError")
            .field("reason", &self.reason)
            .field("wrapper", &self.wrapper)
            .finish()
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer of {} failed: {}", self.wrapper.type_name(), self.reason)
    }
}

impl std::error::Error for TransferError {}

pub type Result<T> = std::result::Result<T, TransferError>;

/// Moves a wrapper to a newly constructed executor on another host.
#[async_trait::async_trait]
pub trait Transfer: Send + Sync + 'static {
    /// Hands `wrapper` to `destination`, which starts an executor for `object`.
    ///
    /// # invariants
    /// - On `Ok`, the destination owns the wrapper and the returned handle reaches it.
    /// - On `Err`, the wrapper is inside the error and nothing was started remotely.
    async fn transfer(
        &self,
        object: ObjectId,
        destination: &HostAddress,
        wrapper: AppObjectWrapper,
    ) -> Result<Arc<dyn ExecutorRef>>;
}

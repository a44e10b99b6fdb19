//! # Server Executor
//!
//! Owns one wrapper, runs incoming calls against it and performs the server
//! side of an explicit migration.
//!
//! ## State machine
//!
//! ```text
//! Active ──begin──▶ Migrating ──transfer ok──▶ Moved
//!   ▲                   │
//!   └────rollback───────┘
//! Active ──retire──▶ Deleted
//! ```
//!
//! The state lives in a single atomic and every transition out of `Active` is a
//! compare-and-set, so two migrations can never both get past the check.
//!
//! ## Invariants
//!
//! - While the state is not `Active`, no call reaches the wrapper. Calls fail fast with
//!   `ObjectMigrating` (or `ObjectNotFound` once deleted); nothing queues or blocks.
//! - A failed transfer restores the wrapper and the `Active` state; no partial
//!   relocation is ever observable.
//! - A `Moved` executor never holds the wrapper again.

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use roamrpc::CallError;
use roamrpc::HostAddress;
use roamrpc::MethodCall;
use roamrpc::ObjectId;
use roamrpc::Value;
use roamrpc::error::Result;

use crate::transfer::Transfer;
use crate::wrapper::AppObjectWrapper;

/// The capability a proxy holds: somewhere calls and migrations can be sent.
///
/// Implemented by local executors and by remote references.
#[async_trait::async_trait]
pub trait ExecutorRef: fmt::Debug + Send + Sync + 'static {
    fn object_id(&self) -> ObjectId;

    /// The host the executor lives on.
    fn address(&self) -> &HostAddress;

    async fn invoke(&self, call: &MethodCall) -> Result<Value>;

    /// Moves the object to `destination` and returns a handle to its new executor.
    async fn migrate_to(&self, destination: &HostAddress) -> Result<Arc<dyn ExecutorRef>>;
}

const ACTIVE: u8 = 0;
const MIGRATING: u8 = 1;
const MOVED: u8 = 2;
const DELETED: u8 = 3;

/// Observable lifecycle state of an executor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutorState {
    Active,
    Migrating,
    /// Migration committed; the wrapper lives elsewhere now.
    Moved,
    /// The object was explicitly deleted.
    Deleted,
}

impl ExecutorState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            ACTIVE => Self::Active,
            MIGRATING => Self::Migrating,
            MOVED => Self::Moved,
            _ => Self::Deleted,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Moved | Self::Deleted)
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Migrating => write!(f, "migrating"),
            Self::Moved => write!(f, "moved"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Server side of an object.
pub struct ServerExecutor {
    this: Weak<ServerExecutor>,
    object_id: ObjectId,
    address: HostAddress,
    state: AtomicU8,
    // calls on one object are serialized here; different objects run in parallel
    wrapper: Mutex<Option<AppObjectWrapper>>,
    transfer: Arc<dyn Transfer>,
}

impl ServerExecutor {
    pub fn new(
        object_id: ObjectId,
        address: HostAddress,
        wrapper: AppObjectWrapper,
        transfer: Arc<dyn Transfer>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            object_id,
            address,
            state: AtomicU8::new(ACTIVE),
            wrapper: Mutex::new(Some(wrapper)),
            transfer,
        })
    }

    pub fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_migrating(&self) -> bool {
        self.state() == ExecutorState::Migrating
    }

    /// Whether the executor still owns its wrapper.
    ///
    /// Waits for an in-flight call to release the wrapper.
    pub async fn holds_wrapper(&self) -> bool {
        self.wrapper.lock().await.is_some()
    }

    /// Runs the call unless the object is migrating, moved or deleted.
    pub async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        self.admit()?;

        let mut guard = self.wrapper.lock().await;
        // a migration may have started while we waited for the lock
        self.admit()?;
        let wrapper = guard.as_mut().ok_or(CallError::ObjectMigrating)?;

        debug!(object = %self.object_id, signature = %call.signature(), "dispatching call");
        wrapper.invoke(call)
    }

    /// Claims the migration slot.
    ///
    /// Fails fast with `ObjectMigrating` if another migration holds it or the object
    /// has already moved, and with `ObjectNotFound` if it was deleted.
    pub fn on_migration_begin(&self) -> Result<()> {
        self.state
            .compare_exchange(ACTIVE, MIGRATING, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|raw| self.rejection(ExecutorState::from_u8(raw)))
    }

    /// Releases the migration slot after a rollback; the executor is active again.
    pub fn on_migration_end(&self) {
        let _ = self
            .state
            .compare_exchange(MIGRATING, ACTIVE, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Moves the wrapper to `destination`.
    ///
    /// Migrating an active executor to its own address is a no-op returning this
    /// executor.
    pub async fn migrate_to(&self, destination: &HostAddress) -> Result<Arc<dyn ExecutorRef>> {
        if destination == &self.address {
            // a moved executor is not the object's home even on its old host
            self.admit()?;
            info!(object = %self.object_id, %destination, "object already at destination");
            return self.handle();
        }

        self.on_migration_begin()?;
        info!(object = %self.object_id, from = %self.address, to = %destination, "migration started");

        // waits only for the call already holding the wrapper; new calls fail fast
        let Some(wrapper) = self.wrapper.lock().await.take() else {
            self.on_migration_end();
            return Err(CallError::ObjectNotFound(self.object_id));
        };

        match self.transfer.transfer(self.object_id, destination, wrapper).await {
            Ok(moved) => {
                self.state.store(MOVED, Ordering::Release);
                info!(object = %self.object_id, to = %destination, "migration committed");
                Ok(moved)
            }
            Err(e) => {
                let (reason, wrapper) = e.into_parts();
                *self.wrapper.lock().await = Some(wrapper);
                self.on_migration_end();
                warn!(object = %self.object_id, to = %destination, %reason, "migration rolled back");
                Err(CallError::TransferFailed(reason))
            }
        }
    }

    /// Takes the wrapper out for deletion. Later calls fail with `ObjectNotFound`.
    pub async fn retire(&self) -> Result<AppObjectWrapper> {
        self.on_migration_begin()?;
        let wrapper = self.wrapper.lock().await.take();
        self.state.store(DELETED, Ordering::Release);
        wrapper.ok_or(CallError::ObjectNotFound(self.object_id))
    }

    fn admit(&self) -> Result<()> {
        match self.state() {
            ExecutorState::Active => Ok(()),
            other => Err(self.rejection(other)),
        }
    }

    fn rejection(&self, state: ExecutorState) -> CallError {
        match state {
            ExecutorState::Deleted => CallError::ObjectNotFound(self.object_id),
            _ => CallError::ObjectMigrating,
        }
    }

    fn handle(&self) -> Result<Arc<dyn ExecutorRef>> {
        let this: Arc<dyn ExecutorRef> = self
            .this
            .upgrade()
            .ok_or(CallError::ObjectNotFound(self.object_id))?;
        Ok(this)
    }
}

impl fmt::Debug for ServerExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerExecutor")
            .field("object_id", &self.object_id)
            .field("address", &self.address)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ExecutorRef for ServerExecutor {
    fn object_id(&self) -> ObjectId {
        self.object_id
    }

    fn address(&self) -> &HostAddress {
        &self.address
    }

    async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        ServerExecutor::invoke(self, call).await
    }

    async fn migrate_to(&self, destination: &HostAddress) -> Result<Arc<dyn ExecutorRef>> {
        ServerExecutor::migrate_to(self, destination).await
    }
}

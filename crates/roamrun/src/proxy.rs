//! # Client Proxy
//!
//! The caller-facing stand-in for an object. Forwards calls to the current
//! executor reference, backs off while the object is migrating and re-points
//! itself when a migration commits.
//!
//! ## Invariants
//!
//! - A call that succeeds, or fails with anything but `ObjectMigrating`, is attempted
//!   exactly once.
//! - Migrating calls are retried under the proxy's `RetryPolicy`; the final
//!   `ObjectMigrating` is handed back unchanged once attempts run out.
//! - `migrate` to an unknown host fails with `DestinationNotFound` before any request
//!   is sent.
//! - The target is swapped only after a migration commits. Clones of a proxy share the
//!   target, so every copy of a handle follows the object.

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use tracing::debug;
use tracing::info;

use roamrpc::HostAddress;
use roamrpc::MethodCall;
use roamrpc::ObjectId;
use roamrpc::Value;
use roamrpc::error::Result;

use crate::config::RuntimeConfig;
use crate::coordinator::MigrationCoordinator;
use crate::executor::ExecutorRef;
use crate::retry::RetryPolicy;
use crate::wrapper::address_arg;
use crate::wrapper::expect_arity;

/// Reserved signature that triggers an explicit migration through the object's
/// own interface. Takes one `Value::Address` argument.
pub const MIGRATE_SIGNATURE: &str =
    "public void roam.ExplicitMigrator.migrateObject(roam.HostAddress) throws roam.MigrationException";

#[derive(Clone)]
pub struct ClientProxy {
    target: Arc<RwLock<Arc<dyn ExecutorRef>>>,
    coordinator: Arc<MigrationCoordinator>,
    policy: RetryPolicy,
}

impl ClientProxy {
    pub fn new(target: Arc<dyn ExecutorRef>, coordinator: Arc<MigrationCoordinator>) -> Self {
        Self {
            target: Arc::new(RwLock::new(target)),
            coordinator,
            policy: RetryPolicy::default(),
        }
    }

    /// Takes the retry policy from a loaded `RuntimeConfig`.
    pub fn with_config(self, config: &RuntimeConfig) -> Self {
        self.with_policy(config.retry.clone())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The executor calls are currently routed to.
    pub fn target(&self) -> Arc<dyn ExecutorRef> {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn object_id(&self) -> ObjectId {
        self.target().object_id()
    }

    /// Invokes a method, retrying while the object is migrating.
    ///
    /// Calls to `MIGRATE_SIGNATURE` are routed to `migrate` and answer with the
    /// destination address.
    pub async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        if call.signature().as_str() == MIGRATE_SIGNATURE {
            expect_arity(call.args(), 1)?;
            let destination = address_arg(call.args(), 0)?.clone();
            self.migrate(&destination).await?;
            return Ok(Value::Address(destination));
        }

        let this = self;
        self.policy
            .run(move |attempt| async move {
                let target = this.target_for(attempt);
                debug!(object = %target.object_id(), host = %target.address(), attempt, "forwarding call");
                target.invoke(call).await
            })
            .await
    }

    /// Moves the object to `destination` and re-points this proxy on success.
    pub async fn migrate(&self, destination: &HostAddress) -> Result<()> {
        // unknown hosts are rejected before anything is sent
        self.coordinator.validate(destination)?;

        let this = self;
        let moved = self
            .policy
            .run(move |attempt| async move {
                let source = this.target_for(attempt);
                this.coordinator.relocate(&source, destination).await
            })
            .await?;

        info!(object = %moved.object_id(), to = %moved.address(), "proxy re-pointed");
        self.swap(moved);
        Ok(())
    }

    /// Picks the target for an attempt. Retries first consult the registry, which
    /// may already know the object's new home.
    ///
    /// The registered handle replaces the current one whenever it is a different
    /// executor, even at the same address: an object that left a host and came back
    /// has a fresh executor there. The registered handle may be of another kind
    /// than the current one (a local executor in place of a remote reference);
    /// either routes to the same object.
    fn target_for(&self, attempt: u32) -> Arc<dyn ExecutorRef> {
        let current = self.target();
        if attempt <= 1 {
            return current;
        }
        match self.coordinator.registry().resolve(current.object_id()) {
            Some(resolved) if !Arc::ptr_eq(&resolved, &current) => {
                debug!(object = %current.object_id(), host = %resolved.address(), "target refreshed from registry");
                self.swap(Arc::clone(&resolved));
                resolved
            }
            _ => current,
        }
    }

    fn swap(&self, target: Arc<dyn ExecutorRef>) {
        *self.target.write().unwrap_or_else(PoisonError::into_inner) = target;
    }
}

//! # Migration Coordinator
//!
//! Thin orchestration around `ExecutorRef::migrate_to`: check the destination,
//! move the object, then update the registry. The registry is only touched once
//! the executor reports a committed move, so a failure at any stage leaves the
//! pre-migration placement in place.

use std::sync::Arc;

use tracing::info;

use roamrpc::CallError;
use roamrpc::HostAddress;
use roamrpc::error::Result;

use crate::executor::ExecutorRef;
use crate::registry::AddressRegistry;

pub struct MigrationCoordinator {
    registry: Arc<dyn AddressRegistry>,
}

impl MigrationCoordinator {
    pub fn new(registry: Arc<dyn AddressRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn AddressRegistry> {
        &self.registry
    }

    /// Fails with `DestinationNotFound` unless `destination` is a known host.
    pub fn validate(&self, destination: &HostAddress) -> Result<()> {
        if self.registry.is_known_host(destination) {
            Ok(())
        } else {
            Err(CallError::DestinationNotFound {
                address: destination.clone(),
            })
        }
    }

    /// Moves the object behind `source` to `destination` and re-registers it there.
    pub async fn relocate(
        &self,
        source: &Arc<dyn ExecutorRef>,
        destination: &HostAddress,
    ) -> Result<Arc<dyn ExecutorRef>> {
        self.validate(destination)?;

        let object = source.object_id();
        let origin = source.address().clone();
        let moved = source.migrate_to(destination).await?;

        if moved.address() != &origin {
            self.registry.deregister_host(&origin, object);
            self.registry
                .register_host(moved.address().clone(), Arc::clone(&moved));
            info!(%object, from = %origin, to = %moved.address(), "placement updated");
        }
        Ok(moved)
    }
}

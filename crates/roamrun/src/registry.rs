//! # Address Registry
//!
//! The lookup oracle for hosts and object placements. The dispatch core only
//! reads it, except for the register/deregister pair issued by a committed
//! migration and by object creation or deletion.
//!
//! `InMemoryRegistry` uses DashMap so proxies, hosts and coordinators can consult
//! it concurrently without a global lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use dashmap::DashSet;

use roamrpc::HostAddress;
use roamrpc::ObjectId;

use crate::executor::ExecutorRef;

/// Host and placement directory consumed by proxies, hosts and the coordinator.
pub trait AddressRegistry: Send + Sync + 'static {
    /// Whether `address` is one of the currently known hosts.
    fn is_known_host(&self, address: &HostAddress) -> bool;

    /// Records that the executor's object now lives at `address`.
    fn register_host(&self, address: HostAddress, executor: Arc<dyn ExecutorRef>);

    /// Forgets the placement of `object` at `address`. A placement at any other
    /// address is left alone.
    fn deregister_host(&self, address: &HostAddress, object: ObjectId);

    /// Where the object currently lives, if anywhere.
    fn locate(&self, object: ObjectId) -> Option<HostAddress>;

    /// The registered executor handle for the object, if any.
    fn resolve(&self, object: ObjectId) -> Option<Arc<dyn ExecutorRef>>;

    fn known_hosts(&self) -> Vec<HostAddress>;

    /// Allocates an identifier for a newly created object.
    fn allocate_id(&self) -> ObjectId;
}

struct Placement {
    address: HostAddress,
    executor: Arc<dyn ExecutorRef>,
}

/// Process-local registry.
pub struct InMemoryRegistry {
    hosts: DashSet<HostAddress>,
    placements: DashMap<ObjectId, Placement>,
    next_object_id: AtomicU64,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            hosts: DashSet::new(),
            placements: DashMap::new(),
            next_object_id: AtomicU64::new(1),
        }
    }

    /// Creates a registry that already knows the given hosts.
    pub fn with_hosts(hosts: impl IntoIterator<Item = HostAddress>) -> Self {
        let registry = Self::new();
        for host in hosts {
            registry.add_host(host);
        }
        registry
    }

    pub fn add_host(&self, address: HostAddress) -> bool {
        self.hosts.insert(address)
    }

    /// Removes a host from the known set. Placements on it are kept; objects there
    /// simply can no longer be migrated to it.
    pub fn remove_host(&self, address: &HostAddress) -> bool {
        self.hosts.remove(address).is_some()
    }

    pub fn object_count(&self) -> usize {
        self.placements.len()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRegistry")
            .field("hosts", &self.hosts.len())
            .field("placements", &self.placements.len())
            .finish()
    }
}

impl AddressRegistry for InMemoryRegistry {
    fn is_known_host(&self, address: &HostAddress) -> bool {
        self.hosts.contains(address)
    }

    fn register_host(&self, address: HostAddress, executor: Arc<dyn ExecutorRef>) {
        self.placements
            .insert(executor.object_id(), Placement { address, executor });
    }

    fn deregister_host(&self, address: &HostAddress, object: ObjectId) {
        self.placements
            .remove_if(&object, |_, placement| &placement.address == address);
    }

    fn locate(&self, object: ObjectId) -> Option<HostAddress> {
        self.placements
            .get(&object)
            .map(|entry| entry.value().address.clone())
    }

    fn resolve(&self, object: ObjectId) -> Option<Arc<dyn ExecutorRef>> {
        self.placements
            .get(&object)
            .map(|entry| entry.value().executor.clone())
    }

    fn known_hosts(&self) -> Vec<HostAddress> {
        let mut hosts: Vec<HostAddress> = self.hosts.iter().map(|h| h.key().clone()).collect();
        hosts.sort();
        hosts
    }

    fn allocate_id(&self) -> ObjectId {
        ObjectId(self.next_object_id.fetch_add(1, Ordering::Relaxed))
    }
}

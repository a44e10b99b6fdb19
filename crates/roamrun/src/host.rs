//! # Host
//!
//! One host's table of live executors, keyed by object id. Creates executors
//! for new objects, adopts migrating ones, deletes them on request and serves
//! wire frames addressed to them.
//!
//! Uses DashMap so calls, arrivals and departures on different objects never
//! contend on a shared lock.
//!
//! Objects that migrated away leave a tombstone behind: requests for them answer
//! `ObjectMigrating`, which sends remote callers back to the registry.

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use dashmap::DashMap;
use dashmap::DashSet;
use tracing::debug;
use tracing::info;

use roamrpc::CallError;
use roamrpc::Frame;
use roamrpc::HostAddress;
use roamrpc::ObjectId;
use roamrpc::Outcome;
use roamrpc::error::Result;

use crate::executor::ExecutorRef;
use crate::executor::ServerExecutor;
use crate::registry::AddressRegistry;
use crate::transfer;
use crate::transfer::Transfer;
use crate::transfer::TransferError;
use crate::wrapper::AppObjectWrapper;

pub struct Host {
    address: HostAddress,
    registry: Arc<dyn AddressRegistry>,
    executors: DashMap<ObjectId, Arc<ServerExecutor>>,
    departed: DashSet<ObjectId>,
    egress: Arc<dyn Transfer>,
}

impl Host {
    /// Creates a host whose outgoing migrations are carried by `fabric`.
    pub fn new(
        address: HostAddress,
        registry: Arc<dyn AddressRegistry>,
        fabric: Weak<dyn Transfer>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            address,
            registry,
            executors: DashMap::new(),
            departed: DashSet::new(),
            egress: Arc::new(Egress {
                host: this.clone(),
                fabric,
            }),
        })
    }

    pub fn address(&self) -> &HostAddress {
        &self.address
    }

    /// Places a new object on this host and registers it.
    pub fn instantiate(&self, wrapper: AppObjectWrapper) -> Arc<ServerExecutor> {
        let id = self.registry.allocate_id();
        let executor = self.start(id, wrapper);
        self.registry
            .register_host(self.address.clone(), executor.clone());
        info!(object = %id, host = %self.address, "object instantiated");
        executor
    }

    /// Starts an executor for an object arriving by migration.
    ///
    /// Registration is left to the coordinator that committed the move.
    pub fn adopt(&self, id: ObjectId, wrapper: AppObjectWrapper) -> Arc<ServerExecutor> {
        debug!(object = %id, host = %self.address, "object adopted");
        self.start(id, wrapper)
    }

    pub fn executor(&self, id: ObjectId) -> Result<Arc<ServerExecutor>> {
        if let Some(entry) = self.executors.get(&id) {
            return Ok(entry.value().clone());
        }
        if self.departed.contains(&id) {
            return Err(CallError::ObjectMigrating);
        }
        Err(CallError::ObjectNotFound(id))
    }

    /// Whether `id` lived here and migrated away.
    pub fn has_departed(&self, id: ObjectId) -> bool {
        self.departed.contains(&id)
    }

    /// Deletes an object living here. Fails fast while it is migrating.
    pub async fn delete(&self, id: ObjectId) -> Result<()> {
        let executor = self.executor(id)?;
        let wrapper = executor.retire().await?;
        self.executors.remove(&id);
        self.registry.deregister_host(&self.address, id);
        info!(object = %id, host = %self.address, kind = wrapper.type_name(), "object deleted");
        Ok(())
    }

    pub fn object_count(&self) -> usize {
        self.executors.len()
    }

    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.executors.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Answers one request frame.
    pub async fn serve(&self, frame: Frame) -> Frame {
        match frame {
            Frame::Call { seq, object, call } => {
                let result = match self.executor(object) {
                    Ok(executor) => executor.invoke(&call).await,
                    Err(e) => Err(e),
                };
                Frame::reply(seq, Outcome::from(result))
            }
            Frame::Migrate {
                seq,
                object,
                destination,
            } => {
                let result = match self.executor(object) {
                    Ok(executor) => executor.migrate_to(&destination).await,
                    Err(e) => Err(e),
                };
                let outcome = match result {
                    Ok(moved) => Outcome::Relocated(moved.address().clone()),
                    Err(e) => Outcome::Failed(e),
                };
                Frame::reply(seq, outcome)
            }
            Frame::Reply { seq, .. } => Frame::reply(
                seq,
                Outcome::Failed(CallError::Protocol("host received a Reply frame".into())),
            ),
        }
    }

    fn start(&self, id: ObjectId, wrapper: AppObjectWrapper) -> Arc<ServerExecutor> {
        let executor = ServerExecutor::new(id, self.address.clone(), wrapper, self.egress.clone());
        self.departed.remove(&id);
        self.executors.insert(id, executor.clone());
        executor
    }

    fn depart(&self, id: ObjectId) {
        self.departed.insert(id);
        self.executors.remove(&id);
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("address", &self.address)
            .field("objects", &self.executors.len())
            .finish()
    }
}

/// Outgoing side of a host's migrations: forwards to the fabric and drops the
/// departed executor from the host's table once the move commits.
struct Egress {
    host: Weak<Host>,
    fabric: Weak<dyn Transfer>,
}

#[async_trait::async_trait]
impl Transfer for Egress {
    async fn transfer(
        &self,
        object: ObjectId,
        destination: &HostAddress,
        wrapper: AppObjectWrapper,
    ) -> transfer::Result<Arc<dyn ExecutorRef>> {
        let Some(fabric) = self.fabric.upgrade() else {
            return Err(TransferError::new("network fabric is gone", wrapper));
        };
        let moved = fabric.transfer(object, destination, wrapper).await?;
        if let Some(host) = self.host.upgrade() {
            host.depart(object);
        }
        Ok(moved)
    }
}

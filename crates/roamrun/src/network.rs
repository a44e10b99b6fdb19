//! # In-process network
//!
//! A set of hosts reachable from one another inside a single process. Moves
//! wrappers between hosts by value and hands out loopback transports for
//! remote references. Hosts can be isolated to simulate a partition: transfers
//! into an isolated host and requests to it fail until it rejoins.

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use dashmap::DashMap;
use dashmap::DashSet;
use tracing::warn;

use roamrpc::Frame;
use roamrpc::HostAddress;
use roamrpc::ObjectId;
use roamrpc::Transport;
use roamrpc::TransportError;
use roamrpc::transport;

use crate::executor::ExecutorRef;
use crate::host::Host;
use crate::registry::InMemoryRegistry;
use crate::remote::Connector;
use crate::transfer;
use crate::transfer::Transfer;
use crate::transfer::TransferError;
use crate::wrapper::AppObjectWrapper;

pub struct Network {
    this: Weak<Network>,
    registry: Arc<InMemoryRegistry>,
    hosts: DashMap<HostAddress, Arc<Host>>,
    isolated: DashSet<HostAddress>,
}

impl Network {
    pub fn new(registry: Arc<InMemoryRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            registry,
            hosts: DashMap::new(),
            isolated: DashSet::new(),
        })
    }

    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        &self.registry
    }

    /// Starts a host at `address` and announces it to the registry.
    ///
    /// Returns the existing host if one already runs there.
    pub fn spawn_host(&self, address: HostAddress) -> Arc<Host> {
        self.hosts
            .entry(address.clone())
            .or_insert_with(|| {
                let this: Weak<Network> = self.this.clone();
                let fabric: Weak<dyn Transfer> = this;
                let registry: Arc<InMemoryRegistry> = self.registry.clone();
                self.registry.add_host(address.clone());
                Host::new(address, registry, fabric)
            })
            .value()
            .clone()
    }

    pub fn host(&self, address: &HostAddress) -> Option<Arc<Host>> {
        self.hosts.get(address).map(|entry| entry.value().clone())
    }

    /// Cuts the host off: nothing can migrate into it or reach it.
    pub fn isolate(&self, address: &HostAddress) {
        self.isolated.insert(address.clone());
    }

    pub fn rejoin(&self, address: &HostAddress) {
        self.isolated.remove(address);
    }

    fn reachable(&self, address: &HostAddress) -> Option<Arc<Host>> {
        if self.isolated.contains(address) {
            return None;
        }
        self.host(address)
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("hosts", &self.hosts.len())
            .field("isolated", &self.isolated.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl Transfer for Network {
    async fn transfer(
        &self,
        object: ObjectId,
        destination: &HostAddress,
        wrapper: AppObjectWrapper,
    ) -> transfer::Result<Arc<dyn ExecutorRef>> {
        let Some(host) = self.reachable(destination) else {
            warn!(%object, %destination, "destination unreachable");
            return Err(TransferError::new(
                format!("host {} is unreachable", destination),
                wrapper,
            ));
        };
        let executor: Arc<dyn ExecutorRef> = host.adopt(object, wrapper);
        Ok(executor)
    }
}

#[async_trait::async_trait]
impl Connector for Network {
    async fn connect(&self, address: &HostAddress) -> transport::Result<Arc<dyn Transport>> {
        if self.reachable(address).is_none() {
            return Err(TransportError::ConnectionLost(format!(
                "host {} is unreachable",
                address
            )));
        }
        Ok(Arc::new(LoopbackTransport {
            network: self.this.clone(),
            address: address.clone(),
        }))
    }
}

/// Transport that serves frames directly against a host of the same network.
///
/// Looks the host up on every call, so isolating a host also breaks transports
/// that were opened before.
pub struct LoopbackTransport {
    network: Weak<Network>,
    address: HostAddress,
}

#[async_trait::async_trait]
impl Transport for LoopbackTransport {
    async fn call(&self, frame: Frame) -> transport::Result<Frame> {
        let network = self
            .network
            .upgrade()
            .ok_or_else(|| TransportError::ConnectionLost("network shut down".into()))?;
        let host = network.reachable(&self.address).ok_or_else(|| {
            TransportError::ConnectionLost(format!("host {} is unreachable", self.address))
        })?;
        Ok(host.serve(frame).await)
    }
}

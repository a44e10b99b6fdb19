//! # Remote executor reference
//!
//! An `ExecutorRef` for an executor living on another host, reached through a
//! `Transport`.
//!
//! ## Invariants
//!
//! - Reply sequence numbers must match request sequence numbers.
//! - Only `Reply` frames are accepted; anything else is a protocol violation.
//! - Failures reported by the peer are returned verbatim, so `ObjectMigrating`
//!   raised remotely drives the caller's backoff exactly like a local one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::Mutex;
use tracing::debug;

use roamrpc::CallError;
use roamrpc::Frame;
use roamrpc::HostAddress;
use roamrpc::MethodCall;
use roamrpc::ObjectId;
use roamrpc::Outcome;
use roamrpc::Transport;
use roamrpc::Value;
use roamrpc::error::Result;
use roamrpc::transport;

use crate::executor::ExecutorRef;

/// Opens transports to hosts by address.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, address: &HostAddress) -> transport::Result<Arc<dyn Transport>>;
}

pub struct RemoteExecutor {
    object_id: ObjectId,
    address: HostAddress,
    // dialled on first use and again after a failed dial
    transport: Mutex<Option<Arc<dyn Transport>>>,
    connector: Arc<dyn Connector>,
    seq_gen: AtomicU64,
}

impl RemoteExecutor {
    /// A reference to `object` at `address` that dials on first use.
    pub fn new(object_id: ObjectId, address: HostAddress, connector: Arc<dyn Connector>) -> Self {
        Self {
            object_id,
            address,
            transport: Mutex::new(None),
            connector,
            seq_gen: AtomicU64::new(1),
        }
    }

    /// Dials `address` up front and returns a reference to `object` living there.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        address: HostAddress,
        object_id: ObjectId,
    ) -> Result<Self> {
        let remote = Self::new(object_id, address, connector);
        remote.transport().await?;
        Ok(remote)
    }

    fn next_seq(&self) -> u64 {
        self.seq_gen.fetch_add(1, Ordering::Relaxed)
    }

    async fn transport(&self) -> Result<Arc<dyn Transport>> {
        let mut slot = self.transport.lock().await;
        if let Some(transport) = slot.as_ref() {
            return Ok(Arc::clone(transport));
        }
        let transport = self.connector.connect(&self.address).await?;
        *slot = Some(Arc::clone(&transport));
        Ok(transport)
    }

    /// Sends a request and checks that the answer is its reply.
    async fn round_trip(&self, request: Frame) -> Result<Outcome> {
        let seq = request.seq();
        debug!(object = %self.object_id, host = %self.address, seq, kind = request.kind(), "sending frame");

        let transport = self.transport().await?;
        match transport.call(request).await? {
            Frame::Reply { seq: got, outcome } => {
                if got != seq {
                    return Err(CallError::Protocol(format!(
                        "Sequence mismatch: sent {}, received {}",
                        seq, got
                    )));
                }
                Ok(outcome)
            }
            other => Err(CallError::Protocol(format!(
                "Received {} frame while waiting for Reply",
                other.kind()
            ))),
        }
    }
}

impl fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("object_id", &self.object_id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ExecutorRef for RemoteExecutor {
    fn object_id(&self) -> ObjectId {
        self.object_id
    }

    fn address(&self) -> &HostAddress {
        &self.address
    }

    async fn invoke(&self, call: &MethodCall) -> Result<Value> {
        let frame = Frame::Call {
            seq: self.next_seq(),
            object: self.object_id,
            call: call.clone(),
        };
        self.round_trip(frame).await?.into_value()
    }

    async fn migrate_to(&self, destination: &HostAddress) -> Result<Arc<dyn ExecutorRef>> {
        let frame = Frame::Migrate {
            seq: self.next_seq(),
            object: self.object_id,
            destination: destination.clone(),
        };
        let landed = self.round_trip(frame).await?.into_relocation()?;

        // already committed, so dial the destination lazily
        let moved = Self::new(self.object_id, landed, Arc::clone(&self.connector));
        Ok(Arc::new(moved))
    }
}

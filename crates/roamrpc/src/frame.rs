//! # Frames
//!
//! The request/response envelope exchanged between a remote executor reference
//! and the host that owns the executor.
//!
//! ## Invariants
//!
//! - Every request (`Call`, `Migrate`) is answered by exactly one `Reply`
//!   carrying the same sequence number.
//! - A `Call` is answered with `Returned` or `Failed`; a `Migrate` with
//!   `Relocated` or `Failed`. Any other pairing is a protocol violation.

use crate::address::HostAddress;
use crate::address::ObjectId;
use crate::call::MethodCall;
use crate::error::CallError;
use crate::value::Value;

/// A single message on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Invoke a method on an object living on the receiving host.
    Call {
        seq: u64,
        object: ObjectId,
        call: MethodCall,
    },
    /// Ask the receiving host to move an object to `destination`.
    Migrate {
        seq: u64,
        object: ObjectId,
        destination: HostAddress,
    },
    /// The answer to a `Call` or `Migrate` with the same `seq`.
    Reply { seq: u64, outcome: Outcome },
}

/// The body of a reply.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The call returned a value.
    Returned(Value),
    /// The object now lives at this address.
    Relocated(HostAddress),
    /// The request failed on the peer.
    Failed(CallError),
}

impl Frame {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Call { seq, .. } | Self::Migrate { seq, .. } | Self::Reply { seq, .. } => *seq,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Call { .. } => "Call",
            Self::Migrate { .. } => "Migrate",
            Self::Reply { .. } => "Reply",
        }
    }

    pub fn reply(seq: u64, outcome: Outcome) -> Self {
        Self::Reply { seq, outcome }
    }
}

impl Outcome {
    /// Interprets the outcome as the answer to a `Call`.
    pub fn into_value(self) -> crate::error::Result<Value> {
        match self {
            Self::Returned(v) => Ok(v),
            Self::Failed(e) => Err(e),
            Self::Relocated(addr) => Err(CallError::Protocol(format!(
                "expected a returned value, got relocation to {}",
                addr
            ))),
        }
    }

    /// Interprets the outcome as the answer to a `Migrate`.
    pub fn into_relocation(self) -> crate::error::Result<HostAddress> {
        match self {
            Self::Relocated(addr) => Ok(addr),
            Self::Failed(e) => Err(e),
            Self::Returned(v) => Err(CallError::Protocol(format!(
                "expected a relocation, got a returned {}",
                v.kind()
            ))),
        }
    }
}

impl From<crate::error::Result<Value>> for Outcome {
    fn from(r: crate::error::Result<Value>) -> Self {
        match r {
            Ok(v) => Self::Returned(v),
            Err(e) => Self::Failed(e),
        }
    }
}

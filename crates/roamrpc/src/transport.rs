//! # Transport Abstraction
//!
//! A minimal, async interface for moving frames between hosts.
//!
//! ## Philosophy
//!
//! - **Frame-Oriented**: The transport carries whole `Frame`s and never looks at the
//!   call inside. Encoding them to bytes, if a transport needs to, is its own business.
//! - **Request-Response**: The fundamental interaction model is "send a frame, await a frame".

use std::fmt;

use crate::frame::Frame;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A mechanism to send a frame and receive the reply.
///
/// This trait is object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a request frame and waits for the peer's reply frame.
    ///
    /// # invariants
    /// - Must return `Ok(frame)` with the peer's reply on success.
    /// - Must return `Err` only if the frame could not be delivered or answered;
    ///   a call that failed on the peer is a successful round trip.
    async fn call(&self, frame: Frame) -> Result<Frame>;
}

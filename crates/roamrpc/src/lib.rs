//! # roamrpc
//!
//! The vocabulary spoken between client proxies and server executors.
//!
//! ## Architecture
//!
//! - **Calls**: a `MethodCall` is an opaque `Signature` plus an ordered list of `Value`s.
//!   Signatures are compared, hashed and looked up; they are never parsed.
//! - **Failures**: every outcome is a `Result<Value, CallError>`. Retry decisions are made
//!   by matching on `CallError`, never by inspecting messages.
//! - **Frames**: the request/response envelope carried by a `Transport`. Frames hold typed
//!   values; how they would be laid out as bytes is left to the transport.

pub mod address;
pub mod call;
pub mod error;
pub mod frame;
pub mod transport;
pub mod value;

pub use address::AddressParseError;
pub use address::HostAddress;
pub use address::ObjectId;
pub use call::MethodCall;
pub use call::Signature;
pub use error::AppError;
pub use error::CallError;
pub use frame::Frame;
pub use frame::Outcome;
pub use transport::Transport;
pub use transport::TransportError;
pub use value::Value;

#[cfg(test)]
mod tests;

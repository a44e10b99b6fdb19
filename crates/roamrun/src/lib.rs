//! # roamrun
//!
//! Runtime side of roam: user objects wrapped by a client proxy and a server
//! executor that can move the object between hosts while calls keep flowing.
//!
//! ## Architecture
//!
//! - **Wrapper**: `AppObjectWrapper` owns the user object and dispatches calls through a
//!   per-type `DispatchTable` built once at registration.
//! - **Executor**: `ServerExecutor` runs calls against the wrapper and performs the
//!   server side of migration. Calls never wait for a migration; they fail fast.
//! - **Proxy**: `ClientProxy` is the caller's handle. It retries the relocation signal
//!   with exponential backoff and re-points itself when the object moves.
//! - **Coordinator**: `MigrationCoordinator` validates destinations and keeps the
//!   `AddressRegistry` in step with committed migrations.
//! - **Hosting**: `Host`, `Network` and `RemoteExecutor` place executors on addresses
//!   and reach them over a `Transport`.

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod host;
pub mod network;
pub mod proxy;
pub mod registry;
pub mod remote;
pub mod retry;
pub mod telemetry;
pub mod transfer;
pub mod wrapper;

pub use config::RuntimeConfig;
pub use coordinator::MigrationCoordinator;
pub use executor::ExecutorRef;
pub use executor::ExecutorState;
pub use executor::ServerExecutor;
pub use host::Host;
pub use network::Network;
pub use proxy::ClientProxy;
pub use registry::AddressRegistry;
pub use registry::InMemoryRegistry;
pub use remote::Connector;
pub use remote::RemoteExecutor;
pub use retry::RetryPolicy;
pub use transfer::Transfer;
pub use transfer::TransferError;
pub use wrapper::AppObjectWrapper;
pub use wrapper::DispatchTable;

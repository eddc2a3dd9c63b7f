pub mod client;
pub mod codec;
pub mod dispatch;
pub mod mirror;
pub mod status;
#[cfg(test)]
pub mod testing; // Scripted mock transport

pub use client::{RegistryCall, RegistryTransport, RpcRegistryClient};
pub use dispatch::{DispatchError, PolicyDispatcher};
pub use mirror::{spawn_policy_poller, PolicyMirror, ScanReport, ScanTermination};

//! In-process carriers for the relay.
//!
//! [`MemoryQueue`] and [`MemoryRegistry`] stand in for the managed queue and device
//! registry; [`DeviceTransport`] and [`GroupTransport`] implement the job-level
//! [`tandem_core::transport::Transport`] on top of them.
mod error;
pub use error::CredentialError;

mod queue;
pub use queue::MemoryQueue;

mod registry;
pub use registry::{DeviceCredentials, MemoryRegistry};

mod device;
pub use device::DeviceTransport;

mod group;
pub use group::GroupTransport;

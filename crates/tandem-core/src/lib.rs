//! Relay logic for paired scheduler/solver jobs.
//!
//! The external collaborators (queue, registry, delivery channel, transport) are traits;
//! everything else is implemented against them.
pub mod broker;
pub mod delivery;
pub mod hub;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod router;
pub mod runner;
pub mod service;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use crate::broker::{ApiKey, BrokerError, BrokerSettings, ConnectionDescriptor, IdentityBroker};
    pub use crate::delivery::{Delivery, DeliveryError, DeliveryHandle, Outbound};
    pub use crate::hub::{AccessToken, FanoutHub, GroupMessage, HubConnection, HubError, HubEvent};
    pub use crate::metrics::{MetricsHandle, RelayMetrics, noop_metrics};
    pub use crate::queue::{MessageQueue, QueueError, QueueHandle, QueuedMessage};
    pub use crate::registry::{Principal, Registry, RegistryError, RegistryHandle, SharedAccessKey};
    pub use crate::router::{ErrorChannel, ProcessingError, RelayRouter, RouteOutcome, RouterConfig};
    pub use crate::runner::{
        JobState, JobStateMachine, RunnerConfig, RunnerError, SchedulerRunner, SimulatedWork,
        SolverRunner, SolverWorker, StepWork,
    };
    pub use crate::service::{ServicePolicy, relay_service, solver_worker_service};
    pub use crate::transport::{Inbound, Subscription, Transport, TransportError, TransportHandle};
}

//! HTTP surface of the relay: credential negotiation, job submission and broadcast.
//!
//! [`HttpApi`] mounts the routes over any [`ApiHandler`]; [`BrokerAdapter`] is the
//! implementation backed by the identity broker, the fan-out hub and the job queue.
mod error;
pub use error::ApiError;

mod handler;
pub use handler::ApiHandler;

mod adapter;
pub use adapter::BrokerAdapter;

mod http;
pub use http::{API_KEY_HEADER, HttpApi};

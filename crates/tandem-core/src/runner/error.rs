use tandem_model::ModelError;
use thiserror::Error;

use crate::queue::QueueError;
use crate::runner::JobState;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition { from: JobState, to: JobState },

    #[error("invalid job: {0}")]
    InvalidJob(#[from] ModelError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("update channel closed before the job finished")]
    ChannelClosed,
}

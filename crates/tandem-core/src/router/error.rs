use thiserror::Error;
use tokio::sync::mpsc;

use crate::queue::QueueError;

/// Processing-loop error not tied to a routing decision.
///
/// Reported through an [`ErrorChannel`]; never stops the loop.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("receive failed: {0}")]
    Receive(#[source] QueueError),

    #[error("failed to settle message {message_id}: {source}")]
    Settle {
        message_id: String,
        #[source]
        source: QueueError,
    },

    #[error("message handler aborted: {0}")]
    Handler(String),
}

impl ProcessingError {
    /// Return label value for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Receive(_) => "receive",
            ProcessingError::Settle { .. } => "settle",
            ProcessingError::Handler(_) => "handler",
        }
    }
}

/// Side channel for processing-loop errors.
pub type ErrorChannel = mpsc::UnboundedSender<ProcessingError>;

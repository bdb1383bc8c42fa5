use tandem_model::{Identity, Job, JobUpdate, ProtocolMessage, RunnerCommand};
use tracing::{debug, trace, warn};

use crate::transport::Inbound;

/// What an inbound payload means for the local run.
#[derive(Debug)]
pub(crate) enum Signal {
    Cancel,
    Update(JobUpdate),
    Command(RunnerCommand),
    Ignore,
}

/// Classify an inbound payload for the job run of `me`.
///
/// Own messages (loop-back), foreign correlation ids and malformed payloads are ignored.
pub(crate) fn classify(job: &Job, me: &Identity, msg: Inbound) -> Signal {
    if msg.sender.as_deref() == Some(me.to_string().as_str()) {
        trace!(identity = %me, "ignoring own message");
        return Signal::Ignore;
    }

    match ProtocolMessage::decode(&msg.payload) {
        Ok(ProtocolMessage::Update(update)) if update.correlation_id != job.correlation_id => {
            debug!(
                job = %job.correlation_id,
                other = %update.correlation_id,
                "ignoring update for another job",
            );
            Signal::Ignore
        }
        Ok(ProtocolMessage::Update(update)) if update.is_cancelled() => Signal::Cancel,
        Ok(ProtocolMessage::Update(update)) => Signal::Update(update),
        Ok(ProtocolMessage::Command(cmd)) => Signal::Command(cmd),
        Ok(ProtocolMessage::Job(_)) => {
            debug!(job = %job.correlation_id, "ignoring job document on update channel");
            Signal::Ignore
        }
        Err(e) => {
            warn!(job = %job.correlation_id, error = %e, "ignoring malformed payload");
            Signal::Ignore
        }
    }
}

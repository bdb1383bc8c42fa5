mod status;
pub use status::JobStatus;

#[allow(clippy::module_inception)]
mod job;
pub use job::Job;

mod update;
pub use update::JobUpdate;

mod command;
pub use command::RunnerCommand;

mod message;
pub use message::ProtocolMessage;

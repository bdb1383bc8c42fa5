use std::time::Duration;

use taskvisor::{BackoffPolicy, JitterPolicy, RestartPolicy, TaskRef, TaskSpec};
use tandem_model::{BackoffStrategy, JitterStrategy, RestartStrategy};

use crate::service::ServicePolicy;

/// `interval` is the pause between runs of an always-restarted service; the
/// other strategies ignore it.
pub fn to_restart_policy(s: RestartStrategy, interval: Option<Duration>) -> RestartPolicy {
    match s {
        RestartStrategy::Never => RestartPolicy::Never,
        RestartStrategy::Always => RestartPolicy::Always { interval },
        RestartStrategy::OnFailure => RestartPolicy::OnFailure,
    }
}

pub fn to_jitter_policy(s: JitterStrategy) -> JitterPolicy {
    match s {
        JitterStrategy::None => JitterPolicy::None,
        JitterStrategy::Full => JitterPolicy::Full,
        JitterStrategy::Equal => JitterPolicy::Equal,
        JitterStrategy::Decorrelated => JitterPolicy::Decorrelated,
    }
}

pub fn to_backoff_policy(s: &BackoffStrategy) -> BackoffPolicy {
    BackoffPolicy {
        first: Duration::from_millis(s.first_ms),
        max: Duration::from_millis(s.max_ms),
        jitter: to_jitter_policy(s.jitter),
        factor: s.factor,
    }
}

fn restart_for(p: &ServicePolicy) -> RestartPolicy {
    to_restart_policy(p.restart, p.backoff.delay_ms.map(Duration::from_millis))
}

pub fn to_task_spec(task: TaskRef, p: &ServicePolicy) -> TaskSpec {
    TaskSpec::new(
        task,
        restart_for(p),
        to_backoff_policy(&p.backoff),
        p.timeout_ms.map(Duration::from_millis),
    )
}

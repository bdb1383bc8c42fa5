use tandem_model::{Job, JobStatus};

#[derive(Debug)]
struct StepRecord {
    name: String,
    latest: Option<JobStatus>,
    completed: bool,
}

/// Outcome of feeding one update into the [`StepLedger`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Observation {
    /// The update names no step of the job.
    UnknownStep,
    Recorded { index: usize },
    /// The step was already completed; the update arrived out of order.
    Regressed { index: usize, previous: JobStatus },
}

/// Per-step view of a job as seen by the scheduler.
///
/// `Completed` is sticky: a late `InProgress` for a finished step is reported as
/// [`Observation::Regressed`] and does not reopen it. Duplicate step names are
/// matched to the first record not yet completed.
#[derive(Debug)]
pub(crate) struct StepLedger {
    steps: Vec<StepRecord>,
    last: Option<usize>,
}

impl StepLedger {
    pub(crate) fn new(job: &Job) -> Self {
        Self {
            steps: job
                .steps
                .iter()
                .map(|name| StepRecord {
                    name: name.clone(),
                    latest: None,
                    completed: false,
                })
                .collect(),
            last: None,
        }
    }

    pub(crate) fn observe(&mut self, step: &str, status: JobStatus) -> Observation {
        let open = self.steps.iter().position(|r| r.name == step && !r.completed);
        let index = match open {
            Some(i) => i,
            None => match self.steps.iter().position(|r| r.name == step) {
                Some(i) => {
                    return Observation::Regressed {
                        index: i,
                        previous: JobStatus::Completed,
                    };
                }
                None => return Observation::UnknownStep,
            },
        };

        let record = &mut self.steps[index];
        record.latest = Some(status);
        if status == JobStatus::Completed {
            record.completed = true;
        }
        self.last = Some(index);
        Observation::Recorded { index }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.steps.iter().all(|r| r.completed)
    }

    /// Name of the step touched most recently, if any.
    pub(crate) fn current_step(&self) -> Option<&str> {
        self.last.map(|i| self.steps[i].name.as_str())
    }

    #[cfg(test)]
    pub(crate) fn status_of(&self, index: usize) -> Option<JobStatus> {
        self.steps.get(index).and_then(|r| r.latest)
    }
}

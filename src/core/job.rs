use std::time::{Duration, Instant};

use log::{error, info};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    step::{Step, StepExecution},
};

/// Type alias for job execution results.
type JobResult<T> = Result<T, BatchError>;

/// Represents a job that can be executed.
///
/// A job is a container for a sequence of steps that are executed in order.
/// The first failing step aborts the job: later steps never run.
pub trait Job {
    /// Runs the job and returns the result of the job execution.
    ///
    /// # Returns
    /// - `Ok(JobExecution)` when every step succeeds
    /// - `Err(BatchError::Step)` naming the failed step and wrapping its cause
    fn run(&self) -> JobResult<JobExecution>;
}

/// Timing information about a job run plus the execution of each step.
#[derive(Debug)]
pub struct JobExecution {
    /// The time when the job started executing
    pub start: Instant,
    /// The time when the job finished executing
    pub end: Instant,
    /// The total duration of the job execution
    pub duration: Duration,
    /// Executions of the steps that ran, in order
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    /// Looks up the execution of a step by name.
    pub fn step(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions.iter().find(|s| s.name == name)
    }
}

/// A configured job: an identifier, a name and its steps in execution order.
pub struct JobInstance<'a> {
    id: Uuid,
    name: String,
    steps: Vec<&'a dyn Step>,
}

impl JobInstance<'_> {
    /// Name given through [`JobBuilder::name`], or the generated one.
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl Job for JobInstance<'_> {
    fn run(&self) -> JobResult<JobExecution> {
        let start = Instant::now();

        info!("Start of job: {}, id: {}", self.name, self.id);

        let mut step_executions = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let mut step_execution = StepExecution::new(step.get_name());
            let result = step.execute(&mut step_execution);
            step_executions.push(step_execution);

            if let Err(source) = result {
                error!(
                    "Job {} aborted, step {} failed: {}",
                    self.name,
                    step.get_name(),
                    source
                );
                return Err(BatchError::Step {
                    name: step.get_name().to_owned(),
                    source: Box::new(source),
                });
            }
        }

        info!("End of job: {}, id: {}", self.name, self.id);

        Ok(JobExecution {
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            step_executions,
        })
    }
}

/// Builder for creating a job instance.
///
/// ```
/// use ecommerce_batch::core::job::{Job, JobBuilder};
/// use ecommerce_batch::core::step::{RepeatStatus, StepBuilder, StepExecution, Tasklet};
/// use ecommerce_batch::BatchError;
///
/// struct Hello;
/// impl Tasklet for Hello {
///     fn execute(&self, _: &StepExecution) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
///
/// let step = StepBuilder::new("hello").tasklet(&Hello).build().unwrap();
/// let job = JobBuilder::new().name("greetings".to_string()).start(&step).build();
///
/// assert!(job.run().is_ok());
/// ```
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    /// Collection of steps to be executed, in order
    steps: Vec<&'a dyn Step>,
}

impl<'a> JobBuilder<'a> {
    /// Creates a builder with no name and no steps.
    pub fn new() -> Self {
        Self {
            name: None,
            steps: Vec::new(),
        }
    }

    /// Names the job in logs. A random name is generated when unset.
    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    /// Sets the first step of the job. Same as `next`, reads better first.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Appends a step that runs after every step added so far.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Builds the job. A job without steps runs and succeeds immediately.
    pub fn build(self) -> JobInstance<'a> {
        JobInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            steps: self.steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::core::step::{RepeatStatus, StepBuilder, StepStatus, Tasklet};

    struct RecordingTasklet<'a> {
        label: &'static str,
        journal: &'a RefCell<Vec<&'static str>>,
        fail: bool,
    }

    impl Tasklet for RecordingTasklet<'_> {
        fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
            self.journal.borrow_mut().push(self.label);
            if self.fail {
                Err(BatchError::Parse(format!("{} is malformed", self.label)))
            } else {
                Ok(RepeatStatus::Finished)
            }
        }
    }

    #[test]
    fn steps_run_in_order() {
        let journal = RefCell::new(Vec::new());
        let load = RecordingTasklet {
            label: "load",
            journal: &journal,
            fail: false,
        };
        let report = RecordingTasklet {
            label: "report",
            journal: &journal,
            fail: false,
        };
        let load_step = StepBuilder::new("load").tasklet(&load).build().unwrap();
        let report_step = StepBuilder::new("report").tasklet(&report).build().unwrap();

        let job = JobBuilder::new()
            .name("ordered".to_string())
            .start(&load_step)
            .next(&report_step)
            .build();

        let execution = job.run().unwrap();

        assert_eq!(*journal.borrow(), vec!["load", "report"]);
        assert_eq!(execution.step_executions.len(), 2);
        assert_eq!(
            execution.step("report").map(|s| s.status),
            Some(StepStatus::Success)
        );
        assert!(execution.start <= execution.end);
    }

    #[test]
    fn failing_step_aborts_the_job() {
        let journal = RefCell::new(Vec::new());
        let load = RecordingTasklet {
            label: "load",
            journal: &journal,
            fail: true,
        };
        let report = RecordingTasklet {
            label: "report",
            journal: &journal,
            fail: false,
        };
        let load_step = StepBuilder::new("load").tasklet(&load).build().unwrap();
        let report_step = StepBuilder::new("report").tasklet(&report).build().unwrap();

        let job = JobBuilder::new().start(&load_step).next(&report_step).build();

        match job.run() {
            Err(BatchError::Step { name, source }) => {
                assert_eq!(name, "load");
                assert!(matches!(*source, BatchError::Parse(_)));
            }
            other => panic!("expected a step failure, got {:?}", other),
        }
        assert_eq!(*journal.borrow(), vec!["load"]);
    }

    #[test]
    fn unnamed_job_gets_a_generated_name() {
        let job = JobBuilder::new().build();

        assert_eq!(job.get_name().len(), 8);
    }
}

use crate::error::PipelineResult;
use std::sync::Arc;
use std::time::Duration;

use super::stages::StopWhen;

/// A single stage in a pipeline
///
/// A stage consumes the payload and produces the next one. Stages are
/// executed sequentially by [`Pipeline`](super::Pipeline), each output
/// feeding the next stage's input.
///
/// Stage bodies are treated as opaque: side effects and captured state are
/// the implementor's responsibility, and any error returned is propagated to
/// the caller of `process` unchanged.
///
/// # Example
/// ```
/// use pipewright::{Pipeline, PipelineResult, Stage};
///
/// struct Shout;
///
/// impl Stage<String> for Shout {
///     fn invoke(&self, payload: String) -> PipelineResult<String> {
///         Ok(payload.to_uppercase())
///     }
///
///     fn name(&self) -> &str {
///         "Shout"
///     }
/// }
///
/// let pipeline = Pipeline::new().pipe(Shout);
/// assert_eq!(pipeline.process("hello".to_string()).unwrap(), "HELLO");
/// ```
pub trait Stage<T>: Send + Sync {
    /// Transform the payload
    fn invoke(&self, payload: T) -> PipelineResult<T>;

    /// Get stage name for logging and run records
    fn name(&self) -> &str {
        "stage"
    }

    /// Expose the [`Stoppable`] capability, if this stage has it
    ///
    /// The pipeline queries this after every invocation of the stage.
    fn as_stoppable(&self) -> Option<&dyn Stoppable<T>> {
        None
    }
}

/// Optional capability letting a stage end the pipeline early
///
/// Evaluated against the payload the stage just produced. Returning `true`
/// skips every remaining stage and makes that payload the pipeline's result.
pub trait Stoppable<T> {
    fn should_stop(&self, payload: &T) -> bool;
}

/// Stage handle shared between pipelines
pub type SharedStage<T> = Arc<dyn Stage<T>>;

impl<T, S> Stage<T> for Arc<S>
where
    S: Stage<T> + ?Sized,
{
    fn invoke(&self, payload: T) -> PipelineResult<T> {
        (**self).invoke(payload)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn as_stoppable(&self) -> Option<&dyn Stoppable<T>> {
        (**self).as_stoppable()
    }
}

/// Combinators available on every stage
pub trait StageExt<T>: Stage<T> + Sized + 'static {
    /// Move this stage behind an `Arc` so it can be shared
    fn shared(self) -> SharedStage<T> {
        Arc::new(self)
    }

    /// Give this stage the [`Stoppable`] capability
    fn stop_when<P>(self, predicate: P) -> StopWhen<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        StopWhen::new(self, predicate)
    }
}

impl<T, S> StageExt<T> for S where S: Stage<T> + 'static {}

/// Record of one executed stage
#[derive(Debug, Clone)]
pub struct StageRecord {
    /// Position of the stage in the pipeline
    pub index: usize,

    /// Stage name
    pub stage_name: String,

    /// Duration of execution
    pub duration: Duration,

    /// Whether the stage asked the pipeline to stop
    pub stopped: bool,
}

/// Result of a complete pipeline execution
#[derive(Debug, Clone)]
pub struct PipelineRun<T> {
    /// Pipeline name
    pub pipeline_name: String,

    /// Final payload
    pub payload: T,

    /// Records of the stages that ran, in order
    pub stage_records: Vec<StageRecord>,

    /// Number of stages in the pipeline
    pub stage_count: usize,

    /// Total duration
    pub total_duration: Duration,
}

impl<T> PipelineRun<T> {
    /// Get the number of stages that were executed
    pub fn executed_stages(&self) -> usize {
        self.stage_records.len()
    }

    /// Get the number of stages skipped by an early stop
    pub fn remaining_stages(&self) -> usize {
        self.stage_count - self.stage_records.len()
    }

    /// Get the stage that stopped the pipeline (if any)
    pub fn stopped_at(&self) -> Option<&StageRecord> {
        self.stage_records.iter().find(|r| r.stopped)
    }

    /// Discard the records and keep the payload
    pub fn into_payload(self) -> T {
        self.payload
    }
}

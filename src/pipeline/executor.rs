use super::core::{PipelineRun, SharedStage, Stage, StageRecord};
use crate::error::PipelineResult;
use crate::logger::{self, LogLevel};
use crate::pipeline_log;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

const DEFAULT_NAME: &str = "pipeline";

/// Immutable sequence of stages that runs a payload through each in order
///
/// Appending with [`pipe`](Pipeline::pipe) never touches the receiver; it
/// returns a new pipeline sharing the existing stages. A pipeline is itself a
/// [`Stage`], so pipelines nest inside other pipelines and inside branch
/// stages.
///
/// # Example
/// ```
/// use pipewright::{stage, Pipeline};
///
/// let base = Pipeline::new().pipe(stage(|n: i32| n + 1));
/// let doubled = base.pipe(stage(|n: i32| n * 2));
/// let tripled = base.pipe(stage(|n: i32| n * 3));
///
/// assert_eq!(doubled.process(3).unwrap(), 8);
/// assert_eq!(tripled.process(3).unwrap(), 12);
/// assert_eq!(base.process(3).unwrap(), 4);
/// ```
pub struct Pipeline<T> {
    name: String,
    stages: Vec<SharedStage<T>>,
}

impl<T> Pipeline<T> {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::named(DEFAULT_NAME)
    }

    /// Create an empty pipeline with a name used in logs and run records
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Create a pipeline from a prebuilt stage sequence
    pub fn from_stages(stages: Vec<SharedStage<T>>) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            stages,
        }
    }

    /// Create a new pipeline builder
    pub fn builder(name: impl Into<String>) -> PipelineBuilder<T> {
        PipelineBuilder::new(name)
    }

    /// Get the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Return a new pipeline with `stage` appended
    pub fn pipe<S>(&self, stage: S) -> Self
    where
        S: Stage<T> + 'static,
    {
        self.pipe_shared(Arc::new(stage))
    }

    /// Return a new pipeline with an already shared stage appended
    pub fn pipe_shared(&self, stage: SharedStage<T>) -> Self {
        let mut stages = Vec::with_capacity(self.stages.len() + 1);
        stages.extend(self.stages.iter().cloned());
        stages.push(stage);

        Self {
            name: self.name.clone(),
            stages,
        }
    }

    /// Run the payload through every stage and return the result
    ///
    /// Stops right after a stage whose [`Stoppable`](super::Stoppable)
    /// capability reports `true` for that stage's output. An empty pipeline
    /// returns the payload unchanged. The first error aborts the run.
    pub fn process(&self, payload: T) -> PipelineResult<T> {
        self.drive(payload, None)
    }

    /// Same as [`process`](Pipeline::process), also recording each stage run
    pub fn execute(&self, payload: T) -> PipelineResult<PipelineRun<T>> {
        let started = Instant::now();
        let mut stage_records = Vec::with_capacity(self.stages.len());
        let payload = self.drive(payload, Some(&mut stage_records))?;

        Ok(PipelineRun {
            pipeline_name: self.name.clone(),
            payload,
            stage_records,
            stage_count: self.stages.len(),
            total_duration: started.elapsed(),
        })
    }

    fn drive(&self, mut payload: T, mut records: Option<&mut Vec<StageRecord>>) -> PipelineResult<T> {
        let total = self.stages.len();
        logger::clear_failure();

        for (index, stage) in self.stages.iter().enumerate() {
            pipeline_log!(
                LogLevel::Debug,
                "pipeline",
                "Executing stage {}/{}: {} (pipeline: {})",
                index + 1,
                total,
                stage.name(),
                self.name
            );

            let stage_start = Instant::now();
            payload = match stage.invoke(payload) {
                Ok(next) => {
                    logger::clear_failure();
                    next
                }
                Err(e) => {
                    // only the innermost pipeline reports at Error
                    logger::log_failure(
                        "pipeline",
                        &format!(
                            "Stage '{}' failed: {} (pipeline: {})",
                            stage.name(),
                            e,
                            self.name
                        ),
                    );
                    return Err(e);
                }
            };

            let stopped = stage
                .as_stoppable()
                .map_or(false, |stoppable| stoppable.should_stop(&payload));

            if let Some(records) = records.as_deref_mut() {
                records.push(StageRecord {
                    index,
                    stage_name: stage.name().to_string(),
                    duration: stage_start.elapsed(),
                    stopped,
                });
            }

            if stopped {
                pipeline_log!(
                    LogLevel::Debug,
                    "pipeline",
                    "Stage '{}' stopped the pipeline, skipping {} remaining (pipeline: {})",
                    stage.name(),
                    total - index - 1,
                    self.name
                );
                break;
            }
        }

        Ok(payload)
    }
}

impl<T> Stage<T> for Pipeline<T> {
    fn invoke(&self, payload: T) -> PipelineResult<T> {
        self.process(payload)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            stages: self.stages.clone(),
        }
    }
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage_names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &stage_names)
            .finish()
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder<T> {
    name: String,
    stages: Vec<SharedStage<T>>,
}

impl<T> PipelineBuilder<T> {
    /// Create a new pipeline builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Add a stage to the pipeline
    pub fn add_stage<S: Stage<T> + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Add a shared stage to the pipeline
    pub fn add_shared_stage(mut self, stage: SharedStage<T>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline<T> {
        Pipeline {
            name: self.name,
            stages: self.stages,
        }
    }
}

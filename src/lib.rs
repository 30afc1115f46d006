//! Composable, immutable payload pipelines.
//!
//! See the [`pipeline`](mod@pipeline) module for the execution model.

pub mod error;
pub mod logger;
pub mod pipeline;

pub use error::{BoxError, PipelineError, PipelineResult};
pub use pipeline::{
    stage, ConditionalStage, FnStage, Pipeline, PipelineBuilder, PipelineFactory, PipelineRun,
    SharedStage, Stage, StageExt, StageRecord, StopWhen, Stoppable, SwitchKey, SwitchStage,
    SwitchStageBuilder,
};

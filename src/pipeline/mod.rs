//! Pipeline pattern implementation for sequential payload transformations
//!
//! A [`Pipeline`] is an immutable, ordered list of [`Stage`]s. Processing a
//! payload feeds it through each stage in turn, the output of one becoming
//! the input of the next. Stages may branch ([`ConditionalStage`],
//! [`SwitchStage`]), nest (a pipeline is a stage), or end the run early by
//! exposing the [`Stoppable`] capability.
//!
//! # Example
//! ```
//! use pipewright::{stage, ConditionalStage, Pipeline};
//!
//! let pipeline = Pipeline::new()
//!     .pipe(stage(|n: i32| n + 1))
//!     .pipe(
//!         ConditionalStage::new(|n: &i32| *n > 5, stage(|n: i32| n * 10))
//!             .otherwise(stage(|n: i32| n * 2)),
//!     )
//!     .pipe(stage(|n: i32| n + 1));
//!
//! assert_eq!(pipeline.process(7).unwrap(), 81);
//! assert_eq!(pipeline.process(3).unwrap(), 9);
//! ```

pub mod core;
pub mod executor;
pub mod factory;
pub mod stages;

// Re-export main types
pub use core::{PipelineRun, SharedStage, Stage, StageExt, StageRecord, Stoppable};
pub use executor::{Pipeline, PipelineBuilder};
pub use factory::PipelineFactory;
pub use stages::{
    stage, ConditionalStage, FnStage, StopWhen, SwitchKey, SwitchStage, SwitchStageBuilder,
};

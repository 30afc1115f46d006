use super::core::SharedStage;
use super::executor::Pipeline;

/// Convenience constructor for pipelines
pub struct PipelineFactory;

impl PipelineFactory {
    /// Build a pipeline whose stages are exactly `stages`, in order
    pub fn build<T, I>(stages: I) -> Pipeline<T>
    where
        I: IntoIterator<Item = SharedStage<T>>,
    {
        Pipeline::from_stages(stages.into_iter().collect())
    }
}

/// Build a pipeline from a list of stages
///
/// # Example
/// ```
/// use pipewright::{pipeline, stage};
///
/// let p = pipeline![stage(|n: i32| n * 2), stage(|n: i32| n - 1)];
/// assert_eq!(p.process(3).unwrap(), 5);
/// ```
#[macro_export]
macro_rules! pipeline {
    () => {
        $crate::Pipeline::new()
    };
    ($($stage:expr),+ $(,)?) => {
        $crate::Pipeline::new()$(.pipe($stage))+
    };
}

use crate::error::{BoxError, PipelineError, PipelineResult};
use crate::pipeline::Stage;

type StageFn<T> = dyn Fn(T) -> PipelineResult<T> + Send + Sync;

/// Stage that delegates to a closure
///
/// # Example
/// ```
/// use pipewright::{stage, Pipeline};
///
/// let pipeline = Pipeline::new()
///     .pipe(stage(|n: i32| n * 2))
///     .pipe(stage(|n: i32| n - 1));
///
/// assert_eq!(pipeline.process(3).unwrap(), 5);
/// ```
pub struct FnStage<T> {
    name: String,
    callback: Box<StageFn<T>>,
}

impl<T> FnStage<T> {
    /// Wrap an infallible transformation
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self {
            name: "function".to_string(),
            callback: Box::new(move |payload: T| Ok(callback(payload))),
        }
    }

    /// Wrap a transformation that may fail
    ///
    /// The closure's error reaches the caller of `process` unchanged, inside
    /// [`PipelineError::Stage`].
    pub fn try_new<F, E>(callback: F) -> Self
    where
        F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: "function".to_string(),
            callback: Box::new(move |payload: T| callback(payload).map_err(PipelineError::stage)),
        }
    }

    /// Set the name reported in logs and run records
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<T> Stage<T> for FnStage<T> {
    fn invoke(&self, payload: T) -> PipelineResult<T> {
        (self.callback)(payload)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for FnStage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

/// Shorthand for [`FnStage::new`]
pub fn stage<T, F>(callback: F) -> FnStage<T>
where
    F: Fn(T) -> T + Send + Sync + 'static,
{
    FnStage::new(callback)
}

use crate::error::PipelineResult;
use crate::pipeline::{Stage, Stoppable};

type StopPredicate<T> = dyn Fn(&T) -> bool + Send + Sync;

/// Wraps a stage and gives it the [`Stoppable`] capability
///
/// The pipeline stops after this stage when `predicate` holds for the
/// stage's output, or when the wrapped stage itself asks to stop.
///
/// # Example
/// ```
/// use pipewright::{stage, Pipeline, StageExt};
///
/// let pipeline = Pipeline::new()
///     .pipe(stage(|n: i32| n + 5).stop_when(|n: &i32| *n > 6))
///     .pipe(stage(|n: i32| n + 100));
///
/// assert_eq!(pipeline.process(3).unwrap(), 8);
/// assert_eq!(pipeline.process(1).unwrap(), 106);
/// ```
pub struct StopWhen<T> {
    inner: Box<dyn Stage<T>>,
    predicate: Box<StopPredicate<T>>,
}

impl<T> StopWhen<T> {
    pub fn new<S, P>(inner: S, predicate: P) -> Self
    where
        S: Stage<T> + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(inner),
            predicate: Box::new(predicate),
        }
    }
}

impl<T> Stage<T> for StopWhen<T> {
    fn invoke(&self, payload: T) -> PipelineResult<T> {
        self.inner.invoke(payload)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn as_stoppable(&self) -> Option<&dyn Stoppable<T>> {
        Some(self)
    }
}

impl<T> Stoppable<T> for StopWhen<T> {
    fn should_stop(&self, payload: &T) -> bool {
        (self.predicate)(payload)
            || self
                .inner
                .as_stoppable()
                .map_or(false, |inner| inner.should_stop(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stages::stage;
    use crate::pipeline::StageExt;

    #[test]
    fn test_stop_when_delegates_invoke_and_name() {
        let wrapped = stage(|n: i32| n * 2).named("Double").stop_when(|n: &i32| *n > 10);

        assert_eq!(wrapped.invoke(4).unwrap(), 8);
        assert_eq!(wrapped.name(), "Double");
    }

    #[test]
    fn test_predicate_sees_output() {
        let wrapped = stage(|n: i32| n * 2).stop_when(|n: &i32| *n > 10);
        let stoppable = wrapped.as_stoppable().unwrap();

        assert!(!stoppable.should_stop(&10));
        assert!(stoppable.should_stop(&12));
    }

    #[test]
    fn test_inner_capability_is_kept() {
        let inner = stage(|n: i32| n).stop_when(|n: &i32| *n == 1);
        let outer = inner.stop_when(|n: &i32| *n == 2);
        let stoppable = outer.as_stoppable().unwrap();

        assert!(stoppable.should_stop(&1));
        assert!(stoppable.should_stop(&2));
        assert!(!stoppable.should_stop(&3));
    }
}

use crate::error::{BoxError, PipelineError, PipelineResult};
use crate::logger::{self, LogLevel};
use crate::pipeline::{SharedStage, Stage};
use crate::pipeline_log;
use serde_json::Value;
use std::sync::Arc;

use super::value_kind;

type Condition<T> = dyn Fn(&T) -> PipelineResult<Value> + Send + Sync;

/// Stage that runs one of two branches depending on a condition
///
/// The condition may return any value convertible into a
/// [`serde_json::Value`], but only an actual boolean is accepted. Anything
/// else (including `1` or `"true"`) fails with
/// [`PipelineError::NonBooleanCondition`].
///
/// Without a false branch, a `false` condition passes the payload through
/// unchanged.
///
/// # Example
/// ```
/// use pipewright::{stage, ConditionalStage, Stage};
///
/// let stage = ConditionalStage::new(|n: &i32| *n > 5, stage(|n: i32| n * 10))
///     .otherwise(stage(|n: i32| n * 2));
///
/// assert_eq!(stage.invoke(8).unwrap(), 80);
/// assert_eq!(stage.invoke(4).unwrap(), 8);
/// ```
pub struct ConditionalStage<T> {
    condition: Box<Condition<T>>,
    true_branch: SharedStage<T>,
    false_branch: Option<SharedStage<T>>,
}

impl<T> ConditionalStage<T> {
    /// Create a conditional stage with only a true branch
    pub fn new<C, V, S>(condition: C, true_branch: S) -> Self
    where
        C: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<Value>,
        S: Stage<T> + 'static,
    {
        Self {
            condition: Box::new(move |payload: &T| Ok(condition(payload).into())),
            true_branch: Arc::new(true_branch),
            false_branch: None,
        }
    }

    /// Create a conditional stage whose condition may fail
    pub fn try_new<C, V, E, S>(condition: C, true_branch: S) -> Self
    where
        C: Fn(&T) -> Result<V, E> + Send + Sync + 'static,
        V: Into<Value>,
        E: Into<BoxError>,
        S: Stage<T> + 'static,
    {
        Self {
            condition: Box::new(move |payload: &T| {
                condition(payload)
                    .map(Into::into)
                    .map_err(PipelineError::stage)
            }),
            true_branch: Arc::new(true_branch),
            false_branch: None,
        }
    }

    /// Set the branch taken when the condition is false
    pub fn otherwise<S>(mut self, false_branch: S) -> Self
    where
        S: Stage<T> + 'static,
    {
        self.false_branch = Some(Arc::new(false_branch));
        self
    }

    fn evaluate(&self, payload: &T) -> PipelineResult<bool> {
        match (self.condition)(payload)? {
            Value::Bool(verdict) => Ok(verdict),
            other => {
                let err = PipelineError::NonBooleanCondition {
                    found: value_kind(&other),
                };
                logger::log_failure(
                    "stage::conditional",
                    &format!("{} (condition returned {})", err, other),
                );
                Err(err)
            }
        }
    }
}

impl<T> Stage<T> for ConditionalStage<T> {
    fn invoke(&self, payload: T) -> PipelineResult<T> {
        logger::clear_failure();
        if self.evaluate(&payload)? {
            pipeline_log!(
                LogLevel::Debug,
                "stage::conditional",
                "Condition true, running '{}'",
                self.true_branch.name()
            );
            return self.true_branch.invoke(payload);
        }

        match &self.false_branch {
            Some(branch) => {
                pipeline_log!(
                    LogLevel::Debug,
                    "stage::conditional",
                    "Condition false, running '{}'",
                    branch.name()
                );
                branch.invoke(payload)
            }
            None => Ok(payload),
        }
    }

    fn name(&self) -> &str {
        "conditional"
    }
}

use crate::error::{BoxError, PipelineError, PipelineResult};
use crate::logger::{self, LogLevel};
use crate::pipeline::{SharedStage, Stage};
use crate::pipeline_log;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::value_kind;

type Selector<T> = dyn Fn(&T) -> PipelineResult<Value> + Send + Sync;

/// Branch key of a [`SwitchStage`]
///
/// String and integer keys never compare equal, even when they read the
/// same: `"1"` and `1` select different branches.
///
/// `UInt` only ever holds integers above `i64::MAX`; every conversion
/// normalizes smaller values to `Int`, so an integer has exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwitchKey {
    Str(String),
    Int(i64),
    UInt(u64),
}

impl fmt::Display for SwitchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchKey::Str(s) => write!(f, "{:?}", s),
            SwitchKey::Int(n) => write!(f, "{}", n),
            SwitchKey::UInt(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for SwitchKey {
    fn from(key: &str) -> Self {
        SwitchKey::Str(key.to_string())
    }
}

impl From<String> for SwitchKey {
    fn from(key: String) -> Self {
        SwitchKey::Str(key)
    }
}

impl From<i64> for SwitchKey {
    fn from(key: i64) -> Self {
        SwitchKey::Int(key)
    }
}

impl From<i32> for SwitchKey {
    fn from(key: i32) -> Self {
        SwitchKey::Int(key as i64)
    }
}

impl From<u32> for SwitchKey {
    fn from(key: u32) -> Self {
        SwitchKey::Int(key as i64)
    }
}

impl From<u64> for SwitchKey {
    fn from(key: u64) -> Self {
        match i64::try_from(key) {
            Ok(n) => SwitchKey::Int(n),
            Err(_) => SwitchKey::UInt(key),
        }
    }
}

impl TryFrom<&Value> for SwitchKey {
    type Error = PipelineError;

    /// Strings and integers are keys; floats (even `1.0`), booleans, null,
    /// arrays and objects are rejected.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(SwitchKey::Str(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(SwitchKey::Int)
                .or_else(|| n.as_u64().map(SwitchKey::from))
                .ok_or(PipelineError::InvalidSelector {
                    found: value_kind(value),
                }),
            other => Err(PipelineError::InvalidSelector {
                found: value_kind(other),
            }),
        }
    }
}

/// Stage that picks a branch by key
///
/// The selector maps the payload to a key. An exact match runs that branch;
/// otherwise the default branch runs if one is configured, and the payload
/// passes through unchanged if not.
///
/// # Example
/// ```
/// use pipewright::{stage, Stage, SwitchStage};
///
/// let switch = SwitchStage::builder(|n: &i64| if n % 2 == 0 { "even" } else { "odd" })
///     .case("even", stage(|n: i64| n / 2))
///     .case("odd", stage(|n: i64| 3 * n + 1))
///     .build();
///
/// assert_eq!(switch.invoke(10).unwrap(), 5);
/// assert_eq!(switch.invoke(5).unwrap(), 16);
/// ```
pub struct SwitchStage<T> {
    selector: Box<Selector<T>>,
    branches: HashMap<SwitchKey, SharedStage<T>>,
    default: Option<SharedStage<T>>,
}

impl<T> SwitchStage<T> {
    /// Start building a switch over an infallible selector
    pub fn builder<F, V>(selector: F) -> SwitchStageBuilder<T>
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        SwitchStageBuilder::new(Box::new(move |payload: &T| Ok(selector(payload).into())))
    }

    /// Start building a switch over a selector that may fail
    pub fn try_builder<F, V, E>(selector: F) -> SwitchStageBuilder<T>
    where
        F: Fn(&T) -> Result<V, E> + Send + Sync + 'static,
        V: Into<Value>,
        E: Into<BoxError>,
    {
        SwitchStageBuilder::new(Box::new(move |payload: &T| {
            selector(payload)
                .map(Into::into)
                .map_err(PipelineError::stage)
        }))
    }

    /// Number of keyed branches (the default is not counted)
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    fn select(&self, payload: &T) -> PipelineResult<SwitchKey> {
        let value = (self.selector)(payload)?;
        SwitchKey::try_from(&value).map_err(|err| {
            logger::log_failure(
                "stage::switch",
                &format!("{} (selector returned {})", err, value),
            );
            err
        })
    }
}

impl<T> Stage<T> for SwitchStage<T> {
    fn invoke(&self, payload: T) -> PipelineResult<T> {
        logger::clear_failure();
        let key = self.select(&payload)?;

        if let Some(branch) = self.branches.get(&key) {
            pipeline_log!(
                LogLevel::Debug,
                "stage::switch",
                "Key {} matched, running '{}'",
                key,
                branch.name()
            );
            return branch.invoke(payload);
        }

        match &self.default {
            Some(default) => {
                pipeline_log!(
                    LogLevel::Debug,
                    "stage::switch",
                    "Key {} unmatched, running default '{}'",
                    key,
                    default.name()
                );
                default.invoke(payload)
            }
            None => Ok(payload),
        }
    }

    fn name(&self) -> &str {
        "switch"
    }
}

/// Builder for [`SwitchStage`]
pub struct SwitchStageBuilder<T> {
    selector: Box<Selector<T>>,
    branches: HashMap<SwitchKey, SharedStage<T>>,
    default: Option<SharedStage<T>>,
}

impl<T> SwitchStageBuilder<T> {
    fn new(selector: Box<Selector<T>>) -> Self {
        Self {
            selector,
            branches: HashMap::new(),
            default: None,
        }
    }

    /// Add a branch; a repeated key replaces the earlier branch
    pub fn case<K, S>(mut self, key: K, branch: S) -> Self
    where
        K: Into<SwitchKey>,
        S: Stage<T> + 'static,
    {
        self.branches.insert(key.into(), Arc::new(branch));
        self
    }

    /// Add an already shared branch
    pub fn shared_case(mut self, key: impl Into<SwitchKey>, branch: SharedStage<T>) -> Self {
        self.branches.insert(key.into(), branch);
        self
    }

    /// Set the branch used when no key matches
    pub fn default<S>(mut self, branch: S) -> Self
    where
        S: Stage<T> + 'static,
    {
        self.default = Some(Arc::new(branch));
        self
    }

    /// Build the stage
    pub fn build(self) -> SwitchStage<T> {
        SwitchStage {
            selector: self.selector,
            branches: self.branches,
            default: self.default,
        }
    }
}

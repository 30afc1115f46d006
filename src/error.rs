use thiserror::Error;

/// Boxed error raised by a caller-supplied stage, condition or selector body
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Central error type for pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    // ============================================================================
    // Contract Violations
    // ============================================================================
    /// A conditional stage's condition produced something other than a boolean
    #[error("Condition must return a boolean")]
    NonBooleanCondition { found: &'static str },

    /// A switch stage's selector produced something other than a string or integer
    #[error("Selector must return a string or integer")]
    InvalidSelector { found: &'static str },

    // ============================================================================
    // Propagated Failures
    // ============================================================================
    /// Failure raised by a caller-supplied body, carried through unchanged
    #[error(transparent)]
    Stage(BoxError),

    #[error("{0}")]
    Message(String),
}

impl PipelineError {
    /// Wrap a caller's error so it can travel through `invoke`/`process`
    ///
    /// A `PipelineError` coming back from a nested stage is returned as is
    /// rather than wrapped a second time.
    pub fn stage(err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        match boxed.downcast::<PipelineError>() {
            Ok(inner) => *inner,
            Err(other) => PipelineError::Stage(other),
        }
    }

    /// True for the two violations owned by the core (condition / selector typing)
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PipelineError::NonBooleanCondition { .. } | PipelineError::InvalidSelector { .. }
        )
    }
}

// `?` on a serde_json result inside a stage carries the error through untouched
impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Stage(Box::new(err))
    }
}

// Automatic conversion from String
impl From<String> for PipelineError {
    fn from(err: String) -> Self {
        PipelineError::Message(err)
    }
}

// Automatic conversion from &str
impl From<&str> for PipelineError {
    fn from(err: &str) -> Self {
        PipelineError::Message(err.to_string())
    }
}

// Helper type alias for Results
pub type PipelineResult<T> = Result<T, PipelineError>;

//! Built-in stage variants
//!
//! 1. FnStage - wraps a caller-supplied transformation
//! 2. ConditionalStage - if/else over a boolean condition
//! 3. SwitchStage - multi-way branch keyed by string or integer
//! 4. StopWhen - adds the Stoppable capability to any stage

pub mod conditional;
pub mod function;
pub mod stop;
pub mod switch;

// Re-export stages
pub use conditional::ConditionalStage;
pub use function::{stage, FnStage};
pub use stop::StopWhen;
pub use switch::{SwitchKey, SwitchStage, SwitchStageBuilder};

use serde_json::Value;

/// Short type name used in contract-violation errors
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

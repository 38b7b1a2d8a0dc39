//! Execution limits

use super::RuntimeError;
use serde::Deserialize;

/// Limits applied to every invocation made through a [`crate::runtime::Store`]
///
/// Missing JSON fields take their default values:
///
/// ```rust
/// use wexec::runtime::ExecutionConfig;
///
/// let config = ExecutionConfig::from_json(r#"{ "max_call_depth": 64 }"#).unwrap();
/// assert_eq!(config.max_call_depth, 64);
/// assert_eq!(config.instruction_budget, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Maximum number of live frames; tail calls do not add frames
    pub max_call_depth: usize,
    /// Stop with `InstructionBudgetExhausted` after this many instructions
    pub instruction_budget: Option<u64>,
    /// Maximum operand stack height of a single frame
    pub max_operand_stack: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            max_call_depth: 10_000,
            instruction_budget: None,
            max_operand_stack: 65_536,
        }
    }
}

impl ExecutionConfig {
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        serde_json::from_str(json).map_err(|e| RuntimeError::InvalidConfig(e.to_string()))
    }
}

//! Outcome reporting for reconcile runs

use serde::{Deserialize, Serialize};

/// Kind of change performed on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Refresh,
    Import,
    Delete,
    /// Recorded state already matches the configuration
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Refresh => write!(f, "refresh"),
            ActionType::Import => write!(f, "import"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of reconciling a set of resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(
        &mut self,
        address: impl Into<String>,
        action_type: ActionType,
        message: impl Into<String>,
    ) {
        self.succeeded.push(ActionResult {
            address: address.into(),
            action_type,
            message: message.into(),
            error: None,
        });
    }

    pub fn add_failure(
        &mut self,
        address: impl Into<String>,
        action_type: ActionType,
        error: impl Into<String>,
    ) {
        self.failed.push(ActionResult {
            address: address.into(),
            action_type,
            message: String::new(),
            error: Some(error.into()),
        });
    }

    /// Successful actions of one type
    pub fn count(&self, action_type: ActionType) -> usize {
        self.succeeded
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged, {} failed",
            self.count(ActionType::Create),
            self.count(ActionType::Update),
            self.count(ActionType::Delete),
            self.count(ActionType::NoOp),
            self.failed.len()
        )
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Resource address (`type.label`)
    pub address: String,

    pub action_type: ActionType,

    pub message: String,

    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_result_summary() {
        let mut result = ApplyResult::new();
        result.add_success("t.a", ActionType::Create, "created");
        result.add_success("t.b", ActionType::NoOp, "unchanged");
        result.add_failure("t.c", ActionType::Update, "HTTP 409");

        assert!(!result.is_success());
        assert_eq!(
            result.to_string(),
            "1 created, 0 updated, 0 deleted, 1 unchanged, 1 failed"
        );
    }
}

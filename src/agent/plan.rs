//! Ordered step plans with a saturating cursor.

use serde::{Deserialize, Serialize};

/// A goal broken into ordered, human-readable steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// The goal this plan was derived from.
    pub goal: String,
    /// Step descriptions, in order.
    pub steps: Vec<String>,
    /// Index of the current step; equal to `steps.len()` once complete.
    current: usize,
}

impl Plan {
    /// Create a plan positioned at its first step.
    pub fn new(goal: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            goal: goal.into(),
            steps,
            current: 0,
        }
    }

    /// Index of the current step.
    pub fn cursor(&self) -> usize {
        self.current
    }

    /// The current step description, or `None` once complete.
    pub fn current_step(&self) -> Option<&str> {
        self.steps.get(self.current).map(String::as_str)
    }

    /// Whether every step has been passed.
    pub fn is_complete(&self) -> bool {
        self.current >= self.steps.len()
    }

    /// Move to the next step. Saturates at the end.
    pub fn advance(&mut self) {
        if self.current < self.steps.len() {
            self.current += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Clamp a cursor read from storage back into range.
    pub(crate) fn normalize(&mut self) {
        self.current = self.current.min(self.steps.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::new("open camera", vec!["find app".into(), "tap app".into()])
    }

    #[test]
    fn test_advance_saturates() {
        let mut plan = plan();
        assert_eq!(plan.current_step(), Some("find app"));

        for _ in 0..5 {
            plan.advance();
        }
        assert_eq!(plan.cursor(), 2);
        assert!(plan.is_complete());
        assert!(plan.current_step().is_none());
    }

    #[test]
    fn test_empty_plan_is_complete() {
        let mut plan = Plan::new("nothing", Vec::new());
        assert!(plan.is_complete());
        plan.advance();
        assert_eq!(plan.cursor(), 0);
    }

    #[test]
    fn test_normalize_clamps_cursor() {
        let json = r#"{"goal":"g","steps":["a"],"current":7}"#;
        let mut plan: Plan = serde_json::from_str(json).unwrap();
        plan.normalize();
        assert_eq!(plan.cursor(), 1);
    }
}

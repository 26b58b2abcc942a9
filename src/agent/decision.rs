//! Decision engines: turn a goal into a plan and a screen into an action.

use async_trait::async_trait;
use thiserror::Error;

use super::plan::Plan;
use crate::actions::{Action, ScrollDirection};
use crate::config::markers::{
    contains_any, COMPOSE_STEP, LOCATE_STEP, OPEN_MARKERS, SEND_MARKERS, SEND_STEP, TAP_STEP,
};
use crate::model::ModelError;
use crate::screen::{ElementKind, Observation, UiElement};

/// Decision errors. Only unexpected faults end up here; "nothing to do"
/// outcomes are returned as [`Action::Failed`].
#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Decision engine error: {0}")]
    Engine(String),
}

/// Produces plans and picks the next action.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// Break a goal into ordered steps.
    async fn plan(&self, goal: &str) -> Result<Plan, DecisionError>;

    /// Choose the next action for the current screen and plan position.
    async fn decide(&self, obs: &Observation, plan: &Plan) -> Result<Action, DecisionError>;
}

/// Deterministic keyword planner.
pub fn plan_from_goal(goal: &str) -> Plan {
    let steps: &[&str] = if contains_any(goal, OPEN_MARKERS) {
        &["find app", "tap app"]
    } else if contains_any(goal, SEND_MARKERS) {
        &["open messaging", "compose text", "send"]
    } else {
        &["analyze screen", "pick action"]
    };

    Plan::new(goal, steps.iter().map(|s| s.to_string()).collect())
}

/// The goal without its open/send verbs, e.g. "open Camera" gives "Camera".
pub fn target_phrase(goal: &str) -> String {
    let kept: Vec<&str> = goal
        .split_whitespace()
        .filter(|word| !contains_any(word, OPEN_MARKERS) && !contains_any(word, SEND_MARKERS))
        .collect();

    if kept.is_empty() {
        goal.trim().to_string()
    } else {
        kept.join(" ")
    }
}

/// Text to type for a compose step: the quoted part of the goal, else what
/// follows the first ':', else the target phrase.
pub fn compose_message(goal: &str) -> String {
    const QUOTES: &[(char, char)] = &[('"', '"'), ('“', '”'), ('«', '»'), ('\'', '\'')];

    for (open, close) in QUOTES {
        if let Some(start) = goal.find(*open) {
            let rest = &goal[start + open.len_utf8()..];
            if let Some(end) = rest.find(*close) {
                let quoted = rest[..end].trim();
                if !quoted.is_empty() {
                    return quoted.to_string();
                }
            }
        }
    }

    if let Some((_, after)) = goal.split_once(':') {
        let after = after.trim();
        if !after.is_empty() {
            return after.to_string();
        }
    }

    target_phrase(goal)
}

/// Keyword-driven engine that works without any model.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedEngine;

impl RuleBasedEngine {
    pub fn new() -> Self {
        Self
    }

    fn decide_sync(&self, obs: &Observation, plan: &Plan) -> Action {
        let Some(step) = plan.current_step() else {
            return Action::Completed;
        };
        let target = target_phrase(&plan.goal);

        if contains_any(step, LOCATE_STEP) {
            if let Some(element) = obs.find_by_text(&target) {
                return Action::Click {
                    bounds: element.bounds,
                };
            }
            return match obs.find_by_kind(ElementKind::Search) {
                Some(search) => Action::Click {
                    bounds: search.bounds,
                },
                None => Action::Scroll {
                    direction: ScrollDirection::Down,
                },
            };
        }

        if contains_any(step, TAP_STEP) {
            return match obs.find_by_text(&target) {
                Some(element) => Action::Click {
                    bounds: element.bounds,
                },
                None => Action::failed("target element not found"),
            };
        }

        if contains_any(step, COMPOSE_STEP) {
            return match obs.find_by_kind(ElementKind::Input) {
                Some(input) => Action::TypeText {
                    bounds: input.bounds,
                    text: compose_message(&plan.goal),
                },
                None => Action::failed("no input field found"),
            };
        }

        if contains_any(step, SEND_STEP) {
            // A real button wins over a label that merely mentions sending
            let labelled = |e: &&UiElement| SEND_MARKERS.iter().any(|m| e.matches_text(m));
            let button = obs
                .elements
                .iter()
                .filter(labelled)
                .find(|e| e.is_kind(ElementKind::Button))
                .or_else(|| obs.elements.iter().find(labelled));
            return match button {
                Some(element) => Action::Click {
                    bounds: element.bounds,
                },
                None => Action::failed("send button not found"),
            };
        }

        Action::Wait { millis: 1000 }
    }
}

#[async_trait]
impl DecisionEngine for RuleBasedEngine {
    async fn plan(&self, goal: &str) -> Result<Plan, DecisionError> {
        Ok(plan_from_goal(goal))
    }

    async fn decide(&self, obs: &Observation, plan: &Plan) -> Result<Action, DecisionError> {
        let action = self.decide_sync(obs, plan);
        tracing::debug!(
            "Step {:?} -> {}",
            plan.current_step().unwrap_or("<done>"),
            action
        );
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::Bounds;

    fn element(text: &str, class_name: &str, bounds: Bounds) -> UiElement {
        UiElement {
            id: String::new(),
            text: text.to_string(),
            label: String::new(),
            class_name: class_name.to_string(),
            bounds,
            clickable: true,
            editable: class_name.ends_with("EditText"),
            scrollable: false,
            visible: true,
        }
    }

    fn at_step(goal: &str, step: usize) -> Plan {
        let mut plan = plan_from_goal(goal);
        for _ in 0..step {
            plan.advance();
        }
        plan
    }

    #[test]
    fn test_plan_from_goal() {
        assert_eq!(plan_from_goal("open Camera").steps, vec!["find app", "tap app"]);
        assert_eq!(plan_from_goal("افتح الكاميرا").steps, vec!["find app", "tap app"]);
        assert_eq!(
            plan_from_goal("send hello to Sam").steps,
            vec!["open messaging", "compose text", "send"]
        );
        assert_eq!(
            plan_from_goal("check battery").steps,
            vec!["analyze screen", "pick action"]
        );
        // open wins over send
        assert_eq!(plan_from_goal("open and send").steps.len(), 2);
    }

    #[test]
    fn test_target_phrase() {
        assert_eq!(target_phrase("open Camera"), "Camera");
        assert_eq!(target_phrase("افتح الكاميرا"), "الكاميرا");
        assert_eq!(target_phrase("open"), "open");
    }

    #[test]
    fn test_compose_message() {
        assert_eq!(compose_message(r#"send "see you soon" to Sam"#), "see you soon");
        assert_eq!(compose_message("send to Sam: running late"), "running late");
        assert_eq!(compose_message("send hello"), "hello");
    }

    #[tokio::test]
    async fn test_completed_plan() {
        let engine = RuleBasedEngine::new();
        let plan = at_step("open Camera", 2);
        let action = engine.decide(&Observation::empty(), &plan).await.unwrap();
        assert_eq!(action, Action::Completed);
    }

    #[tokio::test]
    async fn test_locate_prefers_target_then_search_then_scroll() {
        let engine = RuleBasedEngine::new();
        let plan = plan_from_goal("open Camera");
        let camera = Bounds::new(0, 0, 100, 100);
        let search = Bounds::new(0, 200, 100, 300);

        let obs = Observation::new(vec![
            element("Search apps", "android.widget.EditText", search),
            element("Camera", "android.widget.TextView", camera),
        ]);
        assert_eq!(
            engine.decide(&obs, &plan).await.unwrap(),
            Action::Click { bounds: camera }
        );

        let obs = Observation::new(vec![element("Search apps", "android.widget.EditText", search)]);
        assert_eq!(
            engine.decide(&obs, &plan).await.unwrap(),
            Action::Click { bounds: search }
        );

        assert_eq!(
            engine.decide(&Observation::empty(), &plan).await.unwrap(),
            Action::Scroll {
                direction: ScrollDirection::Down
            }
        );
    }

    #[tokio::test]
    async fn test_arabic_open_goal() {
        let engine = RuleBasedEngine::new();
        let plan = plan_from_goal("افتح الكاميرا");
        assert_eq!(plan.steps, vec!["find app", "tap app"]);

        assert_eq!(
            engine.decide(&Observation::empty(), &plan).await.unwrap(),
            Action::Scroll {
                direction: ScrollDirection::Down
            }
        );

        let camera = Bounds::new(10, 10, 110, 110);
        let obs = Observation::new(vec![element("الكاميرا", "android.widget.TextView", camera)]);
        assert_eq!(
            engine.decide(&obs, &plan).await.unwrap(),
            Action::Click { bounds: camera }
        );
    }

    #[tokio::test]
    async fn test_tap_missing_target_fails() {
        let engine = RuleBasedEngine::new();
        let plan = at_step("open Camera", 1);
        let action = engine.decide(&Observation::empty(), &plan).await.unwrap();
        assert!(matches!(action, Action::Failed { .. }));
    }

    #[tokio::test]
    async fn test_compose_and_send() {
        let engine = RuleBasedEngine::new();
        let field = Bounds::new(0, 1800, 900, 1900);
        let send = Bounds::new(900, 1800, 1080, 1900);
        let obs = Observation::new(vec![
            element("", "android.widget.EditText", field),
            element("Send", "android.widget.Button", send),
        ]);

        let compose = at_step(r#"send "hi" to Sam"#, 1);
        assert_eq!(
            engine.decide(&obs, &compose).await.unwrap(),
            Action::TypeText {
                bounds: field,
                text: "hi".to_string()
            }
        );

        let send_step = at_step(r#"send "hi" to Sam"#, 2);
        assert_eq!(
            engine.decide(&obs, &send_step).await.unwrap(),
            Action::Click { bounds: send }
        );

        let no_input = engine.decide(&Observation::empty(), &compose).await.unwrap();
        assert_eq!(no_input, Action::failed("no input field found"));
    }

    #[tokio::test]
    async fn test_send_prefers_button_over_label() {
        let engine = RuleBasedEngine::new();
        let hint = Bounds::new(0, 100, 1080, 200);
        let send = Bounds::new(900, 1800, 1080, 1900);
        let mut label = element("Tap send when ready", "android.widget.TextView", hint);
        label.clickable = false;
        let obs = Observation::new(vec![
            label,
            element("Send", "android.widget.ImageButton", send),
        ]);

        let plan = at_step("send hello to Sam", 2);
        assert_eq!(
            engine.decide(&obs, &plan).await.unwrap(),
            Action::Click { bounds: send }
        );
    }

    #[tokio::test]
    async fn test_unknown_step_waits() {
        let engine = RuleBasedEngine::new();
        let plan = plan_from_goal("check battery");
        assert_eq!(
            engine.decide(&Observation::empty(), &plan).await.unwrap(),
            Action::Wait { millis: 1000 }
        );
    }
}

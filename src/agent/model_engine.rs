//! Decision engine backed by a remote chat model.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::decision::{plan_from_goal, DecisionEngine, DecisionError};
use super::plan::Plan;
use crate::actions::{parse_call, Action, Call, CallParseError, ScrollDirection};
use crate::config::get_system_prompt;
use crate::model::{MessageBuilder, ModelClient};
use crate::screen::{Bounds, Observation};

/// How many previous answers are replayed to the model as context.
const HISTORY_LEN: usize = 4;

/// Asks an OpenAI-compatible model for the next action.
///
/// Planning stays keyword based; only `decide` calls the model.
pub struct ModelDecisionEngine {
    client: ModelClient,
    lang: String,
    history: Mutex<Vec<(String, String)>>,
}

impl ModelDecisionEngine {
    pub fn new(client: ModelClient, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    fn build_messages(&self, obs: &Observation, plan: &Plan) -> Vec<Value> {
        let mut messages = vec![MessageBuilder::create_system_message(
            &get_system_prompt(&self.lang),
        )];

        if let Ok(history) = self.history.lock() {
            for (prompt, answer) in history.iter() {
                messages.push(MessageBuilder::create_user_message(prompt));
                messages.push(MessageBuilder::create_assistant_message(answer));
            }
        }

        messages.push(MessageBuilder::create_user_message(&user_prompt(
            obs, plan, &self.lang,
        )));
        messages
    }

    fn remember(&self, goal: &str, prompt: String, answer: String) {
        let Ok(mut history) = self.history.lock() else {
            return;
        };
        // History from a different goal is noise
        if history.first().is_some_and(|(p, _)| !p.contains(goal)) {
            history.clear();
        }
        history.push((prompt, answer));
        if history.len() > HISTORY_LEN {
            let excess = history.len() - HISTORY_LEN;
            history.drain(..excess);
        }
    }
}

fn user_prompt(obs: &Observation, plan: &Plan, lang: &str) -> String {
    format!(
        "Goal: {}\nCurrent step: {}\n\n{}",
        plan.goal,
        plan.current_step().unwrap_or("-"),
        obs.describe_indexed(lang)
    )
}

#[async_trait]
impl DecisionEngine for ModelDecisionEngine {
    async fn plan(&self, goal: &str) -> Result<Plan, DecisionError> {
        Ok(plan_from_goal(goal))
    }

    async fn decide(&self, obs: &Observation, plan: &Plan) -> Result<Action, DecisionError> {
        let messages = self.build_messages(obs, plan);
        let response = self.client.request(&messages).await?;

        if !response.thinking.is_empty() {
            tracing::debug!("Model reasoning: {}", response.thinking);
        }

        let action = match action_from_answer(&response.action, obs) {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!("Unusable model answer {:?}: {}", response.action, e);
                Action::failed(format!("unusable model answer: {}", e))
            }
        };

        self.remember(&plan.goal, user_prompt(obs, plan, &self.lang), response.action);
        Ok(action)
    }
}

/// Map a model call onto an [`Action`], resolving element indices against
/// the observation the model was shown.
pub fn action_from_answer(answer: &str, obs: &Observation) -> Result<Action, CallParseError> {
    let call = parse_call(answer)?;

    let action = match call.name.as_str() {
        "click" | "tap" => Action::Click {
            bounds: element_bounds(&call, obs)?,
        },
        "long_press" => Action::LongPress {
            bounds: element_bounds(&call, obs)?,
        },
        "type" => Action::TypeText {
            bounds: element_bounds(&call, obs)?,
            text: call.require("text")?.to_string(),
        },
        "scroll" | "swipe" => Action::Scroll {
            direction: call.require_parsed::<ScrollDirection>("direction")?,
        },
        "wait" => Action::Wait {
            millis: match call.arg("ms") {
                Some(_) => call.require_parsed("ms")?,
                None => 1000,
            },
        },
        "back" => Action::Back,
        "home" => Action::Home,
        "finish" => Action::Completed,
        "fail" => Action::failed(call.arg("message").unwrap_or("model gave up")),
        _ => return Err(CallParseError::InvalidFormat(answer.to_string())),
    };

    Ok(action)
}

fn element_bounds(call: &Call, obs: &Observation) -> Result<Bounds, CallParseError> {
    let index: usize = call.require_parsed("index")?;
    obs.elements
        .get(index)
        .map(|e| e.bounds)
        .ok_or_else(|| CallParseError::InvalidValue {
            name: "index".to_string(),
            value: index.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use crate::screen::UiElement;

    fn obs() -> Observation {
        let element = |text: &str, bounds: Bounds| UiElement {
            id: String::new(),
            text: text.to_string(),
            label: String::new(),
            class_name: "android.widget.Button".to_string(),
            bounds,
            clickable: true,
            editable: false,
            scrollable: false,
            visible: true,
        };
        Observation::new(vec![
            element("Camera", Bounds::new(0, 0, 100, 100)),
            element("Gallery", Bounds::new(0, 100, 100, 200)),
        ])
    }

    #[test]
    fn test_action_from_answer() {
        let obs = obs();
        assert_eq!(
            action_from_answer("click(index=1)", &obs).unwrap(),
            Action::Click {
                bounds: Bounds::new(0, 100, 100, 200)
            }
        );
        assert_eq!(
            action_from_answer(r#"type(index=0, text="hi, there")"#, &obs).unwrap(),
            Action::TypeText {
                bounds: Bounds::new(0, 0, 100, 100),
                text: "hi, there".to_string()
            }
        );
        assert_eq!(
            action_from_answer(r#"scroll(direction="UP")"#, &obs).unwrap(),
            Action::Scroll {
                direction: ScrollDirection::Up
            }
        );
        assert_eq!(
            action_from_answer("wait()", &obs).unwrap(),
            Action::Wait { millis: 1000 }
        );
        assert_eq!(
            action_from_answer("wait(ms=250)", &obs).unwrap(),
            Action::Wait { millis: 250 }
        );
        assert_eq!(action_from_answer("finish()", &obs).unwrap(), Action::Completed);
        assert_eq!(action_from_answer("back()", &obs).unwrap(), Action::Back);
        assert_eq!(
            action_from_answer(r#"fail(message="no such app")"#, &obs).unwrap(),
            Action::failed("no such app")
        );
    }

    #[test]
    fn test_action_from_answer_rejects_bad_calls() {
        let obs = obs();
        assert!(action_from_answer("click(index=9)", &obs).is_err());
        assert!(action_from_answer("dance()", &obs).is_err());
        assert!(action_from_answer("I think we should click", &obs).is_err());
        assert!(action_from_answer("type(index=0)", &obs).is_err());
    }

    #[test]
    fn test_prompt_lists_indexed_elements() {
        let engine = ModelDecisionEngine::new(ModelClient::new(ModelConfig::default()), "en");
        let messages = engine.build_messages(&obs(), &plan_from_goal("open Camera"));
        assert_eq!(messages.len(), 2);
        let user = messages[1]["content"].as_str().unwrap();
        assert!(user.contains("Goal: open Camera"));
        assert!(user.contains("Current step: find app"));
        assert!(user.contains("[1] Clickable button: Gallery"));
    }

    #[test]
    fn test_history_is_bounded_and_reset_per_goal() {
        let engine = ModelDecisionEngine::new(ModelClient::new(ModelConfig::default()), "en");
        let plan = plan_from_goal("open Camera");
        for i in 0..6 {
            engine.remember(&plan.goal, user_prompt(&obs(), &plan, "en"), format!("wait(ms={})", i));
        }
        assert_eq!(engine.history.lock().unwrap().len(), HISTORY_LEN);

        let other = plan_from_goal("check battery");
        engine.remember(&other.goal, user_prompt(&obs(), &other, "en"), "back()".into());
        assert_eq!(engine.history.lock().unwrap().len(), 1);
    }
}

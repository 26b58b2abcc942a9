//! In-crate fakes for the device and tree traits.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::actions::Action;
use crate::agent::{plan_from_goal, DecisionEngine, DecisionError, Plan};
use crate::device::{DeviceController, DeviceError, Gesture, GlobalAction, ScreenSize};
use crate::screen::{Bounds, Observation, UiNode, UiTreeSource};

/// Tree source that returns a fixed (replaceable) root.
pub struct StaticTree {
    root: Mutex<Option<UiNode>>,
    failure: Mutex<Option<String>>,
}

impl StaticTree {
    pub fn new(root: Option<UiNode>) -> Self {
        Self {
            root: Mutex::new(root),
            failure: Mutex::new(None),
        }
    }

    pub fn set_root(&self, root: Option<UiNode>) {
        *self.root.lock().unwrap() = root;
    }

    /// Make the next `root()` call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl UiTreeSource for StaticTree {
    async fn root(&self) -> Result<Option<UiNode>, DeviceError> {
        if let Some(message) = self.failure.lock().unwrap().take() {
            return Err(DeviceError::CommandFailed(message));
        }
        Ok(self.root.lock().unwrap().clone())
    }
}

/// A call received by [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Gesture(Gesture),
    SetText { bounds: Bounds, text: String },
    Global(GlobalAction),
}

/// Device that records every call and accepts all input.
pub struct RecordingDevice {
    calls: Mutex<Vec<DeviceCall>>,
    size: ScreenSize,
    reject: Mutex<bool>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            size: ScreenSize {
                width: 1080,
                height: 2400,
            },
            reject: Mutex::new(false),
        }
    }

    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.size = ScreenSize { width, height };
        self
    }

    /// Make every later gesture come back as rejected.
    pub fn reject_gestures(&self) {
        *self.reject.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceController for RecordingDevice {
    async fn dispatch_gesture(&self, gesture: &Gesture) -> Result<bool, DeviceError> {
        self.calls
            .lock()
            .unwrap()
            .push(DeviceCall::Gesture(gesture.clone()));
        Ok(!*self.reject.lock().unwrap())
    }

    async fn set_text(&self, node: &UiNode, text: &str) -> Result<bool, DeviceError> {
        self.calls.lock().unwrap().push(DeviceCall::SetText {
            bounds: node.bounds,
            text: text.to_string(),
        });
        Ok(true)
    }

    async fn global_action(&self, action: GlobalAction) -> Result<bool, DeviceError> {
        self.calls.lock().unwrap().push(DeviceCall::Global(action));
        Ok(true)
    }

    async fn screen_size(&self) -> Result<ScreenSize, DeviceError> {
        Ok(self.size)
    }
}

/// Decision engine that replays a fixed list of actions, then repeats the last.
pub struct ScriptedEngine {
    actions: Mutex<VecDeque<Action>>,
    last: Mutex<Action>,
    fail_decide: bool,
}

impl ScriptedEngine {
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            actions: Mutex::new(actions.into()),
            last: Mutex::new(Action::Wait { millis: 0 }),
            fail_decide: false,
        }
    }

    /// An engine whose `decide` always errors.
    pub fn failing() -> Self {
        Self {
            fail_decide: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    async fn plan(&self, goal: &str) -> Result<Plan, DecisionError> {
        Ok(plan_from_goal(goal))
    }

    async fn decide(&self, _obs: &Observation, _plan: &Plan) -> Result<Action, DecisionError> {
        if self.fail_decide {
            return Err(DecisionError::Engine("scripted failure".to_string()));
        }
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.actions.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

// Copyright 2025 ModerRAS
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Phone Pilot
//!
//! An observe-decide-act automation core for Android UI agents.
//!
//! Each iteration reads the accessibility tree into an [`Observation`], asks a
//! [`DecisionEngine`] for the next [`Action`], executes it on the device and
//! records the step in [`TaskMemory`], which persists the task after every
//! change and stops runaway repetition.
//!
//! Platform glue sits behind two traits, [`UiTreeSource`] and
//! [`DeviceController`]; the [`adb`] module implements both over ADB.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use phone_pilot::adb::{AdbConnection, AdbDevice};
//! use phone_pilot::{AgentConfig, AgentLoop, FileStore, RuleBasedEngine};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let device = Arc::new(AdbDevice::new(AdbConnection::new()));
//!
//!     let mut agent = AgentLoop::new(
//!         device.clone(),
//!         device,
//!         Box::new(RuleBasedEngine::new()),
//!         Box::new(FileStore::new("tasks")),
//!         AgentConfig::default(),
//!     );
//!
//!     let state = agent.run("open Camera").await?;
//!     println!("Finished in state {:?}", state);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod adb;
pub mod agent;
pub mod config;
pub mod device;
pub mod model;
pub mod screen;
pub mod settings;

#[cfg(test)]
mod testing;

pub use actions::{Action, ActionExecutor, ExecutorConfig, ScrollDirection};
pub use agent::{
    AgentCommand, AgentConfig, AgentError, AgentEvent, AgentHandle, AgentLoop, AgentState,
    DecisionEngine, DecisionError, FileStore, KeyValueStore, MemoryStore, ModelDecisionEngine,
    PerformanceStats, Plan, RuleBasedEngine, StopSignal, Task, TaskMemory, TaskStatus,
};
pub use device::{DeviceController, DeviceError, Gesture, GlobalAction, Point, ScreenSize};
pub use model::{ModelClient, ModelConfig, ModelResponse};
pub use screen::{Bounds, ElementKind, Observation, ScreenObserver, UiElement, UiNode, UiTreeSource};
pub use settings::{AppSettings, EngineKind};

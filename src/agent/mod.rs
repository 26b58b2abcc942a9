//! Agent module: planning, decisions, task memory and the orchestrating loop.

mod agent_loop;
mod decision;
mod loop_detector;
mod memory;
mod model_engine;
mod plan;
pub mod store;

pub use agent_loop::{
    AgentCommand, AgentConfig, AgentError, AgentEvent, AgentHandle, AgentLoop, AgentState,
    StopSignal,
};
pub use decision::{
    compose_message, plan_from_goal, target_phrase, DecisionEngine, DecisionError,
    RuleBasedEngine,
};
pub use loop_detector::{LoopDetector, StepFingerprint};
pub use memory::{
    ExecutionStep, MemoryError, PerformanceStats, Task, TaskMemory, TaskStatus, RECORD_VERSION,
    TASK_KEY,
};
pub use model_engine::{action_from_answer, ModelDecisionEngine};
pub use plan::Plan;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

//! Task state with write-through persistence and loop detection.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::loop_detector::LoopDetector;
use super::plan::Plan;
use super::store::KeyValueStore;
use crate::actions::Action;
use crate::screen::Observation;

/// Store key of the persisted task.
pub const TASK_KEY: &str = "current-task";

/// Version of the persisted record layout.
pub const RECORD_VERSION: u32 = 1;

/// Memory errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("No active task")]
    NoActiveTask,
    #[error("Loop detected: the last {window} steps repeat the {window} before them")]
    LoopDetected { window: usize },
    #[error("Invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Failed,
    Paused,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Terminal states never change; everything else may move anywhere.
    pub fn can_transition_to(self, _next: TaskStatus) -> bool {
        !self.is_terminal()
    }
}

/// One observe-decide-act iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub observation: Observation,
    pub success: bool,
    pub error: Option<String>,
}

/// A goal being worked on and everything done for it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub goal: String,
    pub plan: Plan,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub steps: Vec<ExecutionStep>,
}

impl Task {
    pub fn new(goal: impl Into<String>, plan: Plan) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            goal: goal.into(),
            plan,
            status: TaskStatus::InProgress,
            started_at: Utc::now(),
            ended_at: None,
            steps: Vec::new(),
        }
    }

    /// Time from start to end, or to now while unfinished.
    pub fn duration(&self) -> Duration {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or_default()
    }
}

/// Summary numbers for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceStats {
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    pub duration: Duration,
    /// `successful_steps / total_steps`, or 0 with no steps.
    pub success_rate: f64,
}

impl PerformanceStats {
    pub fn for_task(task: &Task) -> Self {
        let total_steps = task.steps.len();
        let successful_steps = task.steps.iter().filter(|s| s.success).count();
        let success_rate = if total_steps == 0 {
            0.0
        } else {
            successful_steps as f64 / total_steps as f64
        };

        Self {
            total_steps,
            successful_steps,
            failed_steps: total_steps - successful_steps,
            duration: task.duration(),
            success_rate,
        }
    }
}

#[derive(Serialize)]
struct RecordRef<'a> {
    version: u32,
    task: &'a Task,
}

#[derive(Deserialize)]
struct RawRecord {
    version: u32,
    task: Value,
}

/// Owns the current task and mirrors every change to a [`KeyValueStore`].
///
/// Store failures are logged and never surface to the caller; the in-memory
/// task stays authoritative.
pub struct TaskMemory {
    store: Box<dyn KeyValueStore>,
    task: Option<Task>,
    detector: LoopDetector,
}

impl TaskMemory {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_detector(store, LoopDetector::default())
    }

    pub fn with_detector(store: Box<dyn KeyValueStore>, detector: LoopDetector) -> Self {
        Self {
            store,
            task: None,
            detector,
        }
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Replace any previous task with a fresh one.
    pub fn start_task(&mut self, goal: &str, plan: Plan) -> &Task {
        let task = Task::new(goal, plan);
        tracing::info!("Started task {} for goal {:?}", task.id, task.goal);
        let task = self.task.insert(task);
        persist(self.store.as_ref(), task);
        task
    }

    /// Append a step, persist it, then check for a loop.
    pub fn record_step(
        &mut self,
        action: Action,
        observation: Observation,
        success: bool,
        error: Option<String>,
    ) -> Result<(), MemoryError> {
        let task = self.task.as_mut().ok_or(MemoryError::NoActiveTask)?;
        task.steps.push(ExecutionStep {
            timestamp: Utc::now(),
            action,
            observation,
            success,
            error,
        });
        persist(self.store.as_ref(), task);

        if self.detector.is_looping(&task.steps) {
            tracing::warn!("Task {} is repeating itself", task.id);
            return Err(MemoryError::LoopDetected {
                window: self.detector.window(),
            });
        }
        Ok(())
    }

    pub fn update_status(&mut self, status: TaskStatus) -> Result<(), MemoryError> {
        let task = self.task.as_mut().ok_or(MemoryError::NoActiveTask)?;
        if !task.status.can_transition_to(status) {
            return Err(MemoryError::InvalidTransition {
                from: task.status,
                to: status,
            });
        }

        task.status = status;
        if status.is_terminal() {
            task.ended_at = Some(Utc::now());
        }
        persist(self.store.as_ref(), task);
        Ok(())
    }

    /// Move the plan cursor forward (saturating).
    pub fn advance_step(&mut self) -> Result<(), MemoryError> {
        let task = self.task.as_mut().ok_or(MemoryError::NoActiveTask)?;
        task.plan.advance();
        persist(self.store.as_ref(), task);
        Ok(())
    }

    /// Load the persisted task. Missing, unreadable or newer records count
    /// as absent.
    pub fn restore(&mut self) -> Option<&Task> {
        let content = match self.store.get(TASK_KEY) {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read persisted task: {}", e);
                return None;
            }
        };

        let mut task = match decode_record(&content) {
            Ok(task) => task,
            Err(reason) => {
                tracing::warn!("Ignoring persisted task: {}", reason);
                return None;
            }
        };
        task.plan.normalize();

        tracing::info!(
            "Restored task {} ({:?}, {} steps)",
            task.id,
            task.status,
            task.steps.len()
        );
        self.task = Some(task);
        self.task.as_ref()
    }

    /// Forget the task and delete its record.
    pub fn clear(&mut self) {
        self.task = None;
        if let Err(e) = self.store.remove(TASK_KEY) {
            tracing::warn!("Failed to remove persisted task: {}", e);
        }
    }

    pub fn performance_stats(&self) -> Option<PerformanceStats> {
        self.task.as_ref().map(PerformanceStats::for_task)
    }
}

fn persist(store: &dyn KeyValueStore, task: &Task) {
    let record = RecordRef {
        version: RECORD_VERSION,
        task,
    };
    let result = serde_json::to_string(&record)
        .map_err(|e| e.to_string())
        .and_then(|json| store.put(TASK_KEY, &json).map_err(|e| e.to_string()));

    if let Err(e) = result {
        tracing::warn!("Failed to persist task {}: {}", task.id, e);
    }
}

fn decode_record(content: &str) -> Result<Task, String> {
    let raw: RawRecord = serde_json::from_str(content).map_err(|e| e.to_string())?;
    if raw.version > RECORD_VERSION {
        return Err(format!("record version {} is newer than {}", raw.version, RECORD_VERSION));
    }
    serde_json::from_value(raw.task).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ScrollDirection;
    use crate::agent::plan_from_goal;
    use crate::agent::store::{MemoryStore, StoreError};
    use crate::screen::{Bounds, UiElement};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
    }

    fn memory(store: &MemoryStore) -> TaskMemory {
        TaskMemory::new(Box::new(store.clone()))
    }

    #[test]
    fn test_persistence_round_trip() {
        let store = MemoryStore::new();
        let mut mem = memory(&store);
        mem.start_task("open Camera", plan_from_goal("open Camera"));
        mem.advance_step().unwrap();
        mem.record_step(Action::Back, Observation::empty(), true, None)
            .unwrap();
        mem.update_status(TaskStatus::Paused).unwrap();
        let saved = mem.current_task().cloned().unwrap();

        let mut fresh = memory(&store);
        let restored = fresh.restore().cloned().unwrap();
        assert_eq!(restored, saved);
        assert_eq!(restored.plan.cursor(), 1);

        let raw: Value = serde_json::from_str(&store.get(TASK_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["version"], 1);
        assert_eq!(raw["task"]["status"], "paused");
    }

    fn screen_with(texts: &[&str]) -> Observation {
        let elements = texts
            .iter()
            .enumerate()
            .map(|(i, text)| UiElement {
                id: format!("item_{}", i),
                text: text.to_string(),
                label: String::new(),
                class_name: "android.widget.TextView".to_string(),
                bounds: Bounds::new(0, i as i32 * 100, 1080, i as i32 * 100 + 90),
                clickable: true,
                editable: false,
                scrollable: false,
                visible: true,
            })
            .collect();
        Observation::new(elements)
    }

    #[test]
    fn test_round_trip_with_no_steps() {
        let store = MemoryStore::new();
        let mut mem = memory(&store);
        let saved = mem
            .start_task("check battery", plan_from_goal("check battery"))
            .clone();

        let restored = memory(&store).restore().cloned().unwrap();
        assert_eq!(restored, saved);
        assert!(restored.steps.is_empty());
        assert_eq!(restored.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_round_trip_keeps_nested_observations() {
        let store = MemoryStore::new();
        let mut mem = memory(&store);
        mem.start_task("open Camera", plan_from_goal("open Camera"));

        let camera = Bounds::new(0, 100, 1080, 190);
        let steps = vec![
            (
                Action::Scroll {
                    direction: ScrollDirection::Down,
                },
                screen_with(&["Clock", "Maps"]),
            ),
            (
                Action::Click { bounds: camera },
                screen_with(&["Clock", "Camera", "الكاميرا"]),
            ),
            (Action::failed("target element not found"), screen_with(&[])),
            (Action::Completed, screen_with(&["Shutter"])),
        ];
        for (action, obs) in steps {
            let error = match &action {
                Action::Failed { message } => Some(message.clone()),
                _ => None,
            };
            mem.record_step(action, obs, error.is_none(), error).unwrap();
            mem.advance_step().unwrap();
        }
        let saved = mem.current_task().cloned().unwrap();

        let restored = memory(&store).restore().cloned().unwrap();
        assert_eq!(restored, saved);
        assert_eq!(restored.steps.len(), 4);
        assert_eq!(restored.steps[1].observation.elements[2].text, "الكاميرا");
        assert_eq!(restored.steps[1].observation.elements[1].bounds, camera);
        assert_eq!(
            restored.steps[2].error.as_deref(),
            Some("target element not found")
        );
        assert_eq!(restored.plan.cursor(), restored.plan.len());
    }

    #[test]
    fn test_restore_ignores_corrupt_and_newer_records() {
        let store = MemoryStore::new();
        store.put(TASK_KEY, "{not json").unwrap();
        assert!(memory(&store).restore().is_none());

        let mut mem = memory(&store);
        mem.start_task("g", plan_from_goal("g"));
        let mut raw: Value =
            serde_json::from_str(&store.get(TASK_KEY).unwrap().unwrap()).unwrap();
        raw["version"] = Value::from(RECORD_VERSION + 1);
        store.put(TASK_KEY, &raw.to_string()).unwrap();
        assert!(memory(&store).restore().is_none());

        assert!(memory(&MemoryStore::new()).restore().is_none());
    }

    #[test]
    fn test_status_transitions() {
        let mut mem = memory(&MemoryStore::new());
        assert_eq!(
            mem.update_status(TaskStatus::Completed),
            Err(MemoryError::NoActiveTask)
        );

        mem.start_task("g", plan_from_goal("g"));
        mem.update_status(TaskStatus::Paused).unwrap();
        mem.update_status(TaskStatus::InProgress).unwrap();
        mem.update_status(TaskStatus::Completed).unwrap();
        assert!(mem.current_task().unwrap().ended_at.is_some());

        assert_eq!(
            mem.update_status(TaskStatus::InProgress),
            Err(MemoryError::InvalidTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::InProgress
            })
        );
    }

    #[test]
    fn test_record_step_detects_loop() {
        let mut mem = TaskMemory::with_detector(Box::new(MemoryStore::new()), LoopDetector::new(2));
        assert_eq!(
            mem.record_step(Action::Back, Observation::empty(), true, None),
            Err(MemoryError::NoActiveTask)
        );

        mem.start_task("g", plan_from_goal("g"));
        for _ in 0..3 {
            mem.record_step(Action::Wait { millis: 10 }, Observation::empty(), true, None)
                .unwrap();
        }
        assert_eq!(
            mem.record_step(Action::Wait { millis: 10 }, Observation::empty(), true, None),
            Err(MemoryError::LoopDetected { window: 2 })
        );
        // The looping step is still recorded
        assert_eq!(mem.current_task().unwrap().steps.len(), 4);
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let mut mem = TaskMemory::new(Box::new(BrokenStore));
        mem.start_task("g", plan_from_goal("g"));
        mem.record_step(Action::Back, Observation::empty(), false, Some("x".into()))
            .unwrap();
        mem.advance_step().unwrap();
        assert!(mem.restore().is_none());
        mem.clear();
        assert!(mem.current_task().is_none());
    }

    #[test]
    fn test_performance_stats() {
        let mut mem = memory(&MemoryStore::new());
        assert!(mem.performance_stats().is_none());

        mem.start_task("g", plan_from_goal("g"));
        assert_eq!(mem.performance_stats().unwrap().success_rate, 0.0);

        mem.record_step(Action::Back, Observation::empty(), true, None)
            .unwrap();
        mem.record_step(Action::Home, Observation::empty(), false, None)
            .unwrap();
        let stats = mem.performance_stats().unwrap();
        assert_eq!(stats.total_steps, 2);
        assert_eq!(stats.failed_steps, 1);
        assert_eq!(stats.success_rate, 0.5);
    }

    #[test]
    fn test_clear_removes_record() {
        let store = MemoryStore::new();
        let mut mem = memory(&store);
        mem.start_task("g", plan_from_goal("g"));
        mem.clear();
        assert!(store.get(TASK_KEY).unwrap().is_none());
        assert!(mem.current_task().is_none());
    }
}

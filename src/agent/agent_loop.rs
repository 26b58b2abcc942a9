//! The observe-decide-act loop and its command/event surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use super::decision::{DecisionEngine, DecisionError};
use super::loop_detector::LoopDetector;
use super::memory::{MemoryError, PerformanceStats, Task, TaskMemory, TaskStatus};
use super::store::KeyValueStore;
use crate::actions::{Action, ActionExecutor, ExecutorConfig};
use crate::device::{DeviceController, DeviceError};
use crate::screen::{ScreenObserver, UiTreeSource};

/// Lifecycle of the loop itself (as opposed to the task it works on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Running,
    Completed,
    Failed,
    Paused,
}

/// Agent errors.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Goal must not be empty")]
    EmptyGoal,
    #[error("A task is already running")]
    AlreadyRunning,
    #[error("No paused task to resume")]
    NotPaused,
    #[error("Agent loop has shut down")]
    ChannelClosed,
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Decision(#[from] DecisionError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Notifications emitted by the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The task reached Completed or Failed.
    TaskCompleted {
        task_id: String,
        status: TaskStatus,
        success_rate: f64,
        duration: Duration,
    },
    /// Something went wrong during a step.
    Error { message: String },
}

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Pause before every iteration so the UI can settle.
    pub step_delay: Duration,
    /// Fail the task after this many recorded steps.
    pub max_steps: usize,
    /// Fail the task once this loop has driven it for this long.
    pub max_duration: Option<Duration>,
    /// Loop detection window; 0 disables detection.
    pub loop_window: usize,
    /// Language for screen descriptions and messages.
    pub lang: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(1000),
            max_steps: 50,
            max_duration: None,
            loop_window: 3,
            lang: "en".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn with_loop_window(mut self, window: usize) -> Self {
        self.loop_window = window;
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

/// Requests a cooperative stop from outside the loop.
///
/// The flag is checked at the top of an iteration and again after the
/// inter-step delay; an action already being executed is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the collaborators and drives one task at a time.
pub struct AgentLoop {
    observer: ScreenObserver,
    engine: Box<dyn DecisionEngine>,
    executor: ActionExecutor,
    memory: TaskMemory,
    config: AgentConfig,
    state: AgentState,
    stop: StopSignal,
    started: Option<Instant>,
    active_before: Duration,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

impl AgentLoop {
    pub fn new(
        tree: Arc<dyn UiTreeSource>,
        device: Arc<dyn DeviceController>,
        engine: Box<dyn DecisionEngine>,
        store: Box<dyn KeyValueStore>,
        config: AgentConfig,
    ) -> Self {
        let detector = LoopDetector::new(config.loop_window);
        Self {
            observer: ScreenObserver::new(tree.clone()),
            engine,
            executor: ActionExecutor::new(device, tree),
            memory: TaskMemory::with_detector(store, detector),
            config,
            state: AgentState::Idle,
            stop: StopSignal::default(),
            started: None,
            active_before: Duration::ZERO,
            events: None,
        }
    }

    /// Replace executor timings.
    pub fn with_executor_config(self, executor_config: ExecutorConfig) -> Self {
        let tree = self.observer.source().clone();
        let device = self.executor.device().clone();
        Self {
            executor: ActionExecutor::with_config(device, tree, executor_config),
            ..self
        }
    }

    /// Send [`AgentEvent`]s to `tx`.
    pub fn with_event_sender(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.memory.current_task()
    }

    pub fn performance_stats(&self) -> Option<PerformanceStats> {
        self.memory.performance_stats()
    }

    /// A handle that can request a stop while [`run`](Self::run) is awaited.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Plan `goal` and open a new task.
    pub async fn start(&mut self, goal: &str) -> Result<(), AgentError> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(AgentError::EmptyGoal);
        }
        if self.state == AgentState::Running {
            tracing::warn!("Ignoring start of {:?}: a task is already running", goal);
            return Err(AgentError::AlreadyRunning);
        }

        let plan = self.engine.plan(goal).await?;
        tracing::info!("Planned {:?}: {:?}", goal, plan.steps);
        self.memory.start_task(goal, plan);
        self.started = Some(Instant::now());
        self.active_before = Duration::ZERO;
        self.stop.reset();
        self.state = AgentState::Running;
        Ok(())
    }

    /// Start `goal` and iterate until the loop leaves Running.
    pub async fn run(&mut self, goal: &str) -> Result<AgentState, AgentError> {
        self.start(goal).await?;
        Ok(self.run_to_end().await)
    }

    /// Iterate the current task until the loop leaves Running.
    pub async fn run_to_end(&mut self) -> AgentState {
        while self.state == AgentState::Running {
            if self.stop.is_requested() {
                self.stop();
                break;
            }
            self.step().await;
        }
        self.state
    }

    /// Running pauses the task; any other state goes back to Idle.
    pub fn stop(&mut self) -> AgentState {
        self.stop.reset();
        match self.state {
            AgentState::Running => {
                if let Err(e) = self.memory.update_status(TaskStatus::Paused) {
                    tracing::warn!("Could not pause task: {}", e);
                }
                if let Some(started) = self.started.take() {
                    self.active_before += started.elapsed();
                }
                tracing::info!("Task paused");
                self.state = AgentState::Paused;
            }
            _ => self.state = AgentState::Idle,
        }
        self.state
    }

    /// Continue a paused task.
    pub fn resume(&mut self) -> Result<(), AgentError> {
        if self.state != AgentState::Paused {
            return Err(AgentError::NotPaused);
        }
        self.memory.update_status(TaskStatus::InProgress)?;
        self.started = Some(Instant::now());
        self.stop.reset();
        self.state = AgentState::Running;
        tracing::info!("Task resumed");
        Ok(())
    }

    /// Forget the current task, including its persisted record.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.started = None;
        self.active_before = Duration::ZERO;
        self.stop.reset();
        self.state = AgentState::Idle;
    }

    /// Load the persisted task. An unfinished task comes back Paused so it
    /// can be resumed.
    pub fn restore(&mut self) -> Option<&Task> {
        let status = self.memory.restore()?.status;
        if status.is_terminal() {
            self.state = AgentState::Idle;
        } else {
            if let Err(e) = self.memory.update_status(TaskStatus::Paused) {
                tracing::warn!("Could not pause restored task: {}", e);
            }
            self.state = AgentState::Paused;
        }
        self.memory.current_task()
    }

    /// Run one iteration. Faults are handled here: the task fails and the
    /// error is reported as an event.
    pub async fn step(&mut self) -> AgentState {
        if self.state != AgentState::Running {
            return self.state;
        }
        if let Err(e) = self.iterate().await {
            tracing::error!("Step failed: {}", e);
            self.fail_task(e.to_string());
        }
        self.state
    }

    async fn iterate(&mut self) -> Result<(), AgentError> {
        if self.stop.is_requested() {
            return Ok(());
        }
        sleep(self.config.step_delay).await;
        if self.stop.is_requested() {
            return Ok(());
        }

        let observation = self.observer.observe().await?;
        let plan = self
            .memory
            .current_task()
            .map(|t| t.plan.clone())
            .ok_or(MemoryError::NoActiveTask)?;

        let action = self.engine.decide(&observation, &plan).await?;
        tracing::debug!(
            "Step {:?}: {} ({} elements on screen)",
            plan.current_step().unwrap_or("<done>"),
            action,
            observation.len()
        );

        let success = self.executor.execute(&action).await?;
        let error = match &action {
            Action::Failed { message } => Some(message.clone()),
            _ if !success => Some(format!("{} was not carried out", action)),
            _ => None,
        };

        match self
            .memory
            .record_step(action.clone(), observation, success, error.clone())
        {
            Ok(()) => {}
            Err(e @ MemoryError::LoopDetected { .. }) => {
                self.fail_task(e.to_string());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(message) = error {
            self.fail_task(message);
        } else if action == Action::Completed {
            self.complete_task();
        } else {
            self.memory.advance_step()?;
            self.check_limits();
        }
        Ok(())
    }

    fn check_limits(&mut self) {
        let steps = self.memory.current_task().map_or(0, |t| t.steps.len());
        if steps >= self.config.max_steps {
            self.fail_task(format!("Exceeded max steps ({})", self.config.max_steps));
            return;
        }

        if let Some(max) = self.config.max_duration {
            if self.active_time() >= max {
                self.fail_task(format!("Exceeded max duration ({:?})", max));
            }
        }
    }

    /// Time spent Running; paused stretches do not count.
    fn active_time(&self) -> Duration {
        self.active_before + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    fn complete_task(&mut self) {
        if let Err(e) = self.memory.update_status(TaskStatus::Completed) {
            tracing::warn!("Could not complete task: {}", e);
        }
        self.state = AgentState::Completed;
        tracing::info!("Task completed");
        self.emit_completion();
    }

    fn fail_task(&mut self, message: String) {
        if let Err(e) = self.memory.update_status(TaskStatus::Failed) {
            tracing::warn!("Could not fail task: {}", e);
        }
        self.state = AgentState::Failed;
        tracing::error!("Task failed: {}", message);
        self.emit(AgentEvent::Error { message });
        self.emit_completion();
    }

    fn emit_completion(&self) {
        let Some(task) = self.memory.current_task() else {
            return;
        };
        let stats = PerformanceStats::for_task(task);
        self.emit(AgentEvent::TaskCompleted {
            task_id: task.id.clone(),
            status: task.status,
            success_rate: stats.success_rate,
            duration: stats.duration,
        });
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
    }

    async fn apply(&mut self, command: AgentCommand) {
        let result = match command {
            AgentCommand::Start(goal) => self.start(&goal).await,
            AgentCommand::Stop => {
                self.stop();
                Ok(())
            }
            AgentCommand::Resume => self.resume(),
            AgentCommand::Clear => {
                self.clear();
                Ok(())
            }
        };

        if let Err(e) = result {
            self.emit(AgentEvent::Error {
                message: e.to_string(),
            });
        }
    }

    /// Move the loop onto a tokio task and control it through the handle.
    pub fn spawn(mut self) -> AgentHandle {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<AgentCommand>();
        let (state_tx, state_rx) = watch::channel(self.state);
        let shutdown = CancellationToken::new();
        let stop = self.stop.clone();

        let token = shutdown.clone();
        let join = tokio::spawn(async move {
            loop {
                // Commands queued during the last iteration go first
                while let Ok(command) = command_rx.try_recv() {
                    self.apply(command).await;
                    state_tx.send_replace(self.state);
                }

                if token.is_cancelled() {
                    break;
                }

                if self.state == AgentState::Running {
                    if self.stop.is_requested() {
                        self.stop();
                    } else {
                        self.step().await;
                    }
                } else {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        command = command_rx.recv() => match command {
                            Some(command) => self.apply(command).await,
                            None => break,
                        },
                    }
                }
                state_tx.send_replace(self.state);
            }

            if self.state == AgentState::Running {
                self.stop();
                state_tx.send_replace(self.state);
            }
            tracing::info!("Agent loop shut down");
        });

        AgentHandle {
            commands: command_tx,
            stop,
            state: state_rx,
            shutdown,
            join: Arc::new(tokio::sync::Mutex::new(Some(join))),
        }
    }
}

/// Commands accepted by a spawned loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    Start(String),
    Stop,
    Resume,
    Clear,
}

/// Controls a loop started with [`AgentLoop::spawn`].
#[derive(Clone)]
pub struct AgentHandle {
    commands: mpsc::UnboundedSender<AgentCommand>,
    stop: StopSignal,
    state: watch::Receiver<AgentState>,
    shutdown: CancellationToken,
    join: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl AgentHandle {
    fn send(&self, command: AgentCommand) -> Result<(), AgentError> {
        self.commands
            .send(command)
            .map_err(|_| AgentError::ChannelClosed)
    }

    pub fn start(&self, goal: impl Into<String>) -> Result<(), AgentError> {
        self.send(AgentCommand::Start(goal.into()))
    }

    /// Pause the running task once the current iteration ends, or return
    /// to Idle when nothing is running.
    pub fn stop(&self) -> Result<(), AgentError> {
        self.send(AgentCommand::Stop)
    }

    /// The loop's stop flag. Raising it pauses a running task without
    /// going through the command queue.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn resume(&self) -> Result<(), AgentError> {
        self.send(AgentCommand::Resume)
    }

    pub fn clear(&self) -> Result<(), AgentError> {
        self.send(AgentCommand::Clear)
    }

    /// Latest published state.
    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// Wait until the published state satisfies `pred`.
    pub async fn wait_for(
        &self,
        pred: impl FnMut(&AgentState) -> bool,
    ) -> Result<AgentState, AgentError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(pred)
            .await
            .map_err(|_| AgentError::ChannelClosed)?;
        Ok(*state)
    }

    /// Stop the loop task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(join) = self.join.lock().await.take() {
            if let Err(e) = join.await {
                tracing::warn!("Agent loop task ended abnormally: {}", e);
            }
        }
    }
}

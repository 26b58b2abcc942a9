//! Persisted settings for the phone-pilot CLI.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::actions::ExecutorConfig;
use crate::agent::AgentConfig;
use crate::model::ModelConfig;

/// Settings errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot determine config directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which decision engine drives the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Keyword rules, no network.
    Rules,
    /// OpenAI-compatible chat model.
    Model,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "rule" => Ok(Self::Rules),
            "model" | "llm" => Ok(Self::Model),
            other => Err(format!("Unknown engine: {}", other)),
        }
    }
}

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Model API base URL
    pub base_url: String,
    /// Model API key
    pub api_key: String,
    /// Model name
    pub model_name: String,
    /// Maximum retries for model requests
    pub max_retries: u32,
    /// Retry delay in seconds
    pub retry_delay: u64,
    /// ADB device ID (optional)
    pub device_id: String,
    /// ADB binary
    pub adb_path: String,
    /// Language code ("en" or "ar")
    pub lang: String,
    /// Decision engine
    pub engine: EngineKind,
    /// Maximum steps per task
    pub max_steps: usize,
    /// Maximum task duration in seconds, 0 for unlimited
    pub max_duration_secs: u64,
    /// Delay before each step in milliseconds
    pub step_delay_ms: u64,
    /// Loop detection window, 0 to disable
    pub loop_window: usize,
    /// Delay between focusing an input and typing, in milliseconds
    pub focus_delay_ms: u64,
    /// Task store directory; empty for the platform data directory
    pub store_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        let agent = AgentConfig::default();
        let model = ModelConfig::default();
        Self {
            base_url: model.base_url,
            api_key: model.api_key,
            model_name: model.model_name,
            max_retries: model.max_retries,
            retry_delay: model.retry_delay_secs,
            device_id: String::new(),
            adb_path: "adb".to_string(),
            lang: agent.lang,
            engine: EngineKind::Rules,
            max_steps: agent.max_steps,
            max_duration_secs: 0,
            step_delay_ms: agent.step_delay.as_millis() as u64,
            loop_window: agent.loop_window,
            focus_delay_ms: ExecutorConfig::default().focus_delay.as_millis() as u64,
            store_dir: String::new(),
        }
    }
}

impl AppSettings {
    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "moderras", "phone-pilot")
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        let loaded: Self = Self::settings_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        loaded.backfilled()
    }

    /// Fill empty fields left by older config files.
    fn backfilled(mut self) -> Self {
        let defaults = Self::default();
        if self.base_url.is_empty() {
            self.base_url = defaults.base_url;
        }
        if self.model_name.is_empty() {
            self.model_name = defaults.model_name;
        }
        if self.adb_path.is_empty() {
            self.adb_path = defaults.adb_path;
        }
        if self.lang.is_empty() {
            self.lang = defaults.lang;
        }
        if self.max_steps == 0 {
            self.max_steps = defaults.max_steps;
        }
        self
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), SettingsError> {
        let dir = Self::config_dir().ok_or(SettingsError::NoConfigDir)?;
        fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(dir.join("settings.json"), content)?;
        Ok(())
    }

    /// Override fields from environment variables.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = var(key).filter(|v| !v.trim().is_empty()) {
                *target = value;
            }
        };
        set(&mut self.device_id, "ADB_DEVICE_ID");
        set(&mut self.adb_path, "ADB_PATH");
        set(&mut self.lang, "AGENT_LANG");
        set(&mut self.base_url, "MODEL_BASE_URL");
        set(&mut self.api_key, "MODEL_API_KEY");
        set(&mut self.model_name, "MODEL_NAME");

        if let Some(engine) = var("AGENT_ENGINE") {
            match engine.parse() {
                Ok(kind) => self.engine = kind,
                Err(e) => tracing::warn!("Ignoring AGENT_ENGINE: {}", e),
            }
        }
        if let Some(delay) = var("AGENT_STEP_DELAY_MS").and_then(|v| v.trim().parse().ok()) {
            self.step_delay_ms = delay;
        }
        if let Some(steps) = var("AGENT_MAX_STEPS").and_then(|v| v.trim().parse().ok()) {
            self.max_steps = steps;
        }
    }

    pub fn to_agent_config(&self) -> AgentConfig {
        let config = AgentConfig::default()
            .with_step_delay(Duration::from_millis(self.step_delay_ms))
            .with_max_steps(self.max_steps)
            .with_loop_window(self.loop_window)
            .with_lang(self.lang.clone());
        if self.max_duration_secs > 0 {
            config.with_max_duration(Duration::from_secs(self.max_duration_secs))
        } else {
            config
        }
    }

    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig::default()
            .with_base_url(self.base_url.clone())
            .with_api_key(self.api_key.clone())
            .with_model_name(self.model_name.clone())
            .with_max_retries(self.max_retries)
            .with_retry_delay(self.retry_delay)
    }

    pub fn to_executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default().with_focus_delay(Duration::from_millis(self.focus_delay_ms))
    }

    /// Directory for persisted tasks.
    pub fn task_store_dir(&self) -> Option<PathBuf> {
        if !self.store_dir.is_empty() {
            return Some(PathBuf::from(&self.store_dir));
        }
        Self::project_dirs().map(|dirs| dirs.data_dir().join("tasks"))
    }
}

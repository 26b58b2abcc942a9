//! Configuration module for the agent: messages, keyword tables and prompts.

mod i18n;
pub mod markers;
mod prompts;

pub use i18n::{get_messages, Messages};
pub use markers::SEARCH_MARKERS;
pub use prompts::{get_system_prompt, SYSTEM_PROMPT_AR, SYSTEM_PROMPT_EN};

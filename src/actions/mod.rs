//! Actions: what the agent decides to do and how it is carried out.

mod action;
pub mod call;
mod executor;

pub use action::{Action, ScrollDirection};
pub use call::{parse_call, Call, CallParseError};
pub use executor::{ActionExecutor, ExecutorConfig};

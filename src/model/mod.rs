//! Model client module for remote chat inference.

mod client;

pub use client::{
    parse_response, MessageBuilder, ModelClient, ModelConfig, ModelError, ModelResponse,
};

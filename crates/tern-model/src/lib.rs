//! tern-model: model-facing types and streaming
//!
//! This crate defines the message/content data model shared by the agent
//! runtime, the streamed chunk types a model client yields, and one concrete
//! SSE client for Anthropic-Messages-style endpoints.

pub mod anthropic;
pub mod error;
pub mod stream;
pub mod types;

pub use anthropic::AnthropicClient;
pub use error::{ApiError, Result};
pub use stream::{ModelClient, ModelStream, StreamChunk};
pub use types::{ContentBlock, Message, ModelInfo, Role, Usage};

//! Streaming chunk types and the model client seam

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::error::Result;
use crate::types::{Message, ModelInfo};

/// Chunks yielded by a streaming model call.
///
/// Chunks arrive in order and the stream terminates; no other transport
/// assumptions are made.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Visible assistant text
    Text { text: String },
    /// Reasoning/thinking text
    Reasoning { reasoning: String },
    /// Usage reading for the request so far
    Usage {
        input_tokens: u32,
        output_tokens: u32,
        cache_read_tokens: u32,
    },
}

/// A stream of chunks from one model call
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// A streaming LLM client.
///
/// The runtime core consumes this trait; the HTTP implementation lives behind
/// it and can be swapped for a mock in tests.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// The model this client talks to
    fn info(&self) -> &ModelInfo;

    /// Open a streaming completion call
    async fn stream(&self, system_prompt: &str, messages: &[Message]) -> Result<ModelStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_roundtrip() {
        let chunk = StreamChunk::Usage {
            input_tokens: 10,
            output_tokens: 5,
            cache_read_tokens: 0,
        };
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"type\":\"usage\""));
        let back: StreamChunk = serde_json::from_str(&json).unwrap();
        match back {
            StreamChunk::Usage { input_tokens, .. } => assert_eq!(input_tokens, 10),
            other => panic!("expected usage chunk, got {:?}", other),
        }
    }
}

//! Anthropic-Messages-style SSE client
//!
//! One concrete `ModelClient`. The runtime core only depends on the trait, so
//! hosts can substitute any provider with the same chunk semantics.

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::stream::{ModelClient, ModelStream, StreamChunk};
use crate::types::{ContentBlock, Message, ModelInfo, Role, Usage};

/// Anthropic API client
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    info: ModelInfo,
}

impl AnthropicClient {
    /// Create a new client with an API key
    pub fn new(api_key: impl Into<String>, info: ModelInfo) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            info,
        }
    }

    /// Create from the ANTHROPIC_API_KEY environment variable
    pub fn from_env(info: ModelInfo) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| ApiError::Auth("ANTHROPIC_API_KEY is not set".into()))?;
        Ok(Self::new(api_key, info))
    }

    fn build_request(&self, system_prompt: &str, messages: &[Message]) -> WireRequest {
        WireRequest {
            model: self.info.id.clone(),
            max_tokens: self.info.max_tokens,
            stream: true,
            system: system_prompt.to_string(),
            messages: messages.iter().map(convert_message).collect(),
        }
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn stream(&self, system_prompt: &str, messages: &[Message]) -> Result<ModelStream> {
        let request = self.build_request(system_prompt, messages);
        let url = format!("{}/v1/messages", self.info.base_url);

        tracing::debug!("model request to {}", url);

        let builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .json(&request);

        let mut es = EventSource::new(builder)
            .map_err(|e| ApiError::Transport(format!("failed to open event source: {}", e)))?;

        // Poll until the connection opens so status errors surface at call
        // time, where the retry policy wraps them.
        loop {
            match es.next().await {
                Some(Ok(Event::Open)) => break,
                Some(Ok(Event::Message(_))) => break,
                Some(Err(e)) => return Err(map_es_error(e)),
                None => {
                    return Err(ApiError::UnexpectedResponse(
                        "stream closed before opening".into(),
                    ));
                }
            }
        }

        let stream: ModelStream = Box::pin(stream! {
            let mut usage = Usage::default();

            while let Some(event) = es.next().await {
                match event {
                    Ok(Event::Open) => {}
                    Ok(Event::Message(msg)) => match msg.event.as_str() {
                        "message_start" => {
                            if let Ok(data) = serde_json::from_str::<MessageStart>(&msg.data) {
                                usage.input_tokens = data.message.usage.input_tokens;
                                usage.output_tokens = data.message.usage.output_tokens;
                                usage.cache_read_tokens =
                                    data.message.usage.cache_read_input_tokens.unwrap_or(0);
                                yield Ok(StreamChunk::Usage {
                                    input_tokens: usage.input_tokens,
                                    output_tokens: usage.output_tokens,
                                    cache_read_tokens: usage.cache_read_tokens,
                                });
                            }
                        }
                        "content_block_delta" => {
                            if let Ok(data) = serde_json::from_str::<BlockDelta>(&msg.data) {
                                match data.delta {
                                    Delta::TextDelta { text } => {
                                        yield Ok(StreamChunk::Text { text });
                                    }
                                    Delta::ThinkingDelta { thinking } => {
                                        yield Ok(StreamChunk::Reasoning { reasoning: thinking });
                                    }
                                    Delta::Other => {}
                                }
                            }
                        }
                        "message_delta" => {
                            if let Ok(data) = serde_json::from_str::<MessageDelta>(&msg.data) {
                                usage.output_tokens = data.usage.output_tokens;
                                yield Ok(StreamChunk::Usage {
                                    input_tokens: usage.input_tokens,
                                    output_tokens: usage.output_tokens,
                                    cache_read_tokens: usage.cache_read_tokens,
                                });
                            }
                        }
                        "message_stop" => {
                            break;
                        }
                        "error" => {
                            yield Err(ApiError::UnexpectedResponse(msg.data.clone()));
                            break;
                        }
                        _ => {}
                    },
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(e) => {
                        yield Err(map_es_error(e));
                        break;
                    }
                }
            }
        });

        Ok(stream)
    }
}

fn map_es_error(e: reqwest_eventsource::Error) -> ApiError {
    match e {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let code = status.as_u16();
            match code {
                429 => ApiError::RateLimit {
                    status: code,
                    retry_after: retry_after_header(response.headers()),
                },
                401 | 403 => ApiError::Auth(format!("status {}", code)),
                _ => ApiError::Status {
                    status: code,
                    message: status.canonical_reason().unwrap_or("error").to_string(),
                },
            }
        }
        reqwest_eventsource::Error::Transport(e) => ApiError::from(e),
        other => ApiError::Transport(other.to_string()),
    }
}

/// Read `retry-after` or `x-ratelimit-reset` as a raw number. The retry
/// policy decides whether the value is a delta or an absolute epoch.
fn retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<f64> {
    for name in ["retry-after", "x-ratelimit-reset"] {
        if let Some(v) = headers.get(name) {
            if let Ok(s) = v.to_str() {
                if let Ok(n) = s.trim().parse::<f64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}

// --- Wire format ---

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    stream: bool,
    system: String,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<WireBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

/// Tool calls and results ride in plain text on this wire, so every block
/// lowers to text or image.
fn convert_message(msg: &Message) -> WireMessage {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };
    let content = msg
        .content
        .iter()
        .map(|block| match block {
            ContentBlock::Text { text } => WireBlock::Text { text: text.clone() },
            ContentBlock::Image { media_type, data } => WireBlock::Image {
                source: ImageSource {
                    source_type: "base64",
                    media_type: media_type.clone(),
                    data: data.clone(),
                },
            },
            ContentBlock::ToolUse { name, input, .. } => WireBlock::Text {
                text: format!("{}({})", name, input),
            },
            ContentBlock::ToolResult { content, .. } => WireBlock::Text {
                text: content.clone(),
            },
        })
        .collect();
    WireMessage { role, content }
}

#[derive(Debug, Deserialize)]
struct MessageStart {
    message: MessageStartInner,
}

#[derive(Debug, Deserialize)]
struct MessageStartInner {
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    usage: DeltaUsage,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    #[serde(default)]
    output_tokens: u32,
}

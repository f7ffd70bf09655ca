//! Core types for model interactions

use serde::{Deserialize, Serialize};

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// Content types in messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },
    /// Image content (base64 encoded)
    Image { media_type: String, data: String },
    /// Tool call request
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Tool result
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

impl ContentBlock {
    /// Create text content
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create image content from base64 data
    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Get text if this is text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A message in the conversation history.
///
/// Messages are immutable once appended; any later rewriting is expressed
/// as overlays kept outside the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message with a single text block
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create a user message with multiple content blocks
    pub fn user_with_content(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    /// Create an assistant message with a single text block
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Whether this is an assistant message
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Get combined text content
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Total characters across all content blocks
    pub fn char_count(&self) -> usize {
        self.content
            .iter()
            .map(|c| match c {
                ContentBlock::Text { text } => text.len(),
                ContentBlock::Image { data, .. } => data.len(),
                ContentBlock::ToolUse { input, .. } => input.to_string().len(),
                ContentBlock::ToolResult { content, .. } => content.len(),
            })
            .sum()
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: u32,
}

impl Usage {
    /// Total tokens counted against the context window
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens
    }

    /// Add another usage reading into this one
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier (e.g., "claude-sonnet-4-5-20250929")
    pub id: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Context window size in tokens
    pub context_window: u32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Whether the model accepts image input
    pub supports_images: bool,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, context_window: u32) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            context_window,
            max_tokens: 8192,
            supports_images: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_joins_blocks() {
        let msg = Message::user_with_content(vec![
            ContentBlock::text("a"),
            ContentBlock::image("image/png", "xxxx"),
            ContentBlock::text("b"),
        ]);
        assert_eq!(msg.text(), "ab");
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::user_with_content(vec![
            ContentBlock::text("hello"),
            ContentBlock::ToolResult {
                tool_use_id: "t1".into(),
                content: "ok".into(),
            },
        ]);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn test_history_roundtrip_identity() {
        let history = vec![
            Message::user("task"),
            Message::assistant("I'll read the file"),
            Message::user_with_content(vec![ContentBlock::text("[read_file] Result:\nfoo")]),
        ];
        let json = serde_json::to_string(&history).unwrap();
        let back: Vec<Message> = serde_json::from_str(&json).unwrap();
        assert_eq!(history, back);
    }

    #[test]
    fn test_usage_total_and_add() {
        let mut u = Usage {
            input_tokens: 100,
            output_tokens: 20,
            cache_read_tokens: 50,
        };
        assert_eq!(u.total(), 170);
        u.add(&Usage {
            input_tokens: 1,
            output_tokens: 2,
            cache_read_tokens: 3,
        });
        assert_eq!(u.total(), 176);
    }
}

//! Tool registry and dispatch
//!
//! A name-keyed map of handlers with uniform pre-execution validation. An
//! unknown name produces an error result, not a panic, so the orchestrator
//! can feed a descriptive tool result back to the model.

use std::collections::HashMap;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{BoxedTool, ToolContext, ToolResponse};
use crate::validator::{check_command, check_path, first_missing_param};

/// Immutable-after-init map from tool name to handler
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<ToolName, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Idempotent by name: the first registration wins.
    pub fn register(&mut self, tool: BoxedTool) {
        self.handlers.entry(tool.name()).or_insert(tool);
    }

    /// Look up a handler by name
    pub fn get(&self, name: ToolName) -> Option<&BoxedTool> {
        self.handlers.get(&name)
    }

    /// Registered tool names, in wire order
    pub fn names(&self) -> Vec<ToolName> {
        ToolName::ALL
            .iter()
            .filter(|n| self.handlers.contains_key(n))
            .copied()
            .collect()
    }

    /// Render tool documentation for the system prompt. Deterministic: tools
    /// appear in wire order regardless of registration order.
    pub fn tool_docs(&self) -> String {
        let mut out = String::new();
        for name in self.names() {
            let tool = &self.handlers[&name];
            out.push_str(&format!(
                "## {}\n{}\nUsage:\n{}\n\n",
                name,
                tool.description(),
                tool.usage()
            ));
        }
        out
    }

    /// Validate and run one tool block.
    ///
    /// Required-parameter misses bump the consecutive-mistake counter; the
    /// path and command checks run before any handler regardless of the
    /// host's auto-approval policy.
    pub async fn dispatch(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let Some(handler) = self.handlers.get(&block.name) else {
            return ToolResponse::error(format!(
                "Unknown tool '{}'. It is not available in this session; use one of the documented tools.",
                block.name
            ));
        };

        if let Some(missing) = first_missing_param(block, handler.required_params()) {
            ctx.state.lock().consecutive_mistake_count += 1;
            return ToolResponse::error(format!(
                "Missing value for required parameter '{}' in tool '{}'. Retry with the complete parameters.\n\nUsage:\n{}",
                missing,
                block.name,
                handler.usage()
            ));
        }

        if let Some(path) = block.param(ParamName::Path) {
            if let Err(e) = check_path(path) {
                return ToolResponse::error(e.to_string());
            }
        }
        if let Some(command) = block.param(ParamName::Command) {
            if let Err(e) = check_command(command) {
                return ToolResponse::error(e.to_string());
            }
        }

        ctx.state.lock().consecutive_mistake_count = 0;

        handler.execute(block, ctx).await
    }
}

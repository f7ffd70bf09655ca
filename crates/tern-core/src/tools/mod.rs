//! Built-in tool handlers

mod ask;
mod complete;
mod definitions;
mod execute;
mod interact;
mod list;
mod read;
mod replace;
mod search;
mod web_fetch;
mod write;

pub use ask::AskFollowupTool;
pub use complete::AttemptCompletionTool;
pub use definitions::ListDefinitionsTool;
pub use execute::ExecuteCommandTool;
pub use interact::{
    CompressConversationTool, FocusChainTool, NewTaskTool, PlanModeRespondTool, SummarizeTaskTool,
};
pub use list::ListFilesTool;
pub use read::ReadFileTool;
pub use replace::ReplaceInFileTool;
pub use search::SearchFilesTool;
pub use web_fetch::WebFetchTool;
pub use write::WriteToFileTool;

use std::sync::Arc;

use crate::registry::ToolRegistry;

/// A registry loaded with every bundled handler
pub fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadFileTool));
    registry.register(Arc::new(WriteToFileTool));
    registry.register(Arc::new(ReplaceInFileTool));
    registry.register(Arc::new(ExecuteCommandTool));
    registry.register(Arc::new(SearchFilesTool));
    registry.register(Arc::new(ListFilesTool));
    registry.register(Arc::new(ListDefinitionsTool));
    registry.register(Arc::new(AskFollowupTool));
    registry.register(Arc::new(AttemptCompletionTool));
    registry.register(Arc::new(PlanModeRespondTool));
    registry.register(Arc::new(NewTaskTool));
    registry.register(Arc::new(CompressConversationTool));
    registry.register(Arc::new(SummarizeTaskTool));
    registry.register(Arc::new(FocusChainTool));
    registry.register(Arc::new(WebFetchTool));
    registry
}

//! Closed tool and parameter name sets
//!
//! The wire format is XML-like tags, so both sets are fixed enums with a tag
//! table each. The parser precomputes opening/closing tag strings from these.

use serde::{Deserialize, Serialize};

/// Tools the model may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ReadFile,
    WriteToFile,
    ReplaceInFile,
    ExecuteCommand,
    SearchFiles,
    ListFiles,
    ListCodeDefinitionNames,
    AskFollowupQuestion,
    AttemptCompletion,
    PlanModeRespond,
    NewTask,
    CompressConversation,
    SummarizeTask,
    WebFetch,
    UseMcpTool,
    AccessMcpResource,
    LoadMcpDocumentation,
    BrowserAction,
    FocusChain,
}

impl ToolName {
    pub const ALL: &'static [ToolName] = &[
        ToolName::ReadFile,
        ToolName::WriteToFile,
        ToolName::ReplaceInFile,
        ToolName::ExecuteCommand,
        ToolName::SearchFiles,
        ToolName::ListFiles,
        ToolName::ListCodeDefinitionNames,
        ToolName::AskFollowupQuestion,
        ToolName::AttemptCompletion,
        ToolName::PlanModeRespond,
        ToolName::NewTask,
        ToolName::CompressConversation,
        ToolName::SummarizeTask,
        ToolName::WebFetch,
        ToolName::UseMcpTool,
        ToolName::AccessMcpResource,
        ToolName::LoadMcpDocumentation,
        ToolName::BrowserAction,
        ToolName::FocusChain,
    ];

    /// The wire tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ReadFile => "read_file",
            ToolName::WriteToFile => "write_to_file",
            ToolName::ReplaceInFile => "replace_in_file",
            ToolName::ExecuteCommand => "execute_command",
            ToolName::SearchFiles => "search_files",
            ToolName::ListFiles => "list_files",
            ToolName::ListCodeDefinitionNames => "list_code_definition_names",
            ToolName::AskFollowupQuestion => "ask_followup_question",
            ToolName::AttemptCompletion => "attempt_completion",
            ToolName::PlanModeRespond => "plan_mode_respond",
            ToolName::NewTask => "new_task",
            ToolName::CompressConversation => "compress_conversation",
            ToolName::SummarizeTask => "summarize_task",
            ToolName::WebFetch => "web_fetch",
            ToolName::UseMcpTool => "use_mcp_tool",
            ToolName::AccessMcpResource => "access_mcp_resource",
            ToolName::LoadMcpDocumentation => "load_mcp_documentation",
            ToolName::BrowserAction => "browser_action",
            ToolName::FocusChain => "focus_chain",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters a tool block may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamName {
    Path,
    Content,
    Diff,
    Command,
    RequiresApproval,
    Timeout,
    Recursive,
    Regex,
    FilePattern,
    Question,
    Options,
    Response,
    Result,
    Context,
    Title,
    Url,
    Action,
    Coordinate,
    Text,
    ServerName,
    ToolName,
    Arguments,
    Uri,
    TaskProgress,
    Mode,
    Target,
    Selector,
    Checklist,
    Lines,
    Query,
}

impl ParamName {
    pub const ALL: &'static [ParamName] = &[
        ParamName::Path,
        ParamName::Content,
        ParamName::Diff,
        ParamName::Command,
        ParamName::RequiresApproval,
        ParamName::Timeout,
        ParamName::Recursive,
        ParamName::Regex,
        ParamName::FilePattern,
        ParamName::Question,
        ParamName::Options,
        ParamName::Response,
        ParamName::Result,
        ParamName::Context,
        ParamName::Title,
        ParamName::Url,
        ParamName::Action,
        ParamName::Coordinate,
        ParamName::Text,
        ParamName::ServerName,
        ParamName::ToolName,
        ParamName::Arguments,
        ParamName::Uri,
        ParamName::TaskProgress,
        ParamName::Mode,
        ParamName::Target,
        ParamName::Selector,
        ParamName::Checklist,
        ParamName::Lines,
        ParamName::Query,
    ];

    /// The wire tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::Path => "path",
            ParamName::Content => "content",
            ParamName::Diff => "diff",
            ParamName::Command => "command",
            ParamName::RequiresApproval => "requires_approval",
            ParamName::Timeout => "timeout",
            ParamName::Recursive => "recursive",
            ParamName::Regex => "regex",
            ParamName::FilePattern => "file_pattern",
            ParamName::Question => "question",
            ParamName::Options => "options",
            ParamName::Response => "response",
            ParamName::Result => "result",
            ParamName::Context => "context",
            ParamName::Title => "title",
            ParamName::Url => "url",
            ParamName::Action => "action",
            ParamName::Coordinate => "coordinate",
            ParamName::Text => "text",
            ParamName::ServerName => "server_name",
            ParamName::ToolName => "tool_name",
            ParamName::Arguments => "arguments",
            ParamName::Uri => "uri",
            ParamName::TaskProgress => "task_progress",
            ParamName::Mode => "mode",
            ParamName::Target => "target",
            ParamName::Selector => "selector",
            ParamName::Checklist => "checklist",
            ParamName::Lines => "lines",
            ParamName::Query => "query",
        }
    }
}

impl std::fmt::Display for ParamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_tags_unique() {
        let mut seen = std::collections::HashSet::new();
        for t in ToolName::ALL {
            assert!(seen.insert(t.as_str()), "duplicate tag {}", t);
        }
    }

    #[test]
    fn test_param_tags_unique() {
        let mut seen = std::collections::HashSet::new();
        for p in ParamName::ALL {
            assert!(seen.insert(p.as_str()), "duplicate tag {}", p);
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&ToolName::ReadFile).unwrap();
        assert_eq!(json, "\"read_file\"");
        let json = serde_json::to_string(&ParamName::FilePattern).unwrap();
        assert_eq!(json, "\"file_pattern\"");
    }
}

//! Assistant message parser
//!
//! Converts a streamed, possibly truncated assistant string containing free
//! text and XML-like tool blocks into a typed block sequence. Single pass
//! over the input; the final block carries `partial = true` when its closing
//! tag has not arrived. Malformed input never errors: the parser yields what
//! it can and marks the tail partial.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::names::{ParamName, ToolName};

/// A run of free text between tool blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub content: String,
    pub partial: bool,
}

/// A parsed tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUseBlock {
    pub name: ToolName,
    pub params: HashMap<ParamName, String>,
    pub partial: bool,
}

impl ToolUseBlock {
    /// Get a parameter value
    pub fn param(&self, name: ParamName) -> Option<&str> {
        self.params.get(&name).map(|s| s.as_str())
    }
}

/// One block of parsed assistant output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantContent {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
}

impl AssistantContent {
    pub fn is_partial(&self) -> bool {
        match self {
            AssistantContent::Text(t) => t.partial,
            AssistantContent::ToolUse(t) => t.partial,
        }
    }
}

static TOOL_OPEN_TAGS: LazyLock<Vec<(String, ToolName)>> = LazyLock::new(|| {
    ToolName::ALL
        .iter()
        .map(|t| (format!("<{}>", t.as_str()), *t))
        .collect()
});

static PARAM_OPEN_TAGS: LazyLock<Vec<(String, ParamName)>> = LazyLock::new(|| {
    ParamName::ALL
        .iter()
        .map(|p| (format!("<{}>", p.as_str()), *p))
        .collect()
});

/// Parse a complete-so-far assistant message into content blocks.
///
/// Every tag of interest ends in `>`, so the scan only does suffix checks at
/// `>` positions, keeping the pass O(n) over the input.
pub fn parse_assistant_message(input: &str) -> Vec<AssistantContent> {
    let mut blocks: Vec<AssistantContent> = Vec::new();

    let mut text_start = 0usize;
    let mut current_tool: Option<ToolName> = None;
    let mut params: HashMap<ParamName, String> = HashMap::new();
    let mut tool_start = 0usize;
    let mut tool_close_tag = String::new();
    let mut current_param: Option<ParamName> = None;
    let mut param_start = 0usize;
    let mut param_close_tag = String::new();

    for (idx, ch) in input.char_indices() {
        if ch != '>' {
            continue;
        }
        let end = idx + 1;
        let seen = &input[..end];

        if let Some(tool) = current_tool {
            if let Some(param) = current_param {
                // Inside a parameter value only its own closing tag matters;
                // anything else, including other tags, is content.
                if seen.ends_with(&param_close_tag) {
                    let raw = &input[param_start..end - param_close_tag.len()];
                    params.insert(param, raw.trim().to_string());
                    current_param = None;
                }
                continue;
            }

            // A parameter opening tag wins over text accumulation.
            if let Some(param) = PARAM_OPEN_TAGS
                .iter()
                .find_map(|(tag, p)| seen.ends_with(tag.as_str()).then_some(*p))
            {
                current_param = Some(param);
                param_start = end;
                param_close_tag = format!("</{}>", param.as_str());
                continue;
            }

            if seen.ends_with(&tool_close_tag) {
                let inner = &input[tool_start..end - tool_close_tag.len()];
                rescue_content_param(tool, inner, &mut params);
                blocks.push(AssistantContent::ToolUse(ToolUseBlock {
                    name: tool,
                    params: std::mem::take(&mut params),
                    partial: false,
                }));
                current_tool = None;
                text_start = end;
            }
            // A closing tag that does not match the open tool is content,
            // not an error.
            continue;
        }

        // Outside any tool: a tool opening tag ends the running text block.
        if let Some(tool) = TOOL_OPEN_TAGS
            .iter()
            .find_map(|(tag, t)| seen.ends_with(tag.as_str()).then_some(*t))
        {
            let open_len = tool.as_str().len() + 2;
            let text = input[text_start..end - open_len].trim();
            if !text.is_empty() {
                blocks.push(AssistantContent::Text(TextBlock {
                    content: text.to_string(),
                    partial: false,
                }));
            }
            current_tool = Some(tool);
            tool_start = end;
            tool_close_tag = format!("</{}>", tool.as_str());
        }
    }

    // Finalize whatever the stream left open.
    if let Some(tool) = current_tool {
        if let Some(param) = current_param {
            params.insert(param, input[param_start..].trim().to_string());
        }
        blocks.push(AssistantContent::ToolUse(ToolUseBlock {
            name: tool,
            params,
            partial: true,
        }));
    } else {
        let text = input[text_start..].trim();
        if !text.is_empty() {
            blocks.push(AssistantContent::Text(TextBlock {
                content: text.to_string(),
                partial: true,
            }));
        }
    }

    blocks
}

/// File payloads may themselves contain `</content>`, so on tool closure the
/// content parameter is re-extracted from the outermost pair: first opening
/// tag to last closing tag.
fn rescue_content_param(tool: ToolName, inner: &str, params: &mut HashMap<ParamName, String>) {
    if !matches!(tool, ToolName::WriteToFile | ToolName::NewTask) {
        return;
    }
    const OPEN: &str = "<content>";
    const CLOSE: &str = "</content>";
    if let Some(open_at) = inner.find(OPEN) {
        let start = open_at + OPEN.len();
        if let Some(close_at) = inner.rfind(CLOSE) {
            if close_at > start {
                params.insert(ParamName::Content, inner[start..close_at].trim().to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(block: &AssistantContent) -> &TextBlock {
        match block {
            AssistantContent::Text(t) => t,
            other => panic!("expected text block, got {:?}", other),
        }
    }

    fn tool(block: &AssistantContent) -> &ToolUseBlock {
        match block {
            AssistantContent::ToolUse(t) => t,
            other => panic!("expected tool block, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_is_partial() {
        let blocks = parse_assistant_message("Hello world");
        assert_eq!(blocks.len(), 1);
        let t = text(&blocks[0]);
        assert_eq!(t.content, "Hello world");
        assert!(t.partial);
    }

    #[test]
    fn test_partial_stream_scenario() {
        let blocks = parse_assistant_message("Hello <read_file><path>a.txt</path>");
        assert_eq!(blocks.len(), 2);

        let t = text(&blocks[0]);
        assert_eq!(t.content, "Hello");
        assert!(!t.partial);

        let tu = tool(&blocks[1]);
        assert_eq!(tu.name, ToolName::ReadFile);
        assert_eq!(tu.param(ParamName::Path), Some("a.txt"));
        assert!(tu.partial);
    }

    #[test]
    fn test_complete_tool_not_partial() {
        let blocks = parse_assistant_message("<read_file><path>src/lib.rs</path></read_file>");
        assert_eq!(blocks.len(), 1);
        let tu = tool(&blocks[0]);
        assert!(!tu.partial);
        assert_eq!(tu.param(ParamName::Path), Some("src/lib.rs"));
    }

    #[test]
    fn test_nested_content_markers() {
        let input =
            "<write_to_file><path>x</path><content>a</content>extra</content></write_to_file>";
        let blocks = parse_assistant_message(input);
        assert_eq!(blocks.len(), 1);
        let tu = tool(&blocks[0]);
        assert_eq!(tu.name, ToolName::WriteToFile);
        assert!(!tu.partial);
        assert_eq!(tu.param(ParamName::Path), Some("x"));
        assert_eq!(tu.param(ParamName::Content), Some("a</content>extra"));
    }

    #[test]
    fn test_mismatched_closing_tag_is_content() {
        // </list_files> inside read_file does not close it
        let input = "<read_file><path>a</path></list_files></read_file>";
        let blocks = parse_assistant_message(input);
        assert_eq!(blocks.len(), 1);
        let tu = tool(&blocks[0]);
        assert_eq!(tu.name, ToolName::ReadFile);
        assert!(!tu.partial);
    }

    #[test]
    fn test_text_between_tools() {
        let input = "first <list_files><path>.</path></list_files> then <read_file><path>b</path></read_file> done";
        let blocks = parse_assistant_message(input);
        assert_eq!(blocks.len(), 5);
        assert_eq!(text(&blocks[0]).content, "first");
        assert_eq!(tool(&blocks[1]).name, ToolName::ListFiles);
        assert_eq!(text(&blocks[2]).content, "then");
        assert_eq!(tool(&blocks[3]).name, ToolName::ReadFile);
        let tail = text(&blocks[4]);
        assert_eq!(tail.content, "done");
        assert!(tail.partial);
    }

    #[test]
    fn test_param_values_trimmed() {
        let input = "<read_file><path>\n  spaced.txt \n</path></read_file>";
        let blocks = parse_assistant_message(input);
        assert_eq!(tool(&blocks[0]).param(ParamName::Path), Some("spaced.txt"));
    }

    #[test]
    fn test_unclosed_param_at_end() {
        let input = "<execute_command><command>cargo tes";
        let blocks = parse_assistant_message(input);
        assert_eq!(blocks.len(), 1);
        let tu = tool(&blocks[0]);
        assert!(tu.partial);
        assert_eq!(tu.param(ParamName::Command), Some("cargo tes"));
    }

    #[test]
    fn test_partial_only_on_last_block() {
        let input = "a <read_file><path>x</path></read_file> trailing";
        let blocks = parse_assistant_message(input);
        let partial_count = blocks.iter().filter(|b| b.is_partial()).count();
        assert_eq!(partial_count, 1);
        assert!(blocks.last().unwrap().is_partial());
    }

    #[test]
    fn test_well_formed_input_has_no_partial() {
        let input = "<attempt_completion><result>done</result></attempt_completion>";
        let blocks = parse_assistant_message(input);
        assert!(blocks.iter().all(|b| !b.is_partial()));
    }

    #[test]
    fn test_unknown_tag_inside_tool_ignored() {
        let input = "<read_file><bogus>junk</bogus><path>a</path></read_file>";
        let blocks = parse_assistant_message(input);
        let tu = tool(&blocks[0]);
        assert_eq!(tu.param(ParamName::Path), Some("a"));
        assert!(!tu.partial);
    }

    #[test]
    fn test_empty_text_blocks_discarded() {
        let input = "<read_file><path>a</path></read_file><list_files><path>.</path></list_files>";
        let blocks = parse_assistant_message(input);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| matches!(b, AssistantContent::ToolUse(_))));
    }

    #[test]
    fn test_multiple_params() {
        let input = "<execute_command><command>ls -la</command><requires_approval>true</requires_approval></execute_command>";
        let blocks = parse_assistant_message(input);
        let tu = tool(&blocks[0]);
        assert_eq!(tu.param(ParamName::Command), Some("ls -la"));
        assert_eq!(tu.param(ParamName::RequiresApproval), Some("true"));
    }

    #[test]
    fn test_new_task_content_rescue() {
        let input = "<new_task><content>step 1</content> and </content> more</content></new_task>";
        let blocks = parse_assistant_message(input);
        let tu = tool(&blocks[0]);
        assert_eq!(tu.name, ToolName::NewTask);
        assert_eq!(
            tu.param(ParamName::Content),
            Some("step 1</content> and </content> more")
        );
    }

    #[test]
    fn test_no_hallucinated_content() {
        // Every emitted text/param value is a substring of the input
        let input = "think <search_files><path>src</path><regex>fn main</regex></search_files> tail";
        let blocks = parse_assistant_message(input);
        for block in &blocks {
            match block {
                AssistantContent::Text(t) => assert!(input.contains(&t.content)),
                AssistantContent::ToolUse(t) => {
                    for v in t.params.values() {
                        assert!(input.contains(v.as_str()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_reparse_prefixes_monotonic() {
        let input = "a <read_file><path>x</path></read_file> b <list_files><path>.</path></list_files>";
        let mut prev_complete = 0;
        for k in 0..=input.len() {
            if !input.is_char_boundary(k) {
                continue;
            }
            let blocks = parse_assistant_message(&input[..k]);
            let complete = blocks.iter().filter(|b| !b.is_partial()).count();
            assert!(
                complete >= prev_complete,
                "complete block count regressed at prefix {}",
                k
            );
            prev_complete = complete;
        }
    }

    #[test]
    fn test_multibyte_text_around_tools() {
        let input = "héllo ✓ <read_file><path>fïle.rs</path></read_file> çlosed";
        let blocks = parse_assistant_message(input);
        assert_eq!(blocks.len(), 3);
        assert_eq!(text(&blocks[0]).content, "héllo ✓");
        assert_eq!(tool(&blocks[1]).param(ParamName::Path), Some("fïle.rs"));
        assert_eq!(text(&blocks[2]).content, "çlosed");
    }
}

//! Top-level code definition extraction

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

struct DefPattern {
    kind: &'static str,
    regex: Regex,
}

fn patterns(list: &[(&'static str, &str)]) -> Vec<DefPattern> {
    list.iter()
        .map(|(kind, re)| DefPattern {
            kind,
            regex: Regex::new(re).expect("definition pattern"),
        })
        .collect()
}

static RUST_PATTERNS: LazyLock<Vec<DefPattern>> = LazyLock::new(|| {
    patterns(&[
        ("fn", r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(\w+)"),
        ("struct", r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(\w+)"),
        ("enum", r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+(\w+)"),
        ("trait", r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+(\w+)"),
        ("impl", r"^\s*impl(?:<[^>]*>)?\s+(?:\w+\s+for\s+)?(\w+)"),
        ("mod", r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)"),
        ("const", r"^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+(\w+)"),
        ("static", r"^\s*(?:pub(?:\([^)]*\))?\s+)?static\s+(\w+)"),
        ("type", r"^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+(\w+)"),
    ])
});

static PYTHON_PATTERNS: LazyLock<Vec<DefPattern>> = LazyLock::new(|| {
    patterns(&[
        ("def", r"^(?:async\s+)?def\s+(\w+)"),
        ("class", r"^class\s+(\w+)"),
    ])
});

static JS_PATTERNS: LazyLock<Vec<DefPattern>> = LazyLock::new(|| {
    patterns(&[
        ("function", r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)"),
        ("class", r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)"),
        ("const", r"^\s*(?:export\s+)?const\s+(\w+)\s*=\s*(?:async\s*)?(?:\(|function)"),
        ("interface", r"^\s*(?:export\s+)?interface\s+(\w+)"),
        ("type", r"^\s*(?:export\s+)?type\s+(\w+)\s*="),
        ("enum", r"^\s*(?:export\s+)?(?:const\s+)?enum\s+(\w+)"),
    ])
});

static JAVA_PATTERNS: LazyLock<Vec<DefPattern>> = LazyLock::new(|| {
    patterns(&[
        ("class", r"^\s*(?:public\s+|private\s+|protected\s+)?(?:abstract\s+|final\s+)?class\s+(\w+)"),
        ("interface", r"^\s*(?:public\s+)?interface\s+(\w+)"),
        ("enum", r"^\s*(?:public\s+)?enum\s+(\w+)"),
    ])
});

static GO_PATTERNS: LazyLock<Vec<DefPattern>> = LazyLock::new(|| {
    patterns(&[
        ("func", r"^func\s+(?:\([^)]*\)\s+)?(\w+)"),
        ("type", r"^type\s+(\w+)"),
        ("var", r"^var\s+(\w+)"),
        ("const", r"^const\s+(\w+)"),
    ])
});

static GENERIC_PATTERNS: LazyLock<Vec<DefPattern>> = LazyLock::new(|| {
    patterns(&[(
        "definition",
        r"^\s*(?:def|fn|func|function|class|struct|interface)\s+(\w+)",
    )])
});

fn patterns_for(extension: &str) -> &'static [DefPattern] {
    match extension {
        "rs" => &RUST_PATTERNS,
        "py" => &PYTHON_PATTERNS,
        "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" => &JS_PATTERNS,
        "java" => &JAVA_PATTERNS,
        "go" => &GO_PATTERNS,
        _ => &GENERIC_PATTERNS,
    }
}

/// Tool that lists top-level definitions of a source file
pub struct ListDefinitionsTool;

#[async_trait]
impl Tool for ListDefinitionsTool {
    fn name(&self) -> ToolName {
        ToolName::ListCodeDefinitionNames
    }

    fn description(&self) -> &str {
        "List top-level code definitions (functions, types, classes) in a source file as type:name lines."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Path]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let rel_path = block.param(ParamName::Path).unwrap_or_default();

        let preview = format!("List definitions: {}", rel_path);
        if let Some(denied) = request_approval(ctx, self.name(), &preview, false).await {
            return denied;
        }

        let path = ctx.resolve(rel_path);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResponse::error(format!("File not found: {}", rel_path));
            }
            Err(e) => return ToolResponse::error(format!("Failed to read {}: {}", rel_path, e)),
        };

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let defs = extract_definitions(&content, &extension);
        if defs.is_empty() {
            return ToolResponse::text("No definitions found");
        }

        ctx.tracker.lock().track_read(rel_path);

        ToolResponse::text(defs.join("\n"))
    }
}

fn extract_definitions(content: &str, extension: &str) -> Vec<String> {
    let patterns = patterns_for(extension);
    let mut out = Vec::new();
    for line in content.lines() {
        for p in patterns {
            if let Some(caps) = p.regex.captures(line) {
                if let Some(name) = caps.get(1) {
                    out.push(format!("{}:{}", p.kind, name.as_str()));
                }
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_definitions() {
        let src = "pub struct Foo;\nimpl Foo {\n    pub fn bar(&self) {}\n}\nenum Color { Red }\npub(crate) trait Walk {}\n";
        let defs = extract_definitions(src, "rs");
        assert!(defs.contains(&"struct:Foo".to_string()));
        assert!(defs.contains(&"impl:Foo".to_string()));
        assert!(defs.contains(&"fn:bar".to_string()));
        assert!(defs.contains(&"enum:Color".to_string()));
        assert!(defs.contains(&"trait:Walk".to_string()));
    }

    #[test]
    fn test_python_definitions() {
        let src = "class Widget:\n    pass\n\nasync def fetch():\n    pass\ndef main():\n    pass\n";
        let defs = extract_definitions(src, "py");
        assert_eq!(
            defs,
            vec!["class:Widget", "def:fetch", "def:main"]
        );
    }

    #[test]
    fn test_typescript_definitions() {
        let src = "export interface Props {}\nexport const handler = async () => {}\nexport default class App {}\ntype Alias = string\n";
        let defs = extract_definitions(src, "ts");
        assert!(defs.contains(&"interface:Props".to_string()));
        assert!(defs.contains(&"class:App".to_string()));
        assert!(defs.contains(&"type:Alias".to_string()));
    }

    #[test]
    fn test_go_definitions() {
        let src = "func (s *Server) Handle() {}\nfunc main() {}\ntype Server struct {}\n";
        let defs = extract_definitions(src, "go");
        assert!(defs.contains(&"func:Handle".to_string()));
        assert!(defs.contains(&"func:main".to_string()));
        assert!(defs.contains(&"type:Server".to_string()));
    }

    #[test]
    fn test_generic_fallback() {
        let src = "function doThing() {\n}\nclass Thing {\n}\n";
        let defs = extract_definitions(src, "weird");
        assert!(defs.contains(&"definition:doThing".to_string()));
        assert!(defs.contains(&"definition:Thing".to_string()));
    }
}

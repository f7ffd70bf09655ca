//! Directory listing tool

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

/// Cap on listed entries
const MAX_ENTRIES: usize = 2000;

/// Directories that never get listed
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "out",
    "target",
    "venv",
    ".venv",
    "__pycache__",
    ".cache",
    ".git",
];

/// Tool for listing directory contents
pub struct ListFilesTool;

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> ToolName {
        ToolName::ListFiles
    }

    fn description(&self) -> &str {
        "List files and directories at the given path. Pass recursive=true to walk the whole tree."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Path]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let rel_path = block.param(ParamName::Path).unwrap_or_default();
        let recursive = block
            .param(ParamName::Recursive)
            .map(|v| v == "true")
            .unwrap_or(false);

        let preview = format!("List files: {}{}", rel_path, if recursive { " (recursive)" } else { "" });
        if let Some(denied) = request_approval(ctx, self.name(), &preview, false).await {
            return denied;
        }

        let root = ctx.resolve(rel_path);
        if !root.exists() {
            return ToolResponse::error(format!("Path does not exist: {}", rel_path));
        }
        if !root.is_dir() {
            return ToolResponse::error(format!("Path is not a directory: {}", rel_path));
        }

        let mut entries = Vec::new();
        collect(&root, &root, recursive, &mut entries);

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        if entries.is_empty() {
            return ToolResponse::text("(empty directory)");
        }

        let truncated = entries.len() >= MAX_ENTRIES;
        let mut output = entries.join("\n");
        if truncated {
            output.push_str(&format!(
                "\n\n(Listing truncated at {} entries. List a subdirectory for more.)",
                MAX_ENTRIES
            ));
        }

        ToolResponse::text(output)
    }
}

fn ignored(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

fn collect(base: &Path, dir: &Path, recursive: bool, entries: &mut Vec<String>) {
    if entries.len() >= MAX_ENTRIES {
        return;
    }
    let read_dir = match fs::read_dir(dir) {
        Ok(d) => d,
        Err(_) => return,
    };

    let mut items: Vec<PathBuf> = read_dir.flatten().map(|e| e.path()).collect();
    items.sort();

    for path in items {
        if entries.len() >= MAX_ENTRIES {
            return;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if ignored(&name) {
            continue;
        }

        let relative = path.strip_prefix(base).unwrap_or(&path);
        if path.is_dir() {
            entries.push(format!("{}/", relative.display()));
            if recursive {
                collect(base, &path, true, entries);
            }
        } else {
            entries.push(relative.display().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_context_in, make_tool_block};

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/inner")).unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        std::fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/inner/deep.rs"), "").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_flat() {
        let dir = setup();
        let ctx = make_context_in(dir.path().to_path_buf());
        let block = make_tool_block(ToolName::ListFiles, &[(ParamName::Path, ".")]);
        let resp = ListFilesTool.execute(&block, &ctx).await;

        let text = resp.text_content();
        assert!(text.contains("README.md"));
        assert!(text.contains("src/"));
        assert!(!text.contains("lib.rs"));
        assert!(!text.contains("node_modules"));
        assert!(!text.contains(".hidden"));
    }

    #[tokio::test]
    async fn test_list_recursive() {
        let dir = setup();
        let ctx = make_context_in(dir.path().to_path_buf());
        let block = make_tool_block(
            ToolName::ListFiles,
            &[(ParamName::Path, "."), (ParamName::Recursive, "true")],
        );
        let resp = ListFilesTool.execute(&block, &ctx).await;

        let text = resp.text_content();
        assert!(text.contains("src/lib.rs"));
        assert!(text.contains("src/inner/deep.rs"));
        assert!(!text.contains("node_modules"));
    }

    #[tokio::test]
    async fn test_list_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context_in(dir.path().to_path_buf());
        let block = make_tool_block(ToolName::ListFiles, &[(ParamName::Path, "missing")]);
        let resp = ListFilesTool.execute(&block, &ctx).await;
        assert!(resp.is_error);
        assert!(resp.text_content().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_list_caps_entries() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..(MAX_ENTRIES + 50) {
            std::fs::write(dir.path().join(format!("f{:05}.txt", i)), "").unwrap();
        }
        let ctx = make_context_in(dir.path().to_path_buf());
        let block = make_tool_block(ToolName::ListFiles, &[(ParamName::Path, ".")]);
        let resp = ListFilesTool.execute(&block, &ctx).await;
        assert!(resp.text_content().contains("Listing truncated at 2000 entries"));
    }
}

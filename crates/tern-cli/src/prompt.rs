//! System prompt assembly
//!
//! Deterministic concatenation of the agent role, capabilities, registry
//! tool docs, rules, system info, optional user instructions, and the
//! per-turn environment details from the file tracker.

use tern_core::{PromptBuilder, PromptEnv};

const ROLE: &str = "You are a skilled software engineer operating inside the user's workspace. \
You accomplish tasks by calling tools, one per message, and iterating on their results.";

const CAPABILITIES: &str = "\
- Read, create and edit files in the working directory
- Execute shell commands and inspect their output
- Search the codebase by regex and list its structure
- Ask the user clarifying questions when requirements are ambiguous
- Fetch web pages for reference";

const RULES: &str = "\
- Use exactly one tool per message and wait for its result before continuing.
- Tool calls are written as XML tags, e.g. <read_file><path>src/main.rs</path></read_file>.
- Paths are relative to the working directory. Never touch files outside it.
- When the task is done, call attempt_completion with a summary of the result.
- Do not end a message without either a tool call or a direct answer to the user.";

/// Prompt builder for the terminal host
pub struct SystemPromptBuilder {
    /// Extra instructions from the user's config or project files
    pub user_instructions: Option<String>,
}

impl SystemPromptBuilder {
    pub fn new(user_instructions: Option<String>) -> Self {
        Self { user_instructions }
    }
}

impl PromptBuilder for SystemPromptBuilder {
    fn build(&self, env: &PromptEnv) -> String {
        let mut out = String::new();

        out.push_str(ROLE);
        out.push_str("\n\n====\n\nCAPABILITIES\n\n");
        out.push_str(CAPABILITIES);

        out.push_str("\n\n====\n\nTOOLS\n\n");
        out.push_str(&env.tool_docs);

        out.push_str("\n====\n\nRULES\n\n");
        out.push_str(RULES);

        out.push_str("\n\n====\n\nSYSTEM INFORMATION\n\n");
        out.push_str(&format!(
            "Operating system: {}\nWorking directory: {}\nCurrent time: {}\n",
            std::env::consts::OS,
            env.cwd.display(),
            chrono::Local::now().to_rfc3339()
        ));

        if let Some(instructions) = &self.user_instructions {
            out.push_str("\n====\n\nUSER INSTRUCTIONS\n\n");
            out.push_str(instructions);
            out.push('\n');
        }

        if !env.read_files.is_empty() {
            out.push_str("\n====\n\nFILES ALREADY READ\n\n");
            for f in &env.read_files {
                out.push_str(&format!("- {}\n", f));
            }
        }

        if !env.recently_modified.is_empty() {
            out.push_str("\n====\n\nRECENTLY MODIFIED FILES\n\nThese files changed outside this conversation since you last read them; re-read them before editing:\n");
            for f in &env.recently_modified {
                out.push_str(&format!("- {}\n", f));
            }
        }

        if let Some(checklist) = &env.focus_checklist {
            out.push_str("\n====\n\nTASK CHECKLIST\n\n");
            out.push_str(checklist);
            out.push('\n');
        }

        out
    }
}

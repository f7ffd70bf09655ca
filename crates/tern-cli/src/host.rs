//! Terminal host: renders say events, prompts for approvals, and appends
//! surfaced errors to the per-day log.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tern_core::{AskReply, HostBridge, MessageKind, ToolName};

/// Host bridge for plain stdin/stdout use
pub struct TerminalHost {
    auto_approve_all: bool,
    auto_approved: HashSet<String>,
    log_dir: PathBuf,
}

impl TerminalHost {
    pub fn new(auto_approve_all: bool, auto_approved: Vec<String>, log_dir: PathBuf) -> Self {
        Self {
            auto_approve_all,
            auto_approved: auto_approved.into_iter().collect(),
            log_dir,
        }
    }

    /// Append a structured error line to today's log file
    pub fn log_error(&self, kind: &str, message: &str, hint: &str) {
        let line = serde_json::json!({
            "ts": chrono::Utc::now().timestamp_millis(),
            "kind": kind,
            "message": message,
            "hint": hint,
        });
        let name = format!("errors-{}.jsonl", chrono::Local::now().format("%Y-%m-%d"));
        if std::fs::create_dir_all(&self.log_dir).is_ok() {
            if let Ok(mut f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.log_dir.join(name))
            {
                let _ = writeln!(f, "{}", line);
            }
        }
    }

    async fn read_line(&self) -> String {
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            line.trim().to_string()
        })
        .await
        .unwrap_or_default()
    }
}

#[async_trait]
impl HostBridge for TerminalHost {
    async fn say(&self, kind: MessageKind, text: Option<&str>, partial: bool) -> Option<i64> {
        let text = text.unwrap_or_default();
        match kind {
            MessageKind::Text if partial => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            MessageKind::Text => println!("{}", text),
            MessageKind::Tool => println!("\n[tool] {}", text),
            MessageKind::Command => println!("\n[command] {}", text),
            MessageKind::CommandOutput => println!("{}", text),
            MessageKind::CompletionResult => println!("\n\n{}", text),
            MessageKind::Error => {
                eprintln!("\nerror: {}", text);
                self.log_error("error", text, "");
            }
            MessageKind::UserFeedback => println!("[feedback] {}", text),
            MessageKind::Followup => println!("\n{}", text),
            MessageKind::ApiReqStarted => {}
        }
        Some(chrono::Utc::now().timestamp_millis())
    }

    async fn ask(&self, kind: MessageKind, text: Option<&str>, _partial: bool) -> AskReply {
        let text = text.unwrap_or_default();
        match kind {
            MessageKind::Followup => {
                println!("\n{}", text);
                print!("> ");
            }
            _ => {
                println!("\n{}", text);
                print!("Approve? [y/N or type feedback] ");
            }
        }
        let _ = std::io::stdout().flush();

        let line = self.read_line().await;
        match kind {
            MessageKind::Followup => {
                if line.is_empty() {
                    AskReply::no()
                } else {
                    AskReply::message(line)
                }
            }
            _ => match line.to_lowercase().as_str() {
                "y" | "yes" => AskReply::yes(),
                "" | "n" | "no" => AskReply::no(),
                _ => AskReply::message(line),
            },
        }
    }

    fn should_auto_approve(&self, tool: ToolName) -> bool {
        self.auto_approve_all || self.auto_approved.contains(tool.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_approve_by_name() {
        let host = TerminalHost::new(
            false,
            vec!["read_file".to_string()],
            std::env::temp_dir(),
        );
        assert!(host.should_auto_approve(ToolName::ReadFile));
        assert!(!host.should_auto_approve(ToolName::ExecuteCommand));
    }

    #[test]
    fn test_auto_approve_all() {
        let host = TerminalHost::new(true, vec![], std::env::temp_dir());
        assert!(host.should_auto_approve(ToolName::ExecuteCommand));
    }

    #[test]
    fn test_error_log_written_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let host = TerminalHost::new(false, vec![], dir.path().to_path_buf());
        host.log_error("file", "file not found: a.rs", "check the path and try again");

        let name = format!("errors-{}.jsonl", chrono::Local::now().format("%Y-%m-%d"));
        let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert!(content.contains("file not found: a.rs"));
        assert!(content.contains("check the path"));
    }
}

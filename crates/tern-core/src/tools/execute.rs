//! Shell command execution tool

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::tool::{Tool, ToolContext, ToolResponse, request_approval};

/// Default timeout when the model does not pass one
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Cap on captured stdout/stderr
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Tool for executing shell commands in the task directory
pub struct ExecuteCommandTool;

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> ToolName {
        ToolName::ExecuteCommand
    }

    fn description(&self) -> &str {
        "Execute a shell command in the working directory. Returns the exit code, stdout and stderr."
    }

    fn required_params(&self) -> &[ParamName] {
        &[ParamName::Command]
    }

    async fn execute(&self, block: &ToolUseBlock, ctx: &ToolContext) -> ToolResponse {
        let command = block.param(ParamName::Command).unwrap_or_default();
        let requires_approval = block
            .param(ParamName::RequiresApproval)
            .map(|v| v == "true")
            .unwrap_or(false);
        let timeout_secs = block
            .param(ParamName::Timeout)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        if let Some(denied) =
            request_approval(ctx, self.name(), command, requires_approval).await
        {
            return denied;
        }

        if ctx.cancel.is_cancelled() {
            return ToolResponse::error("Operation cancelled");
        }

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(command)
            .current_dir(&ctx.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (k, v) in &ctx.env_overrides {
            cmd.env(k, v);
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolResponse::error(format!("Shell not found: {}", e));
            }
            Err(e) => return ToolResponse::error(format!("Failed to spawn command: {}", e)),
        };

        let mut stdout_pipe = child.stdout.take().expect("stdout piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr piped");

        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(timeout_secs);

        let mut stdout: Vec<u8> = Vec::new();
        let mut stderr: Vec<u8> = Vec::new();
        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut stdout_buf = [0u8; 8192];
        let mut stderr_buf = [0u8; 8192];

        let status = loop {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    let _ = child.kill().await;
                    return ToolResponse::error("Command cancelled");
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = child.kill().await;
                    return ToolResponse::error(format!(
                        "Command timed out after {} seconds.\n{}",
                        timeout_secs,
                        render_output(None, &stdout, &stderr)
                    ));
                }
                n = stdout_pipe.read(&mut stdout_buf), if !stdout_done => {
                    match n {
                        Ok(0) => stdout_done = true,
                        Ok(n) => append_capped(&mut stdout, &stdout_buf[..n]),
                        Err(_) => stdout_done = true,
                    }
                }
                n = stderr_pipe.read(&mut stderr_buf), if !stderr_done => {
                    match n {
                        Ok(0) => stderr_done = true,
                        Ok(n) => append_capped(&mut stderr, &stderr_buf[..n]),
                        Err(_) => stderr_done = true,
                    }
                }
                status = child.wait(), if stdout_done && stderr_done => {
                    match status {
                        Ok(s) => break s,
                        Err(e) => return ToolResponse::error(format!("Failed to wait for command: {}", e)),
                    }
                }
            }
        };

        let code = status.code().unwrap_or(-1);
        let rendered = render_output(Some(code), &stdout, &stderr);
        if status.success() {
            ToolResponse::text(rendered)
        } else {
            ToolResponse::error(rendered)
        }
    }
}

fn append_capped(buf: &mut Vec<u8>, chunk: &[u8]) {
    let room = MAX_OUTPUT_BYTES.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
}

fn render_output(code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> String {
    let mut out = String::new();
    if let Some(code) = code {
        out.push_str(&format!("Exit code: {}\n", code));
    }
    let stdout_text = String::from_utf8_lossy(stdout);
    let stderr_text = String::from_utf8_lossy(stderr);
    if stdout_text.trim().is_empty() && stderr_text.trim().is_empty() {
        out.push_str("(no output)");
        return out;
    }
    if !stdout_text.trim().is_empty() {
        out.push_str("Output:\n");
        out.push_str(stdout_text.trim_end());
        if stdout.len() >= MAX_OUTPUT_BYTES {
            out.push_str("\n... (stdout truncated at 10MB)");
        }
    }
    if !stderr_text.trim().is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("Errors:\n");
        out.push_str(stderr_text.trim_end());
        if stderr.len() >= MAX_OUTPUT_BYTES {
            out.push_str("\n... (stderr truncated at 10MB)");
        }
    }
    out
}

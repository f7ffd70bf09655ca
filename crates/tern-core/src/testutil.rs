//! Shared helpers for crate tests

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::file_tracker::FileTracker;
use crate::host::{AskReply, HostBridge, MessageKind};
use crate::names::{ParamName, ToolName};
use crate::parser::ToolUseBlock;
use crate::task::TaskState;
use crate::tool::ToolContext;

/// A host that records say events and answers asks from a queue. With an
/// empty queue every ask is approved.
pub struct ScriptedHost {
    pub auto_approve: bool,
    pub replies: Mutex<Vec<AskReply>>,
    pub says: Mutex<Vec<(MessageKind, String)>>,
    pub asks: Mutex<Vec<(MessageKind, String)>>,
}

impl ScriptedHost {
    pub fn approving() -> Self {
        Self {
            auto_approve: true,
            replies: Mutex::new(vec![]),
            says: Mutex::new(vec![]),
            asks: Mutex::new(vec![]),
        }
    }

    pub fn with_replies(replies: Vec<AskReply>) -> Self {
        Self {
            auto_approve: false,
            replies: Mutex::new(replies),
            says: Mutex::new(vec![]),
            asks: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl HostBridge for ScriptedHost {
    async fn say(&self, kind: MessageKind, text: Option<&str>, _partial: bool) -> Option<i64> {
        self.says
            .lock()
            .push((kind, text.unwrap_or_default().to_string()));
        None
    }

    async fn ask(&self, kind: MessageKind, text: Option<&str>, _partial: bool) -> AskReply {
        self.asks
            .lock()
            .push((kind, text.unwrap_or_default().to_string()));
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            AskReply::yes()
        } else {
            replies.remove(0)
        }
    }

    fn should_auto_approve(&self, _tool: ToolName) -> bool {
        self.auto_approve
    }
}

/// A tool context rooted in the system temp directory with an auto-approving
/// host.
pub fn make_context() -> ToolContext {
    make_context_in(std::env::temp_dir())
}

/// A tool context rooted at `cwd`
pub fn make_context_in(cwd: PathBuf) -> ToolContext {
    make_context_with(cwd, Arc::new(ScriptedHost::approving()))
}

/// A tool context with an explicit host
pub fn make_context_with(cwd: PathBuf, host: Arc<dyn HostBridge>) -> ToolContext {
    ToolContext {
        cwd,
        state: Arc::new(Mutex::new(TaskState::default())),
        tracker: Arc::new(Mutex::new(FileTracker::new())),
        host,
        cancel: CancellationToken::new(),
        search_binary: None,
        env_overrides: vec![],
    }
}

/// Build a complete tool block from a parameter list
pub fn make_tool_block(name: ToolName, params: &[(ParamName, &str)]) -> ToolUseBlock {
    ToolUseBlock {
        name,
        params: params
            .iter()
            .map(|(p, v)| (*p, v.to_string()))
            .collect::<HashMap<_, _>>(),
        partial: false,
    }
}

//! File-context tracker
//!
//! An append-only log of which workspace files the model has read or edited,
//! and which the user changed underneath it. Outputs feed the system prompt
//! ("files already read", "recently modified files") and stale-read warnings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Whether an entry still reflects the file's latest observed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Active,
    Stale,
}

/// How the file entered the task context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSource {
    ReadTool,
    UserEdited,
    AgentEdited,
    FileMentioned,
}

/// One observation of a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub state: FileState,
    pub source: FileSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_read_ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_edit_ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_edit_ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Per-task file metadata log. Entries are never removed; a new entry for a
/// path marks older entries stale, so at most one entry per path is active.
#[derive(Debug, Default)]
pub struct FileTracker {
    entries: Vec<FileEntry>,
    recently_modified: HashSet<String>,
}

impl FileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a tracker from persisted entries
    pub fn from_entries(entries: Vec<FileEntry>) -> Self {
        Self {
            entries,
            recently_modified: HashSet::new(),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn push(&mut self, mut entry: FileEntry) {
        for prior in self.entries.iter_mut().filter(|e| e.path == entry.path) {
            prior.state = FileState::Stale;
        }
        entry.state = FileState::Active;
        self.entries.push(entry);
    }

    fn blank(path: &str, source: FileSource) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            state: FileState::Active,
            source,
            agent_read_ts: None,
            agent_edit_ts: None,
            user_edit_ts: None,
            mtime: None,
            size: None,
        }
    }

    /// Record a read performed by the read tool
    pub fn track_read(&mut self, path: &str) {
        let mut e = Self::blank(path, FileSource::ReadTool);
        e.agent_read_ts = Some(Self::now());
        self.push(e);
        self.recently_modified.remove(path);
    }

    /// Record an @-mention whose content entered the conversation
    pub fn track_mention(&mut self, path: &str) {
        let mut e = Self::blank(path, FileSource::FileMentioned);
        e.agent_read_ts = Some(Self::now());
        self.push(e);
    }

    /// Record an edit authored by the model. An edit implies knowledge of the
    /// resulting content, so the read timestamp advances too.
    pub fn mark_file_edited_by_agent(&mut self, path: &str) {
        let now = Self::now();
        let mut e = Self::blank(path, FileSource::AgentEdited);
        e.agent_edit_ts = Some(now);
        e.agent_read_ts = Some(now);
        self.push(e);
        self.recently_modified.remove(path);
    }

    /// Record an external (user) edit observed by a watcher
    pub fn track_user_edit(&mut self, path: &str) {
        let mut e = Self::blank(path, FileSource::UserEdited);
        e.user_edit_ts = Some(Self::now());
        self.push(e);
        self.recently_modified.insert(path.to_string());
    }

    /// Whether any active entry covers this path
    pub fn is_file_in_context(&self, path: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.state == FileState::Active && e.path == path)
    }

    /// Paths the model has read (read tool, mention, or any read timestamp)
    pub fn read_files(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| {
                e.state == FileState::Active
                    && (matches!(e.source, FileSource::ReadTool | FileSource::FileMentioned)
                        || e.agent_read_ts.is_some())
            })
            .filter(|e| seen.insert(e.path.clone()))
            .map(|e| e.path.clone())
            .collect()
    }

    /// Return and clear the set of files modified externally since the last
    /// model read.
    pub fn take_recently_modified(&mut self) -> Vec<String> {
        let mut out: Vec<String> = self.recently_modified.drain().collect();
        out.sort();
        out
    }

    /// All entries, for persistence
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }
}

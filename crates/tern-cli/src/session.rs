//! Session persistence
//!
//! Each session is a directory under the per-user data dir:
//! `sessions/<id>/metadata.json`, `history.json`, `context-updates.json`,
//! `task-metadata.json`. History and overlays round-trip losslessly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tern_core::context::{DeletionRange, SerializedUpdates};
use tern_core::file_tracker::FileEntry;
use tern_model::Message;

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub id: String,
    pub created_at: i64,
    pub last_active_at: i64,
    pub message_count: usize,
    pub model_id: String,
    pub total_tokens: u32,
}

/// One usage reading per turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub ts: i64,
    pub total_tokens: u32,
}

/// File tracker entries plus the per-turn usage log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskMetadata {
    pub file_entries: Vec<FileEntry>,
    pub usage_log: Vec<UsageLogEntry>,
    pub deleted_range: Option<DeletionRange>,
}

/// Directory-backed session store
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// The per-user default location
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tern")
            .join("sessions")
    }

    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn open_default() -> Self {
        Self::new(Self::default_root())
    }

    fn dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Create a new session directory with fresh metadata
    pub fn create(&self, model_id: &str) -> std::io::Result<SessionMeta> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();
        let meta = SessionMeta {
            id: id.clone(),
            created_at: now,
            last_active_at: now,
            message_count: 0,
            model_id: model_id.to_string(),
            total_tokens: 0,
        };
        fs::create_dir_all(self.dir(&id))?;
        self.save_meta(&meta)?;
        Ok(meta)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.dir(id).join("metadata.json").exists()
    }

    fn write_json<T: Serialize>(&self, id: &str, name: &str, value: &T) -> std::io::Result<()> {
        let dir = self.dir(id);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        fs::write(dir.join(name), json)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        id: &str,
        name: &str,
    ) -> std::io::Result<T> {
        let content = fs::read_to_string(self.dir(id).join(name))?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }

    pub fn save_meta(&self, meta: &SessionMeta) -> std::io::Result<()> {
        self.write_json(&meta.id, "metadata.json", meta)
    }

    pub fn load_meta(&self, id: &str) -> std::io::Result<SessionMeta> {
        self.read_json(id, "metadata.json")
    }

    pub fn save_history(&self, id: &str, history: &[Message]) -> std::io::Result<()> {
        self.write_json(id, "history.json", &history)
    }

    pub fn load_history(&self, id: &str) -> std::io::Result<Vec<Message>> {
        self.read_json(id, "history.json")
    }

    pub fn save_context_updates(
        &self,
        id: &str,
        updates: &SerializedUpdates,
    ) -> std::io::Result<()> {
        self.write_json(id, "context-updates.json", updates)
    }

    /// Loaded lazily at session resume; absent for young sessions
    pub fn load_context_updates(&self, id: &str) -> std::io::Result<Option<SerializedUpdates>> {
        let path = self.dir(id).join("context-updates.json");
        if !path.exists() {
            return Ok(None);
        }
        self.read_json(id, "context-updates.json").map(Some)
    }

    pub fn save_task_metadata(&self, id: &str, meta: &TaskMetadata) -> std::io::Result<()> {
        self.write_json(id, "task-metadata.json", meta)
    }

    pub fn load_task_metadata(&self, id: &str) -> std::io::Result<TaskMetadata> {
        let path = self.dir(id).join("task-metadata.json");
        if !path.exists() {
            return Ok(TaskMetadata::default());
        }
        self.read_json(id, "task-metadata.json")
    }

    /// All sessions, most recently active first
    pub fn list(&self) -> Vec<SessionMeta> {
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(&self.root) else {
            return out;
        };
        for entry in entries.flatten() {
            let id = entry.file_name().to_string_lossy().to_string();
            match self.load_meta(&id) {
                Ok(meta) => out.push(meta),
                Err(e) => tracing::warn!("skipping unreadable session {}: {}", id, e),
            }
        }
        out.sort_by_key(|m| std::cmp::Reverse(m.last_active_at));
        out
    }

    /// Most recently active session, if any
    pub fn latest(&self) -> Option<SessionMeta> {
        self.list().into_iter().next()
    }

    pub fn delete(&self, id: &str) -> std::io::Result<()> {
        fs::remove_dir_all(self.dir(id))
    }

    pub fn clear(&self) -> std::io::Result<usize> {
        let sessions = self.list();
        let count = sessions.len();
        for meta in sessions {
            self.delete(&meta.id)?;
        }
        Ok(count)
    }

    /// Pretty JSON dump of a full session for `sessions export`
    pub fn export(&self, id: &str) -> std::io::Result<String> {
        let meta = self.load_meta(id)?;
        let history = self.load_history(id).unwrap_or_default();
        let export = serde_json::json!({
            "metadata": meta,
            "history": history,
        });
        serde_json::to_string_pretty(&export).map_err(std::io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_model::ContentBlock;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn test_create_and_load_meta() {
        let (_dir, store) = store();
        let meta = store.create("claude-sonnet-4-5-20250929").unwrap();
        let loaded = store.load_meta(&meta.id).unwrap();
        assert_eq!(loaded.id, meta.id);
        assert_eq!(loaded.model_id, "claude-sonnet-4-5-20250929");
        assert_eq!(loaded.message_count, 0);
    }

    #[test]
    fn test_history_roundtrip_identity() {
        let (_dir, store) = store();
        let meta = store.create("m").unwrap();
        let history = vec![
            Message::user("do the thing"),
            Message::assistant("on it"),
            Message::user_with_content(vec![
                ContentBlock::text("[read_file for 'a.rs'] Result:"),
                ContentBlock::text("contents"),
            ]),
        ];
        store.save_history(&meta.id, &history).unwrap();
        assert_eq!(store.load_history(&meta.id).unwrap(), history);
    }

    #[test]
    fn test_context_updates_roundtrip() {
        use tern_core::context::ContextManager;
        use tern_model::Message;

        let (_dir, store) = store();
        let meta = store.create("m").unwrap();

        let big = "x".repeat(2_000);
        let read = |p: &str| {
            Message::user_with_content(vec![
                ContentBlock::text(format!("[read_file for '{}'] Result:", p)),
                ContentBlock::text(big.clone()),
            ])
        };
        let history = vec![
            Message::user("t"),
            Message::assistant("a"),
            read("f.rs"),
            Message::assistant("b"),
            read("f.rs"),
            Message::assistant("c"),
        ];
        let mut cm = ContextManager::new();
        cm.dedup_file_reads(&history, None, 1);
        let serialized = cm.to_serialized();

        store.save_context_updates(&meta.id, &serialized).unwrap();
        let loaded = store.load_context_updates(&meta.id).unwrap().unwrap();
        assert_eq!(loaded, serialized);
    }

    #[test]
    fn test_missing_updates_is_none() {
        let (_dir, store) = store();
        let meta = store.create("m").unwrap();
        assert!(store.load_context_updates(&meta.id).unwrap().is_none());
    }

    #[test]
    fn test_task_metadata_default_when_absent() {
        let (_dir, store) = store();
        let meta = store.create("m").unwrap();
        let tm = store.load_task_metadata(&meta.id).unwrap();
        assert!(tm.file_entries.is_empty());
        assert!(tm.deleted_range.is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, store) = store();
        let a = store.create("m").unwrap();
        let mut b = store.create("m").unwrap();
        b.last_active_at = a.last_active_at + 1000;
        store.save_meta(&b).unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);

        store.delete(&a.id).unwrap();
        assert_eq!(store.list().len(), 1);
        assert!(!store.exists(&a.id));
    }

    #[test]
    fn test_export_contains_history() {
        let (_dir, store) = store();
        let meta = store.create("m").unwrap();
        store
            .save_history(&meta.id, &[Message::user("exported line")])
            .unwrap();
        let dump = store.export(&meta.id).unwrap();
        assert!(dump.contains("exported line"));
        assert!(dump.contains(&meta.id));
    }
}

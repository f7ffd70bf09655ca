//! Context manager
//!
//! Keeps the conversation inside the model's safe token budget. History is
//! never mutated: shrinking happens through per-block text overlays
//! (`ContextUpdate`) and a single contiguous deletion range. Two-phase
//! shrink: deduplicate repeated file-read payloads first, and only truncate
//! when deduplication does not save enough.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tern_model::{ContentBlock, Message, Role};

/// Which tool family produced the edit on a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EditType {
    NoFileRead,
    ReadFileTool,
    AlterFileTool,
    FileMention,
}

impl From<EditType> for u8 {
    fn from(e: EditType) -> u8 {
        match e {
            EditType::NoFileRead => 0,
            EditType::ReadFileTool => 1,
            EditType::AlterFileTool => 2,
            EditType::FileMention => 3,
        }
    }
}

impl TryFrom<u8> for EditType {
    type Error = String;
    fn try_from(v: u8) -> Result<Self, String> {
        match v {
            0 => Ok(EditType::NoFileRead),
            1 => Ok(EditType::ReadFileTool),
            2 => Ok(EditType::AlterFileTool),
            3 => Ok(EditType::FileMention),
            other => Err(format!("unknown edit type {}", other)),
        }
    }
}

/// One overlay on a specific block: `(timestamp, kind, replacement, metadata)`.
/// Serializes as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextUpdate(pub i64, pub String, pub Vec<String>, pub Vec<Vec<String>>);

impl ContextUpdate {
    pub fn text(ts: i64, replacement: impl Into<String>) -> Self {
        Self(ts, "text".to_string(), vec![replacement.into()], vec![])
    }

    pub fn replacement_text(&self) -> String {
        self.2.join("\n")
    }
}

/// Inclusive index interval elided from the history view. The first
/// user/assistant pair is never deleted, so `start >= 2`; `end` always lands
/// on an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRange {
    pub start: usize,
    pub end: usize,
}

/// How much of the tail to keep when truncating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationMode {
    None,
    LastTwo,
    Half,
    Quarter,
}

/// Serialized form: `[[msgIdx, [editType, [[blockIdx, updates[]]...]]]...]`
pub type SerializedUpdates = Vec<(usize, (EditType, Vec<(usize, Vec<ContextUpdate>)>))>;

const DUPLICATE_READ_NOTICE: &str = "[NOTE] This file read has been removed to save space in the context window. Refer to the latest read of this file for its current contents.";

const TRUNCATION_NOTICE: &str = "[NOTE] Some earlier conversation history has been removed to keep the context window within limits. The original task and the most recent exchanges are preserved; keep that in mind as you continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadKind {
    ReadTool,
    AlterTool,
    Mention,
}

#[derive(Debug, Clone)]
struct FileReadOccurrence {
    msg: usize,
    block: usize,
    kind: ReadKind,
    path: String,
}

/// Overlay bookkeeping for one session
#[derive(Debug, Default)]
pub struct ContextManager {
    updates: HashMap<usize, (EditType, HashMap<usize, Vec<ContextUpdate>>)>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The headroom-adjusted safe budget for a raw context window.
    pub fn max_allowed(context_window: u32) -> u32 {
        match context_window {
            64_000 => context_window - 27_000,
            128_000 => context_window - 30_000,
            200_000 => context_window - 40_000,
            w => w.saturating_sub(40_000).max((w as f64 * 0.8) as u32),
        }
    }

    /// Whether the observed usage calls for a shrink before the next request
    pub fn should_shrink(total_tokens: u32, context_window: u32) -> bool {
        total_tokens >= Self::max_allowed(context_window)
    }

    /// Shrink the history view if needed. Returns the deletion range to use
    /// from now on; when deduplication alone saves at least 30% of retained
    /// characters, the range comes back unchanged.
    pub fn shrink(
        &mut self,
        history: &[Message],
        range: Option<DeletionRange>,
        total_tokens: u32,
        context_window: u32,
        ts: i64,
    ) -> Option<DeletionRange> {
        let max_allowed = Self::max_allowed(context_window);
        if total_tokens < max_allowed {
            return range;
        }

        self.dedup_file_reads(history, range, ts);
        let savings = self.savings_ratio(history, range);

        if savings >= 0.3 {
            tracing::debug!(savings, "deduplication sufficient, skipping truncation");
            self.add_truncation_notice(history, ts);
            return range;
        }

        let mode = if total_tokens / 2 > max_allowed {
            TruncationMode::Quarter
        } else {
            TruncationMode::Half
        };
        let next = Self::next_truncation_range(history, range, mode);
        self.add_truncation_notice(history, ts);
        next.or(range)
    }

    // --- Phase 1: deduplication ---

    /// Rewrite all but the last read of each file to a short notice.
    /// Idempotent: an occurrence already carrying the same replacement is
    /// left alone.
    pub fn dedup_file_reads(
        &mut self,
        history: &[Message],
        range: Option<DeletionRange>,
        ts: i64,
    ) -> bool {
        let start = range.map(|r| r.end + 1).unwrap_or(2);
        let occurrences = Self::find_file_reads(history, start);

        let mut by_path: HashMap<&str, Vec<&FileReadOccurrence>> = HashMap::new();
        for occ in &occurrences {
            by_path.entry(occ.path.as_str()).or_default().push(occ);
        }

        // Working text per rewritten block, so several duplicate mention
        // paths in one block compose into one replacement.
        let mut pending: HashMap<(usize, usize), (EditType, String)> = HashMap::new();

        for occs in by_path.values() {
            if occs.len() < 2 {
                continue;
            }
            for occ in &occs[..occs.len() - 1] {
                let key = (occ.msg, occ.block);
                match occ.kind {
                    ReadKind::ReadTool => {
                        pending.insert(key, (EditType::ReadFileTool, DUPLICATE_READ_NOTICE.into()));
                    }
                    ReadKind::AlterTool => {
                        let text = format!(
                            "<final_file_content path=\"{}\">\n{}\n</final_file_content>",
                            occ.path, DUPLICATE_READ_NOTICE
                        );
                        pending.insert(key, (EditType::AlterFileTool, text));
                    }
                    ReadKind::Mention => {
                        let current = pending
                            .remove(&key)
                            .map(|(_, t)| t)
                            .unwrap_or_else(|| block_text(history, occ.msg, occ.block));
                        let replaced = replace_mention_content(&current, &occ.path);
                        pending.insert(key, (EditType::FileMention, replaced));
                    }
                }
            }
        }

        let mut added = false;
        for ((msg, block), (edit_type, text)) in pending {
            let entry = self
                .updates
                .entry(msg)
                .or_insert_with(|| (edit_type, HashMap::new()));
            let list = entry.1.entry(block).or_default();
            if list.last().map(|u| u.replacement_text()) == Some(text.clone()) {
                continue;
            }
            list.push(ContextUpdate::text(ts, text));
            added = true;
        }
        added
    }

    /// Find file-read records in the retained portion of the history. One
    /// message records one read for the tool patterns; inline mentions may
    /// carry several paths per message.
    fn find_file_reads(history: &[Message], start: usize) -> Vec<FileReadOccurrence> {
        let mut out = Vec::new();
        for (i, msg) in history.iter().enumerate().skip(start) {
            if msg.role != Role::User {
                continue;
            }
            let first = msg.content.first().and_then(|b| b.as_text()).unwrap_or("");

            if let Some(path) = parse_tool_result_header(first, "read_file") {
                if msg.content.len() > 1 {
                    out.push(FileReadOccurrence {
                        msg: i,
                        block: 1,
                        kind: ReadKind::ReadTool,
                        path,
                    });
                }
                continue;
            }

            let alter_path = parse_tool_result_header(first, "write_to_file")
                .or_else(|| parse_tool_result_header(first, "replace_in_file"));
            if let Some(path) = alter_path {
                if let Some(second) = msg.content.get(1).and_then(|b| b.as_text()) {
                    if second.contains(&format!("<final_file_content path=\"{}\">", path)) {
                        out.push(FileReadOccurrence {
                            msg: i,
                            block: 1,
                            kind: ReadKind::AlterTool,
                            path,
                        });
                    }
                }
                continue;
            }

            if let Some(second) = msg.content.get(1).and_then(|b| b.as_text()) {
                for path in mention_paths(second) {
                    out.push(FileReadOccurrence {
                        msg: i,
                        block: 1,
                        kind: ReadKind::Mention,
                        path,
                    });
                }
            }
        }
        out
    }

    /// Fraction of retained characters saved by the current overlays
    pub fn savings_ratio(&self, history: &[Message], range: Option<DeletionRange>) -> f64 {
        let start = range.map(|r| r.end + 1).unwrap_or(2);
        let mut original = 0usize;
        let mut applied = 0usize;

        for (i, msg) in history.iter().enumerate() {
            if i >= 2 && i < start {
                continue;
            }
            for (b, block) in msg.content.iter().enumerate() {
                let text = block.as_text().unwrap_or("");
                original += text.len();
                applied += self
                    .latest_update(i, b)
                    .map(|u| u.replacement_text().len())
                    .unwrap_or(text.len());
            }
        }

        if original == 0 {
            return 0.0;
        }
        (original.saturating_sub(applied)) as f64 / original as f64
    }

    // --- Phase 2: ordered truncation ---

    /// Compute the next deletion range. The first pair is always preserved
    /// and the removed chunk must end on an assistant message.
    pub fn next_truncation_range(
        history: &[Message],
        current: Option<DeletionRange>,
        mode: TruncationMode,
    ) -> Option<DeletionRange> {
        let start = 2usize;
        let start_of_rest = current.map(|r| r.end + 1).unwrap_or(2);
        let remaining = history.len().saturating_sub(start_of_rest);

        let to_remove = match mode {
            TruncationMode::None => remaining,
            TruncationMode::LastTwo => remaining.saturating_sub(2),
            TruncationMode::Half => (remaining / 4) * 2,
            TruncationMode::Quarter => (remaining * 3 / 4 / 2) * 2,
        };
        if to_remove == 0 {
            return current;
        }

        let mut end = start_of_rest + to_remove - 1;
        if end >= history.len() {
            end = history.len() - 1;
        }
        if history[end].role != Role::Assistant {
            end = end.saturating_sub(1);
        }
        if end < start {
            return current;
        }
        Some(DeletionRange { start, end })
    }

    /// Record the one-time truncation notice overlay on the first assistant
    /// message.
    fn add_truncation_notice(&mut self, history: &[Message], ts: i64) {
        if history.len() < 2 {
            return;
        }
        if self.updates.contains_key(&1) {
            return;
        }
        let mut inner = HashMap::new();
        inner.insert(0usize, vec![ContextUpdate::text(ts, TRUNCATION_NOTICE)]);
        self.updates.insert(1, (EditType::NoFileRead, inner));
    }

    // --- Materialization ---

    /// The history view: first pair plus everything after the deleted range,
    /// with the latest overlay per block applied. Input messages are not
    /// mutated.
    pub fn truncated_messages(
        &self,
        history: &[Message],
        range: Option<DeletionRange>,
    ) -> Vec<Message> {
        let mut out = Vec::new();
        for (i, msg) in history.iter().enumerate() {
            if i >= 2 {
                if let Some(r) = range {
                    if i >= r.start && i <= r.end {
                        continue;
                    }
                }
            }
            out.push(self.apply_to(i, msg));
        }
        out
    }

    fn apply_to(&self, index: usize, msg: &Message) -> Message {
        let Some((_, blocks)) = self.updates.get(&index) else {
            return msg.clone();
        };
        let content = msg
            .content
            .iter()
            .enumerate()
            .map(|(b, block)| match (blocks.get(&b).and_then(|l| l.last()), block) {
                (Some(update), ContentBlock::Text { .. }) => {
                    ContentBlock::text(update.replacement_text())
                }
                _ => block.clone(),
            })
            .collect();
        Message {
            role: msg.role,
            content,
        }
    }

    fn latest_update(&self, msg: usize, block: usize) -> Option<&ContextUpdate> {
        self.updates
            .get(&msg)
            .and_then(|(_, blocks)| blocks.get(&block))
            .and_then(|l| l.last())
    }

    /// Whether any overlays exist
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    // --- Persistence ---

    pub fn to_serialized(&self) -> SerializedUpdates {
        let mut out: SerializedUpdates = self
            .updates
            .iter()
            .map(|(msg, (edit_type, blocks))| {
                let mut inner: Vec<(usize, Vec<ContextUpdate>)> = blocks
                    .iter()
                    .map(|(b, updates)| (*b, updates.clone()))
                    .collect();
                inner.sort_by_key(|(b, _)| *b);
                (*msg, (*edit_type, inner))
            })
            .collect();
        out.sort_by_key(|(msg, _)| *msg);
        out
    }

    pub fn from_serialized(data: SerializedUpdates) -> Self {
        let updates = data
            .into_iter()
            .map(|(msg, (edit_type, inner))| {
                (msg, (edit_type, inner.into_iter().collect::<HashMap<_, _>>()))
            })
            .collect();
        Self { updates }
    }
}

fn block_text(history: &[Message], msg: usize, block: usize) -> String {
    history
        .get(msg)
        .and_then(|m| m.content.get(block))
        .and_then(|b| b.as_text())
        .unwrap_or("")
        .to_string()
}

/// Match `[<tool> for 'PATH'] Result:` at the start of a block
fn parse_tool_result_header(text: &str, tool: &str) -> Option<String> {
    let prefix = format!("[{} for '", tool);
    let rest = text.strip_prefix(&prefix)?;
    let end = rest.find('\'')?;
    let after = &rest[end + 1..];
    if !after.starts_with("] Result:") {
        return None;
    }
    Some(rest[..end].to_string())
}

/// Paths of all `<file_content path="...">` payloads in a block
fn mention_paths(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = text;
    const OPEN: &str = "<file_content path=\"";
    while let Some(at) = rest.find(OPEN) {
        let after = &rest[at + OPEN.len()..];
        if let Some(q) = after.find('"') {
            out.push(after[..q].to_string());
            rest = &after[q..];
        } else {
            break;
        }
    }
    out
}

/// Replace one mention payload's inner content with the duplicate notice,
/// preserving the surrounding tags and any other payloads in the block.
fn replace_mention_content(text: &str, path: &str) -> String {
    let open = format!("<file_content path=\"{}\">", path);
    const CLOSE: &str = "</file_content>";
    let mut out = String::new();
    let mut rest = text;
    while let Some(at) = rest.find(&open) {
        let content_start = at + open.len();
        let Some(close_at) = rest[content_start..].find(CLOSE) else {
            break;
        };
        out.push_str(&rest[..content_start]);
        out.push_str(DUPLICATE_READ_NOTICE);
        rest = &rest[content_start + close_at..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(len: usize) -> Vec<Message> {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("user message {}", i))
                } else {
                    Message::assistant(format!("assistant message {}", i))
                }
            })
            .collect()
    }

    fn read_result(path: &str, content: &str) -> Message {
        Message::user_with_content(vec![
            ContentBlock::text(format!("[read_file for '{}'] Result:", path)),
            ContentBlock::text(content.to_string()),
        ])
    }

    #[test]
    fn test_max_allowed_table() {
        assert_eq!(ContextManager::max_allowed(64_000), 37_000);
        assert_eq!(ContextManager::max_allowed(128_000), 98_000);
        assert_eq!(ContextManager::max_allowed(200_000), 160_000);
        // 1M window: max(1M - 40k, 0.8M) = 960k
        assert_eq!(ContextManager::max_allowed(1_000_000), 960_000);
        // tiny window: 0.8 branch wins
        assert_eq!(ContextManager::max_allowed(50_000), 40_000);
    }

    #[test]
    fn test_shrink_noop_below_threshold() {
        let history = alternating(10);
        let mut cm = ContextManager::new();
        let range = cm.shrink(&history, None, 10_000, 128_000, 1);
        assert_eq!(range, None);
        assert!(cm.is_empty());
    }

    #[test]
    fn test_dedup_skips_truncation() {
        // Two reads of the same large file dominate the history; phase 1
        // alone saves more than 30%, so the range stays unchanged.
        let big = "x".repeat(40_000);
        let mut history = alternating(20);
        history[4] = read_result("big.ts", &big);
        history[10] = read_result("big.ts", &big);

        let mut cm = ContextManager::new();
        let range = cm.shrink(&history, None, 125_000, 128_000, 7);
        assert_eq!(range, None);

        let view = cm.truncated_messages(&history, range);
        assert_eq!(view.len(), 20);

        // earlier read replaced, latest kept verbatim
        let early = view[4].content[1].as_text().unwrap();
        assert!(early.contains("[NOTE]"));
        assert!(!early.contains('x'));
        assert_eq!(view[10].content[1].as_text().unwrap(), big);

        // truncation notice landed on the first assistant message
        assert!(view[1].content[0].as_text().unwrap().contains("[NOTE]"));
    }

    #[test]
    fn test_ordered_truncation_quarter() {
        let history = alternating(30);
        let mut cm = ContextManager::new();
        // totalTokens well past twice the budget forces quarter mode
        let max = ContextManager::max_allowed(128_000);
        let range = cm.shrink(&history, None, max * 2 + 2, 128_000, 3).unwrap();
        assert_eq!(range, DeletionRange { start: 2, end: 21 });
        assert!(history[21].is_assistant());

        let view = cm.truncated_messages(&history, Some(range));
        assert_eq!(view.len(), 10);
        assert_eq!(view[0].text(), history[0].text());
        assert_eq!(view[2].text(), history[22].text());
    }

    #[test]
    fn test_truncation_half_mode() {
        let history = alternating(30);
        let range =
            ContextManager::next_truncation_range(&history, None, TruncationMode::Half).unwrap();
        // remaining 28, drop floor(28/4)*2 = 14
        assert_eq!(range, DeletionRange { start: 2, end: 15 });
        assert!(history[15].is_assistant());
    }

    #[test]
    fn test_truncation_widens_existing_range() {
        let history = alternating(40);
        let first =
            ContextManager::next_truncation_range(&history, None, TruncationMode::Half).unwrap();
        let second =
            ContextManager::next_truncation_range(&history, Some(first), TruncationMode::Half)
                .unwrap();
        assert_eq!(second.start, 2);
        assert!(second.end > first.end);
        assert!(history[second.end].is_assistant());
    }

    #[test]
    fn test_truncation_end_adjusts_to_assistant() {
        // Roles crafted so the nominal end lands on a user message
        let mut history = alternating(10);
        history[4] = Message::assistant("swapped in");
        history[5] = Message::user("out of order");
        let range =
            ContextManager::next_truncation_range(&history, None, TruncationMode::Half).unwrap();
        // nominal end = 2 + 4 - 1 = 5 is user, so it backs off to 4
        assert_eq!(range.end, 4);
        assert!(history[4].is_assistant());
    }

    #[test]
    fn test_truncation_none_and_last_two() {
        let history = alternating(12);
        let none =
            ContextManager::next_truncation_range(&history, None, TruncationMode::None).unwrap();
        assert_eq!(none.start, 2);
        assert_eq!(none.end, 11);

        let last_two =
            ContextManager::next_truncation_range(&history, None, TruncationMode::LastTwo).unwrap();
        // remaining 10, drop 8, end = 9
        assert_eq!(last_two.end, 9);
    }

    #[test]
    fn test_dedup_idempotent() {
        let big = "y".repeat(5_000);
        let mut history = alternating(12);
        history[4] = read_result("a.rs", &big);
        history[8] = read_result("a.rs", &big);

        let mut cm = ContextManager::new();
        cm.dedup_file_reads(&history, None, 1);
        let first = cm.to_serialized();
        let first_ratio = cm.savings_ratio(&history, None);

        let added = cm.dedup_file_reads(&history, None, 2);
        assert!(!added);
        assert_eq!(cm.to_serialized(), first);

        let second_ratio = cm.savings_ratio(&history, None);
        assert!(second_ratio >= first_ratio);
    }

    #[test]
    fn test_dedup_alter_pattern() {
        let content = "fn main() {}".repeat(400);
        let alter = |path: &str| {
            Message::user_with_content(vec![
                ContentBlock::text(format!("[write_to_file for '{}'] Result:", path)),
                ContentBlock::text(format!(
                    "<final_file_content path=\"{}\">\n{}\n</final_file_content>",
                    path, content
                )),
            ])
        };
        let mut history = alternating(10);
        history[2] = alter("m.rs");
        history[6] = alter("m.rs");

        let mut cm = ContextManager::new();
        cm.dedup_file_reads(&history, None, 1);
        let view = cm.truncated_messages(&history, None);
        let early = view[2].content[1].as_text().unwrap();
        assert!(early.starts_with("<final_file_content path=\"m.rs\">"));
        assert!(early.contains("[NOTE]"));
        assert!(!early.contains("fn main"));
        assert!(view[6].content[1].as_text().unwrap().contains("fn main"));
    }

    #[test]
    fn test_dedup_mentions_multiple_paths() {
        let mention = |paths: &[(&str, &str)]| {
            let body = paths
                .iter()
                .map(|(p, c)| format!("<file_content path=\"{}\">{}</file_content>", p, c))
                .collect::<Vec<_>>()
                .join("\n");
            Message::user_with_content(vec![ContentBlock::text("task update"), ContentBlock::text(body)])
        };
        let mut history = alternating(10);
        history[2] = mention(&[("a.rs", "AAAA"), ("b.rs", "BBBB")]);
        history[6] = mention(&[("a.rs", "AAAA2")]);

        let mut cm = ContextManager::new();
        cm.dedup_file_reads(&history, None, 1);
        let view = cm.truncated_messages(&history, None);
        let early = view[2].content[1].as_text().unwrap();
        // a.rs deduplicated, b.rs untouched
        assert!(early.contains("<file_content path=\"a.rs\">[NOTE]"));
        assert!(early.contains("<file_content path=\"b.rs\">BBBB</file_content>"));
        assert!(view[6].content[1].as_text().unwrap().contains("AAAA2"));
    }

    #[test]
    fn test_dedup_respects_deletion_range() {
        let big = "z".repeat(2_000);
        let mut history = alternating(12);
        history[2] = read_result("a.rs", &big);
        history[8] = read_result("a.rs", &big);

        // messages up to index 5 are already deleted; only one read remains
        let range = Some(DeletionRange { start: 2, end: 5 });
        let mut cm = ContextManager::new();
        let added = cm.dedup_file_reads(&history, range, 1);
        assert!(!added);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let big = "q".repeat(3_000);
        let mut history = alternating(12);
        history[2] = read_result("a.rs", &big);
        history[6] = read_result("a.rs", &big);

        let mut cm = ContextManager::new();
        cm.dedup_file_reads(&history, None, 5);

        let serialized = cm.to_serialized();
        let json = serde_json::to_string(&serialized).unwrap();
        let back: SerializedUpdates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, serialized);

        let restored = ContextManager::from_serialized(back);
        assert_eq!(restored.to_serialized(), serialized);
    }

    #[test]
    fn test_serialized_shape() {
        let mut cm = ContextManager::new();
        let history = alternating(4);
        cm.add_truncation_notice(&history, 9);
        let json = serde_json::to_value(cm.to_serialized()).unwrap();
        // [[1, [0, [[0, [[9, "text", [..], []]]]]]]]
        assert_eq!(json[0][0], 1);
        assert_eq!(json[0][1][0], 0);
        assert_eq!(json[0][1][1][0][0], 0);
        assert_eq!(json[0][1][1][0][1][0][1], "text");
    }

    #[test]
    fn test_first_pair_always_present() {
        let history = alternating(30);
        let mut cm = ContextManager::new();
        let max = ContextManager::max_allowed(64_000);
        let range = cm.shrink(&history, None, max + 1, 64_000, 1);
        let view = cm.truncated_messages(&history, range);
        assert!(view.len() >= 2);
        assert_eq!(view[0].role, Role::User);
        assert_eq!(view[1].role, Role::Assistant);
    }

    #[test]
    fn test_materialization_does_not_mutate_history() {
        let big = "w".repeat(2_000);
        let mut history = alternating(10);
        history[2] = read_result("a.rs", &big);
        history[6] = read_result("a.rs", &big);
        let snapshot = history.clone();

        let mut cm = ContextManager::new();
        cm.dedup_file_reads(&history, None, 1);
        let _ = cm.truncated_messages(&history, None);
        assert_eq!(history, snapshot);
    }
}

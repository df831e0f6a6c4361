//! 剪贴板历史日志
//!
//! 固定容量的环形缓冲区，记录每一次剪贴板捕获，与条目仓库生命周期独立。
//!
//! - 容量为 0 时日志退化为黑洞：记录被丢弃，已有条目在缩容时清空。
//! - 溢出时淘汰最旧的记录。
//! - 内部按记录顺序（最旧在前）存放，展示时倒序。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::item::ItemContent;
use super::view::{matches_query, TypeFilter};

/// 历史容量上限
pub const MAX_HISTORY: usize = 1000;

/// 一次剪贴板事件；只读来源记录，不带收藏 / 标签 / 计数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub content: ItemContent,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_HISTORY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 按存储顺序（最旧在前）重建日志，超出容量的最旧记录被丢弃
    pub fn from_entries(capacity: usize, entries: Vec<HistoryEntry>) -> Self {
        let mut log = Self::new(capacity);
        for entry in entries {
            log.push(entry);
        }
        log
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 记录一次剪贴板事件；容量为 0 或内容为空时返回 `false`
    pub fn record(&mut self, content: ItemContent) -> bool {
        self.record_at(content, Utc::now())
    }

    pub fn record_at(&mut self, content: ItemContent, timestamp: DateTime<Utc>) -> bool {
        if self.capacity == 0 || content.is_blank() {
            return false;
        }
        self.push(HistoryEntry { content, timestamp });
        true
    }

    fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// 调整容量，保留最近的 `capacity` 条；容量为 0 时立即清空
    ///
    /// 返回被淘汰的条数。
    pub fn resize(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.min(MAX_HISTORY);
        let overflow = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..overflow);
        overflow
    }

    /// 存储顺序（最旧在前），用于持久化
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// 展示顺序（最新在前）
    pub fn newest_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// 历史标签页的可见列表：类型过滤后按内容搜索，最新在前
    pub fn visible(&self, type_filter: TypeFilter, query: &str) -> Vec<&HistoryEntry> {
        let query = query.trim().to_lowercase();
        self.newest_first()
            .filter(|entry| type_filter.admits(entry.content.kind()))
            .filter(|entry| matches_query(&entry.content.as_str(), &[], &query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ItemContent {
        ItemContent::text(s)
    }

    fn newest(log: &HistoryLog) -> Vec<String> {
        log.newest_first()
            .map(|entry| entry.content.as_str().into_owned())
            .collect()
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut log = HistoryLog::new(0);
        for i in 0..5 {
            assert!(!log.record(text(&format!("clip {i}"))));
        }
        assert!(log.is_empty());
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut log = HistoryLog::new(3);
        for s in ["a", "b", "c", "d"] {
            log.record(text(s));
        }
        assert_eq!(newest(&log), vec!["d", "c", "b"]);
    }

    #[test]
    fn resize_keeps_most_recent() {
        let mut log = HistoryLog::new(10);
        for i in 0..8 {
            log.record(text(&i.to_string()));
        }
        assert_eq!(log.resize(3), 5);
        assert_eq!(newest(&log), vec!["7", "6", "5"]);

        assert_eq!(log.resize(20), 0);
        assert_eq!(log.len(), 3);
        log.record(text("8"));
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn resize_to_zero_purges() {
        let mut log = HistoryLog::new(5);
        log.record(text("a"));
        log.resize(0);
        assert!(log.is_empty());
        assert!(!log.record(text("b")));
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(HistoryLog::new(5000).capacity(), MAX_HISTORY);
    }

    #[test]
    fn duplicates_are_kept_as_separate_events() {
        let mut log = HistoryLog::new(5);
        log.record(text("same"));
        log.record(text("same"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn visible_filters_by_type_and_query() {
        let mut log = HistoryLog::new(10);
        log.record(ItemContent::url("https://rust-lang.org"));
        log.record(text("Rusty nails"));
        log.record(text("other"));

        let hits: Vec<_> = log
            .visible(TypeFilter::All, "RUST")
            .into_iter()
            .map(|e| e.content.clone())
            .collect();
        assert_eq!(hits, vec![text("Rusty nails"), ItemContent::url("https://rust-lang.org")]);

        assert_eq!(log.visible(TypeFilter::Url, "").len(), 1);
    }
}

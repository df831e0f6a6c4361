//! 快照记录格式
//!
//! 条目快照与历史快照的 JSON 线格式，字段名与旧版文件保持一致：
//!
//! ```json
//! {"type": "url", "content": "https://…", "is_favorite": true, "hidden_from_main": false,
//!  "tags": ["work"], "date_added": "2024-01-01T00:00:00Z", "use_count": 3, "title": "…"}
//! {"type": "text", "content": "…", "time": "2024-01-01T00:00:00Z"}
//! ```
//!
//! 读取时缺失字段一律取默认值，旧版收藏文件 `{type, content, hidden_from_main}` 也能直接加载。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::HistoryEntry;
use super::item::{Item, ItemContent, ItemKind, NewItem};

/// 条目快照记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub content: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub hidden_from_main: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub use_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            kind: item.kind(),
            content: item.content().as_str().into_owned(),
            is_favorite: item.is_favorite(),
            hidden_from_main: item.hidden_from_main(),
            tags: item.tags().to_vec(),
            date_added: Some(item.date_added()),
            use_count: item.use_count(),
            title: item.title().map(str::to_string),
        }
    }
}

impl From<ItemRecord> for NewItem {
    /// 隐藏但未收藏的记录在构造条目时被归一化
    fn from(record: ItemRecord) -> Self {
        let mut new = NewItem::new(ItemContent::new(record.kind, record.content))
            .favorite(record.is_favorite)
            .hidden_from_main(record.hidden_from_main)
            .tags(record.tags)
            .use_count(record.use_count)
            .title(record.title);
        new.date_added = record.date_added;
        new
    }
}

/// 历史快照记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

impl From<&HistoryEntry> for HistoryRecord {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            kind: entry.content.kind(),
            content: entry.content.as_str().into_owned(),
            time: entry.timestamp,
        }
    }
}

impl From<HistoryRecord> for HistoryEntry {
    fn from(record: HistoryRecord) -> Self {
        Self {
            content: ItemContent::new(record.kind, record.content),
            timestamp: record.time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_favorite_record_loads_with_defaults() {
        let json = r#"[{"type": "file", "content": "/home/me/a.txt", "hidden_from_main": true}]"#;
        let records: Vec<ItemRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, ItemKind::File);
        assert!(!record.is_favorite);
        assert!(record.tags.is_empty());
        assert_eq!(record.use_count, 0);
        assert!(record.date_added.is_none());

        let item = Item::from_new(NewItem::from(record.clone()));
        assert!(!item.hidden_from_main());
    }

    #[test]
    fn item_record_omits_missing_title() {
        let item = Item::from_new(NewItem::new(ItemContent::text("hi")).use_count(2));
        let json = serde_json::to_value(ItemRecord::from(&item)).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["use_count"], 2);
        assert!(json.get("title").is_none());
        assert!(json["date_added"].as_str().is_some());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{"type": "image", "content": "x"}"#;
        assert!(serde_json::from_str::<ItemRecord>(json).is_err());
    }

    #[test]
    fn history_record_uses_time_field() {
        let json = r#"{"type": "url", "content": "https://a.b", "time": "2024-05-01T10:00:00Z"}"#;
        let entry = HistoryEntry::from(serde_json::from_str::<HistoryRecord>(json).unwrap());
        assert_eq!(entry.content, ItemContent::url("https://a.b"));
        assert_eq!(entry.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }
}
